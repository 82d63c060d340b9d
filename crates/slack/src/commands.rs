use barkeep_core::schedule::EventQuery;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FinanceQuery {
    MemberCount,
    Treasury,
    UnpaidSponsors,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BotCommand {
    NextEvent(EventQuery),
    Finance(FinanceQuery),
}

/// Every phrase the bot answers to. Matching is exact and case-sensitive.
pub const COMMAND_PHRASES: &[(&str, BotCommand)] = &[
    ("when's the next bar night", BotCommand::NextEvent(EventQuery::BarNight)),
    ("next bar night", BotCommand::NextEvent(EventQuery::BarNight)),
    ("bevs", BotCommand::NextEvent(EventQuery::BarNight)),
    ("when's the next event", BotCommand::NextEvent(EventQuery::Any)),
    ("next event", BotCommand::NextEvent(EventQuery::Any)),
    ("how many members do we have", BotCommand::Finance(FinanceQuery::MemberCount)),
    ("members count", BotCommand::Finance(FinanceQuery::MemberCount)),
    ("membership", BotCommand::Finance(FinanceQuery::MemberCount)),
    ("how much money do we have", BotCommand::Finance(FinanceQuery::Treasury)),
    ("which sponsors haven't paid yet", BotCommand::Finance(FinanceQuery::UnpaidSponsors)),
];

pub fn parse_bot_command(text: &str) -> Option<BotCommand> {
    COMMAND_PHRASES.iter().find(|(phrase, _)| *phrase == text).map(|(_, command)| *command)
}

#[cfg(test)]
mod tests {
    use barkeep_core::schedule::EventQuery;

    use super::{parse_bot_command, BotCommand, FinanceQuery, COMMAND_PHRASES};

    #[test]
    fn bar_night_aliases_share_a_filter() {
        let long = parse_bot_command("next bar night");
        let short = parse_bot_command("bevs");

        assert_eq!(long, Some(BotCommand::NextEvent(EventQuery::BarNight)));
        assert_eq!(long, short);
    }

    #[test]
    fn event_phrases_are_unfiltered() {
        assert_eq!(
            parse_bot_command("when's the next event"),
            Some(BotCommand::NextEvent(EventQuery::Any))
        );
        assert_eq!(parse_bot_command("next event"), Some(BotCommand::NextEvent(EventQuery::Any)));
    }

    #[test]
    fn finance_phrases_route_to_their_queries() {
        assert_eq!(
            parse_bot_command("membership"),
            Some(BotCommand::Finance(FinanceQuery::MemberCount))
        );
        assert_eq!(
            parse_bot_command("how much money do we have"),
            Some(BotCommand::Finance(FinanceQuery::Treasury))
        );
        assert_eq!(
            parse_bot_command("which sponsors haven't paid yet"),
            Some(BotCommand::Finance(FinanceQuery::UnpaidSponsors))
        );
    }

    #[test]
    fn unknown_or_inexact_text_has_no_command() {
        for text in ["banana", "Bevs", "bevs ", "next bar night?", "how much money", ""] {
            assert_eq!(parse_bot_command(text), None, "{text:?}");
        }
    }

    #[test]
    fn phrases_are_unique() {
        let mut phrases = COMMAND_PHRASES.iter().map(|(phrase, _)| *phrase).collect::<Vec<_>>();
        phrases.sort_unstable();
        phrases.dedup();
        assert_eq!(phrases.len(), COMMAND_PHRASES.len());
    }
}
