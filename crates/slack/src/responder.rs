use std::sync::Arc;

use async_trait::async_trait;
use barkeep_core::{
    domain::finance::OperatingYear,
    errors::SourceError,
    finance::{membership_message, SponsorReport, TreasurySummary},
    money::MoneyFormatter,
    schedule::{self, EventQuery},
    sources::{EventFeed, FinanceSource},
};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    blocks::{error_text, next_event_message},
    commands::{parse_bot_command, BotCommand, FinanceQuery},
    events::{addressed_text, BotIdentity, IncomingMessage},
    socket::{ChatTransport, MessageHandler, TransportError},
};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Answers addressed chat messages using the finance and events collaborators.
pub struct Responder {
    transport: Arc<dyn ChatTransport>,
    finance: Arc<dyn FinanceSource>,
    events: Arc<dyn EventFeed>,
    formatter: MoneyFormatter,
}

impl Responder {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        finance: Arc<dyn FinanceSource>,
        events: Arc<dyn EventFeed>,
        formatter: MoneyFormatter,
    ) -> Self {
        Self { transport, finance, events, formatter }
    }

    pub async fn member_count(&self) -> Result<String, SourceError> {
        let members = self.finance.members(OperatingYear::current()).await?;
        Ok(membership_message(members.len()))
    }

    pub async fn treasury(&self) -> Result<String, SourceError> {
        let lines = self.finance.transaction_lines(OperatingYear::current()).await?;
        Ok(TreasurySummary::from_lines(&lines).render(&self.formatter))
    }

    pub async fn unpaid_sponsors(&self) -> Result<String, SourceError> {
        let lines = self.finance.transaction_lines(OperatingYear::current()).await?;
        Ok(SponsorReport::from_lines(&lines).render(&self.formatter))
    }

    pub async fn announce_next_event(
        &self,
        query: EventQuery,
        channel: &str,
    ) -> Result<(), HandlerError> {
        let events = self.events.upcoming_events().await?;
        let now = Utc::now();
        let next = schedule::next_event(&events, query, now);
        debug!(
            event_name = "responder.next_event",
            query = query.noun(),
            candidates = events.len(),
            found = next.is_some(),
            "selected next event"
        );

        let message = next_event_message(next, query, now);
        if message.attachments.is_empty() {
            self.transport.send_message(channel, &message.text).await?;
        } else {
            self.transport.send_rich_message(channel, &message).await?;
        }
        Ok(())
    }

    async fn answer_finance(&self, query: FinanceQuery, channel: &str) -> Result<(), HandlerError> {
        let text = match query {
            FinanceQuery::MemberCount => self.member_count().await?,
            FinanceQuery::Treasury => self.treasury().await?,
            FinanceQuery::UnpaidSponsors => self.unpaid_sponsors().await?,
        };
        self.transport.send_message(channel, &text).await?;
        Ok(())
    }

    async fn execute(&self, command: BotCommand, channel: &str) -> Result<(), HandlerError> {
        match command {
            BotCommand::NextEvent(query) => self.announce_next_event(query, channel).await,
            BotCommand::Finance(query) => self.answer_finance(query, channel).await,
        }
    }

    async fn report_failure(&self, channel: &str, command: BotCommand, failure: HandlerError) {
        match &failure {
            HandlerError::Source(source) if source.is_transient() => warn!(
                event_name = "responder.command_failed",
                channel,
                command = ?command,
                source_name = source.source_name(),
                error = %failure,
                "collaborator temporarily unavailable"
            ),
            _ => error!(
                event_name = "responder.command_failed",
                channel,
                command = ?command,
                error = %failure,
                "command failed"
            ),
        }

        if let Err(send_error) = self.transport.send_message(channel, &error_text(&failure)).await {
            error!(
                event_name = "responder.error_reply_failed",
                channel,
                error = %send_error,
                "could not report failure to channel"
            );
        }
    }
}

#[async_trait]
impl MessageHandler for Responder {
    async fn handle_message(&self, identity: &BotIdentity, message: IncomingMessage) {
        if message.user == identity.id {
            return;
        }
        let Some(text) = addressed_text(identity, &message.text) else {
            return;
        };

        if let Err(typing_error) = self.transport.send_typing(&message.channel).await {
            warn!(
                event_name = "responder.typing_failed",
                channel = %message.channel,
                error = %typing_error,
                "failed to send typing indicator"
            );
        }

        let Some(command) = parse_bot_command(text) else {
            debug!(event_name = "responder.unknown_command", channel = %message.channel, "no command matched");
            return;
        };

        info!(
            event_name = "responder.command_received",
            channel = %message.channel,
            user = %message.user,
            command = ?command,
            "handling bot command"
        );
        if let Err(failure) = self.execute(command, &message.channel).await {
            self.report_failure(&message.channel, command, failure).await;
        }
    }
}
