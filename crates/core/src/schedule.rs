use chrono::{DateTime, Utc};

use crate::domain::event::UpcomingEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventQuery {
    Any,
    BarNight,
}

impl EventQuery {
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Any => "event",
            Self::BarNight => "bar night",
        }
    }

    pub fn matches(&self, event: &UpcomingEvent) -> bool {
        match self {
            Self::Any => true,
            Self::BarNight => event.name.to_lowercase().contains("bar night"),
        }
    }
}

/// Earliest event strictly after `now` that satisfies `query`.
///
/// Events sharing a start time resolve to whichever appears first in the feed.
pub fn next_event<'a>(
    events: &'a [UpcomingEvent],
    query: EventQuery,
    now: DateTime<Utc>,
) -> Option<&'a UpcomingEvent> {
    events
        .iter()
        .filter(|event| event.start_time.instant() > now)
        .filter(|event| query.matches(event))
        .fold(None, |best: Option<&UpcomingEvent>, event| match best {
            Some(current) if current.start_time <= event.start_time => Some(current),
            _ => Some(event),
        })
}

pub fn not_found_message(query: EventQuery) -> String {
    format!("I couldn't find any {}s on our Facebook page 😿", query.noun())
}

pub fn announcement(event: &UpcomingEvent, query: EventQuery, now: DateTime<Utc>) -> String {
    format!(
        "Looks like *{}* is our next {}, _{}_.",
        event.name,
        query.noun(),
        relative_phrase(now, event.start_time.instant().with_timezone(&Utc))
    )
}

/// Short weekday date in the event's own offset, e.g. `Tue Feb 14`.
pub fn display_date(event: &UpcomingEvent) -> String {
    event.start_time.instant().format("%a %b %-d").to_string()
}

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Coarse human phrase for the gap between `now` and `then`, such as `in 3 days`.
pub fn relative_phrase(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (then - now).num_seconds();
    let magnitude = seconds.abs();
    if magnitude < 1 {
        return "now".to_owned();
    }

    let (count, unit) = match magnitude {
        m if m < MINUTE => (m, "second"),
        m if m < HOUR => (m / MINUTE, "minute"),
        m if m < DAY => (m / HOUR, "hour"),
        m if m < WEEK => (m / DAY, "day"),
        m if m < MONTH => (m / WEEK, "week"),
        m if m < YEAR => (m / MONTH, "month"),
        m => (m / YEAR, "year"),
    };
    let suffix = if count == 1 { "" } else { "s" };

    if seconds > 0 {
        format!("in {count} {unit}{suffix}")
    } else {
        format!("{count} {unit}{suffix} ago")
    }
}
