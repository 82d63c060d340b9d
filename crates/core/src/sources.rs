use async_trait::async_trait;

use crate::{
    domain::{
        event::UpcomingEvent,
        finance::{Member, OperatingYear, TransactionLine},
    },
    errors::SourceError,
};

/// Membership and ledger reports for the configured club.
#[async_trait]
pub trait FinanceSource: Send + Sync {
    async fn members(&self, year: OperatingYear) -> Result<Vec<Member>, SourceError>;

    async fn transaction_lines(
        &self,
        year: OperatingYear,
    ) -> Result<Vec<TransactionLine>, SourceError>;
}

/// Events published on the club's social page, in feed order.
#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn upcoming_events(&self) -> Result<Vec<UpcomingEvent>, SourceError>;
}
