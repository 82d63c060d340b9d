pub mod config;
pub mod domain;
pub mod errors;
pub mod finance;
pub mod money;
pub mod schedule;
pub mod sources;

pub use domain::event::{EventTime, UpcomingEvent};
pub use domain::finance::{LedgerCode, Member, MoneyBucket, OperatingYear, TransactionLine};
pub use errors::{DomainError, SourceError};
pub use finance::{SponsorReport, TreasurySummary};
pub use money::MoneyFormatter;
pub use schedule::EventQuery;
pub use sources::{EventFeed, FinanceSource};
