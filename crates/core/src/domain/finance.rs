use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Month in which a new operating year begins.
const OPERATING_YEAR_START_MONTH: u32 = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LedgerCode {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl LedgerCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into(), name: String::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionLine {
    #[serde(default)]
    pub account: LedgerCode,
    #[serde(default)]
    pub activity: LedgerCode,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub outstanding: bool,
}

impl TransactionLine {
    pub fn bucket(&self) -> MoneyBucket {
        if self.outstanding {
            MoneyBucket::Outstanding
        } else if self.pending {
            MoneyBucket::Pending
        } else {
            MoneyBucket::Confirmed
        }
    }
}

/// Every transaction line lands in exactly one bucket; outstanding wins over pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoneyBucket {
    Confirmed,
    Pending,
    Outstanding,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Member {
    #[serde(rename = "CID", default)]
    pub cid: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub email: String,
}

/// Club financial year, 1 August to 31 July, rendered as `"16-17"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatingYear {
    start: i32,
}

impl OperatingYear {
    pub fn starting(start: i32) -> Self {
        Self { start }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn containing(instant: DateTime<Utc>) -> Self {
        let year = instant.year();
        if instant.month() >= OPERATING_YEAR_START_MONTH {
            Self { start: year }
        } else {
            Self { start: year - 1 }
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start
    }
}

impl fmt::Display for OperatingYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.start.rem_euclid(100), (self.start + 1).rem_euclid(100))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{MoneyBucket, OperatingYear, TransactionLine};

    #[test]
    fn operating_year_rolls_over_in_august() {
        let july = Utc.with_ymd_and_hms(2017, 7, 31, 23, 59, 59).unwrap();
        let august = Utc.with_ymd_and_hms(2017, 8, 1, 0, 0, 0).unwrap();

        assert_eq!(OperatingYear::containing(july).to_string(), "16-17");
        assert_eq!(OperatingYear::containing(august).to_string(), "17-18");
    }

    #[test]
    fn operating_year_wraps_the_century() {
        assert_eq!(OperatingYear::starting(2099).to_string(), "99-00");
    }

    #[test]
    fn transaction_lines_deserialize_from_report_shape() {
        let raw = r#"{
            "Account": {"Code": "550", "Name": "Sponsorship"},
            "Activity": {"Code": "00", "Name": "General"},
            "Document": "SI 1001",
            "Description": "Sponsorship invoice (Acme)",
            "Amount": 300.5,
            "Pending": false,
            "Outstanding": true
        }"#;

        let line: TransactionLine = serde_json::from_str(raw).expect("line should parse");
        assert_eq!(line.account.code, "550");
        assert_eq!(line.activity.code, "00");
        assert_eq!(line.amount, Decimal::new(3005, 1));
        assert_eq!(line.bucket(), MoneyBucket::Outstanding);
    }

    #[test]
    fn outstanding_takes_precedence_over_pending() {
        let line = TransactionLine {
            account: Default::default(),
            activity: Default::default(),
            document: String::new(),
            description: String::new(),
            amount: Decimal::ONE,
            pending: true,
            outstanding: true,
        };
        assert_eq!(line.bucket(), MoneyBucket::Outstanding);
    }
}
