//! Reductions of eActivities reports into chat replies.
//!
//! Each summary is computed first and rendered second so the totals can be
//! asserted on without parsing message text.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    domain::finance::{MoneyBucket, TransactionLine},
    money::MoneyFormatter,
};

pub const SPONSORSHIP_ACCOUNT_CODE: &str = "550";
pub const SPONSORSHIP_ACTIVITY_CODE: &str = "00";
pub const SALES_INVOICE_PREFIX: &str = "SI ";

pub fn membership_message(member_count: usize) -> String {
    format!("We have *{member_count}* members.")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreasurySummary {
    pub confirmed: Decimal,
    pub incoming: Decimal,
}

impl TreasurySummary {
    pub fn from_lines(lines: &[TransactionLine]) -> Self {
        lines.iter().fold(Self::default(), |mut summary, line| {
            match line.bucket() {
                MoneyBucket::Confirmed => summary.confirmed += line.amount,
                MoneyBucket::Pending | MoneyBucket::Outstanding => summary.incoming += line.amount,
            }
            summary
        })
    }

    pub fn render(&self, formatter: &MoneyFormatter) -> String {
        format!(
            "We have *{}* (with an extra *{}* on the way) in the bank.",
            formatter.format(self.confirmed),
            formatter.format(self.incoming)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorInvoice {
    pub sponsor: String,
    pub document: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SponsorBucket {
    pub invoices: Vec<SponsorInvoice>,
    pub total: Decimal,
}

impl SponsorBucket {
    fn push(&mut self, invoice: SponsorInvoice) {
        self.total += invoice.amount;
        self.invoices.push(invoice);
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    fn bullets(&self, formatter: &MoneyFormatter) -> String {
        self.invoices
            .iter()
            .map(|invoice| format!("• {} - {}", invoice.sponsor, formatter.format(invoice.amount)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SponsorReport {
    pub awaiting_payment: SponsorBucket,
    pub awaiting_approval: SponsorBucket,
    pub unparsed_documents: Vec<String>,
}

impl SponsorReport {
    pub fn from_lines(lines: &[TransactionLine]) -> Self {
        let mut report = Self::default();

        for line in lines.iter().filter(|line| is_sponsor_invoice(line)) {
            let bucket = match line.bucket() {
                MoneyBucket::Outstanding => &mut report.awaiting_payment,
                MoneyBucket::Pending => &mut report.awaiting_approval,
                MoneyBucket::Confirmed => continue,
            };

            let Some(sponsor) = sponsor_name(&line.description) else {
                warn!(
                    event_name = "finance.sponsors.unparsed_description",
                    document = %line.document,
                    description = %line.description,
                    "skipping sponsor invoice with unrecognised description"
                );
                report.unparsed_documents.push(line.document.clone());
                continue;
            };

            bucket.push(SponsorInvoice {
                sponsor: sponsor.to_owned(),
                document: line.document.clone(),
                amount: line.amount,
            });
        }

        report
    }

    pub fn render(&self, formatter: &MoneyFormatter) -> String {
        let payment = &self.awaiting_payment;
        let approval = &self.awaiting_approval;

        let payment_part = || {
            format!(
                "We're waiting for *{} {} to pay* for a total of {}:\n{}",
                payment.len(),
                plural(payment.len(), "sponsor", "sponsors"),
                formatter.format(payment.total),
                payment.bullets(formatter)
            )
        };
        let approval_part = |lead: &str| {
            format!(
                "{lead} *{} {} to be approved* for a total of {}:\n{}",
                approval.len(),
                plural(approval.len(), "invoice", "invoices"),
                formatter.format(approval.total),
                approval.bullets(formatter)
            )
        };

        match (payment.is_empty(), approval.is_empty()) {
            (false, false) => format!("{}\n{}", payment_part(), approval_part("and for")),
            (false, true) => payment_part(),
            (true, false) => approval_part("We're waiting for"),
            (true, true) => "We're not waiting for any sponsors or invoices. Hooray! 🎉🎉🎉".to_owned(),
        }
    }
}

pub fn is_sponsor_invoice(line: &TransactionLine) -> bool {
    line.account.code == SPONSORSHIP_ACCOUNT_CODE
        && line.activity.code == SPONSORSHIP_ACTIVITY_CODE
        && line.document.starts_with(SALES_INVOICE_PREFIX)
}

/// Extracts `Acme` from descriptions shaped like `Sponsorship invoice (Acme)`.
pub fn sponsor_name(description: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[^(]+\((.*)\)$").expect("sponsor pattern compiles"));

    pattern.captures(description).and_then(|captures| captures.get(1)).map(|name| name.as_str())
}

fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}
