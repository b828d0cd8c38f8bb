use std::cmp::Ordering;

use serde::Serialize;
use tracing::warn;

use crate::domain::bill::{Bill, BillStatus};
use crate::format::{format_date, status_label, Locale};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptLink {
    pub url: String,
    pub file_name: Option<String>,
}

/// One display-ready line of the bills table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillRow {
    pub id: String,
    pub date: String,
    pub formatted_date: String,
    pub status: BillStatus,
    pub status_label: String,
    pub expense_type: String,
    pub name: String,
    pub amount: u32,
    pub pct: Option<u32>,
    pub has_receipt: bool,
    pub receipt: Option<ReceiptLink>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BillListProjector {
    locale: Locale,
}

impl BillListProjector {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Most recent first. Equal dates keep their input order; unparseable
    /// dates go last, also in input order.
    pub fn project(&self, bills: &[Bill]) -> Vec<BillRow> {
        let mut keyed: Vec<_> = bills.iter().map(|bill| (bill.parsed_date(), bill)).collect();
        keyed.sort_by(|(left, _), (right, _)| match (left, right) {
            (Some(left), Some(right)) => right.cmp(left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        keyed.into_iter().map(|(_, bill)| self.row(bill)).collect()
    }

    fn row(&self, bill: &Bill) -> BillRow {
        let formatted_date = format_date(&bill.date, self.locale).unwrap_or_else(|| {
            warn!(
                event_name = "bills.projection.malformed_date",
                bill_id = %bill.id,
                date = %bill.date,
                "bill date is not YYYY-MM-DD, showing it unformatted"
            );
            bill.date.clone()
        });

        if !bill.status.is_recognized() {
            warn!(
                event_name = "bills.projection.unknown_status",
                bill_id = %bill.id,
                status = bill.status.as_str(),
                "bill has an unrecognized status"
            );
        }

        let receipt = bill.receipt_url().map(|url| ReceiptLink {
            url: url.to_string(),
            file_name: bill.file_name.clone(),
        });

        BillRow {
            id: bill.id.0.clone(),
            date: bill.date.clone(),
            formatted_date,
            status: bill.status.clone(),
            status_label: status_label(&bill.status, self.locale).to_string(),
            expense_type: bill.expense_type.label().to_string(),
            name: bill.name.clone(),
            amount: bill.amount,
            pct: bill.pct,
            has_receipt: receipt.is_some(),
            receipt,
        }
    }
}
