use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::bill::{parse_iso_date, BillStatus, ExpenseType, NewBill};
use crate::errors::ValidationFailure;
use crate::store::StoredReceipt;

pub const DEFAULT_AMOUNT: u32 = 0;
pub const DEFAULT_PCT: u32 = 20;

/// Raw field values of the new-bill form, exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBillForm {
    pub expense_type: String,
    pub name: String,
    pub amount: String,
    pub date: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

/// Validated form content, waiting for the receipt upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillDraft {
    pub email: String,
    pub expense_type: ExpenseType,
    pub name: String,
    pub amount: u32,
    pub date: NaiveDate,
    pub vat: Option<u32>,
    pub pct: u32,
    pub commentary: String,
}

impl NewBillForm {
    /// Blank optional fields fall back to defaults: amount 0, pct 20, no VAT,
    /// empty name and commentary, first expense category. Only the date is
    /// required.
    pub fn into_draft(self, email: &str) -> Result<BillDraft, ValidationFailure> {
        let date = match self.date.trim() {
            "" => return Err(ValidationFailure::MissingField("date")),
            raw => parse_iso_date(raw).ok_or_else(|| ValidationFailure::InvalidField {
                field: "date",
                value: raw.to_string(),
            })?,
        };

        let expense_type = match self.expense_type.trim() {
            "" => ExpenseType::default(),
            raw => ExpenseType::from(raw.to_string()),
        };

        Ok(BillDraft {
            email: email.to_string(),
            expense_type,
            name: self.name.trim().to_string(),
            amount: parse_optional_u32("amount", &self.amount)?.unwrap_or(DEFAULT_AMOUNT),
            date,
            vat: parse_optional_u32("vat", &self.vat)?,
            pct: parse_optional_u32("pct", &self.pct)?.unwrap_or(DEFAULT_PCT),
            commentary: self.commentary.trim().to_string(),
        })
    }
}

impl BillDraft {
    pub fn with_receipt(self, receipt: &StoredReceipt, file_name: &str) -> NewBill {
        NewBill {
            email: self.email,
            expense_type: self.expense_type,
            name: self.name,
            amount: self.amount,
            date: self.date,
            vat: self.vat,
            pct: self.pct,
            commentary: self.commentary,
            file_url: receipt.file_url.clone(),
            file_name: file_name.to_string(),
            status: BillStatus::Pending,
        }
    }
}

fn parse_optional_u32(field: &'static str, raw: &str) -> Result<Option<u32>, ValidationFailure> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| ValidationFailure::InvalidField { field, value: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{NewBillForm, DEFAULT_PCT};
    use crate::domain::bill::{BillStatus, ExpenseType};
    use crate::errors::ValidationFailure;
    use crate::store::StoredReceipt;

    fn form() -> NewBillForm {
        NewBillForm {
            expense_type: "Restaurants et bars".to_string(),
            name: "Déjeuner client".to_string(),
            amount: "42".to_string(),
            date: "2024-03-12".to_string(),
            vat: "7".to_string(),
            pct: "10".to_string(),
            commentary: "  avec l'équipe  ".to_string(),
        }
    }

    #[test]
    fn complete_form_builds_pending_bill() {
        let draft = form().into_draft("employee@test.tld").expect("valid form");
        let bill = draft.with_receipt(
            &StoredReceipt {
                key: "k-1".to_string(),
                file_url: "https://storage.test/k-1/ticket.png".to_string(),
            },
            "ticket.png",
        );

        assert_eq!(bill.email, "employee@test.tld");
        assert_eq!(bill.expense_type, ExpenseType::RestaurantsAndBars);
        assert_eq!(bill.amount, 42);
        assert_eq!(bill.date, NaiveDate::from_ymd_opt(2024, 3, 12).expect("date"));
        assert_eq!(bill.vat, Some(7));
        assert_eq!(bill.pct, 10);
        assert_eq!(bill.commentary, "avec l'équipe");
        assert_eq!(bill.file_name, "ticket.png");
        assert_eq!(bill.status, BillStatus::Pending);
    }

    #[test]
    fn blank_optional_fields_use_defaults() {
        let draft = NewBillForm { date: "2024-03-12".to_string(), ..NewBillForm::default() }
            .into_draft("a@a")
            .expect("only the date is required");

        assert_eq!(draft.amount, 0);
        assert_eq!(draft.pct, DEFAULT_PCT);
        assert_eq!(draft.vat, None);
        assert_eq!(draft.commentary, "");
        assert_eq!(draft.name, "");
        assert_eq!(draft.expense_type, ExpenseType::Transports);
    }

    #[test]
    fn missing_date_is_rejected() {
        let error = NewBillForm { date: "   ".to_string(), ..form() }
            .into_draft("a@a")
            .expect_err("date is required");
        assert_eq!(error, ValidationFailure::MissingField("date"));
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        let error = NewBillForm { amount: "douze".to_string(), ..form() }
            .into_draft("a@a")
            .expect_err("amount must be numeric");
        assert!(matches!(error, ValidationFailure::InvalidField { field: "amount", .. }));
    }

    #[test]
    fn negative_pct_is_rejected() {
        let error = NewBillForm { pct: "-5".to_string(), ..form() }
            .into_draft("a@a")
            .expect_err("pct must be a non-negative integer");
        assert!(matches!(error, ValidationFailure::InvalidField { field: "pct", .. }));
    }
}
