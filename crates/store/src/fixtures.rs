//! Canonical sample bills shared by tests and the CLI demo store.

use billed_core::domain::bill::{Bill, BillId, BillStatus, ExpenseType};

pub const FIXTURE_EMAIL: &str = "a@a";

const STORAGE_URL: &str = "https://test.storage.tld/v0/b/billable-677b6.appspot.com/o/justificatifs";

struct BillFixture {
    id: &'static str,
    name: &'static str,
    expense_type: &'static str,
    amount: u32,
    date: &'static str,
    status: &'static str,
    vat: Option<u32>,
    commentary: &'static str,
    comment_admin: &'static str,
    file_name: &'static str,
}

const SAMPLE_BILLS: &[BillFixture] = &[
    BillFixture {
        id: "47qAXb6fIm2zOKkLzMro",
        name: "encore",
        expense_type: "Hôtel et logement",
        amount: 400,
        date: "2004-04-04",
        status: "pending",
        vat: Some(80),
        commentary: "séminaire billed",
        comment_admin: "ok",
        file_name: "preview-facture-free-201801-pdf-1.jpg",
    },
    BillFixture {
        id: "BeKy5Mo4jkmdfPGYpTxZ",
        name: "test1",
        expense_type: "Transports",
        amount: 100,
        date: "2001-01-01",
        status: "refused",
        vat: None,
        commentary: "plop",
        comment_admin: "en fait non",
        file_name: "1592770761.jpeg",
    },
    BillFixture {
        id: "UIUZtnPQvnbFnB0ozvJh",
        name: "test3",
        expense_type: "Services en ligne",
        amount: 300,
        date: "2003-03-03",
        status: "accepted",
        vat: Some(60),
        commentary: "",
        comment_admin: "bon bah d'accord",
        file_name: "facture-client-php-exportee-dans-document-pdf-enregistre-sur-disque-dur.png",
    },
    BillFixture {
        id: "qcCK3SzECmaZAGRrHjaC",
        name: "test2",
        expense_type: "Restaurants et bars",
        amount: 200,
        date: "2002-02-02",
        status: "refused",
        vat: Some(40),
        commentary: "test2",
        comment_admin: "pas la bonne facture",
        file_name: "preview-facture-free-201801-pdf-1.jpg",
    },
];

impl BillFixture {
    fn to_bill(&self) -> Bill {
        Bill {
            id: BillId(self.id.to_string()),
            email: FIXTURE_EMAIL.to_string(),
            expense_type: ExpenseType::from(self.expense_type.to_string()),
            name: self.name.to_string(),
            amount: self.amount,
            date: self.date.to_string(),
            status: BillStatus::from(self.status.to_string()),
            file_url: Some(format!("{STORAGE_URL}%2F{}?alt=media", self.file_name)),
            file_name: Some(self.file_name.to_string()),
            commentary: Some(self.commentary.to_string()),
            vat: self.vat,
            pct: Some(20),
            comment_admin: Some(self.comment_admin.to_string()),
        }
    }
}

/// The four sample bills, in store order (not chronological).
pub fn sample_bills() -> Vec<Bill> {
    SAMPLE_BILLS.iter().map(BillFixture::to_bill).collect()
}

/// Records as a legacy store may return them: an unknown status, an
/// unparseable date and a `"null"` receipt URL.
pub fn corrupted_bills() -> Vec<Bill> {
    let mut unknown_status = SAMPLE_BILLS[0].to_bill();
    unknown_status.id = BillId("corrupted-status".to_string());
    unknown_status.status = BillStatus::from("archived".to_string());

    let mut bad_date = SAMPLE_BILLS[1].to_bill();
    bad_date.id = BillId("corrupted-date".to_string());
    bad_date.date = "04/04/2004".to_string();

    let mut null_receipt = SAMPLE_BILLS[2].to_bill();
    null_receipt.id = BillId("corrupted-receipt".to_string());
    null_receipt.file_url = Some("null".to_string());
    null_receipt.file_name = Some("null".to_string());

    vec![unknown_status, bad_date, null_receipt]
}
