use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use billed_core::domain::bill::{Bill, BillId, NewBill, ReceiptFile};
use billed_core::store::{BillStore, StoreError, StoredReceipt};

use crate::fixtures::sample_bills;

pub const DEFAULT_STORAGE_BASE_URL: &str = "memory://receipts";

/// An uploaded receipt and the account it was uploaded for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptBlob {
    pub email: String,
    pub file_name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

/// Process-local bill store. `list` returns bills in insertion order.
pub struct InMemoryBillStore {
    bills: RwLock<Vec<Bill>>,
    receipts: RwLock<HashMap<String, ReceiptBlob>>,
    storage_base_url: String,
}

impl Default for InMemoryBillStore {
    fn default() -> Self {
        Self::with_bills(Vec::new())
    }
}

impl InMemoryBillStore {
    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            bills: RwLock::new(bills),
            receipts: RwLock::new(HashMap::new()),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
        }
    }

    /// Store preloaded with the sample bills.
    pub fn seeded() -> Self {
        Self::with_bills(sample_bills())
    }

    /// Loads bills from a JSON array using the legacy field names.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let bills: Vec<Bill> = serde_json::from_str(raw)?;
        Ok(Self::with_bills(bills))
    }

    pub fn with_storage_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.storage_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn bills(&self) -> Vec<Bill> {
        self.bills.read().await.clone()
    }

    pub async fn receipt(&self, key: &str) -> Option<ReceiptBlob> {
        self.receipts.read().await.get(key).cloned()
    }
}

#[async_trait]
impl BillStore for InMemoryBillStore {
    async fn list(&self) -> Result<Vec<Bill>, StoreError> {
        Ok(self.bills.read().await.clone())
    }

    async fn upload_receipt(
        &self,
        file: &ReceiptFile,
        email: &str,
    ) -> Result<StoredReceipt, StoreError> {
        let key = Uuid::new_v4().to_string();
        let file_name = file.file_name().to_string();
        let file_url = format!("{}/{key}/{file_name}", self.storage_base_url);

        self.receipts.write().await.insert(
            key.clone(),
            ReceiptBlob {
                email: email.to_string(),
                file_name,
                media_type: file.media_type.clone(),
                content: file.content.clone(),
            },
        );
        debug!(event_name = "store.memory.receipt_uploaded", key = %key, "receipt stored");

        Ok(StoredReceipt { key, file_url })
    }

    async fn create(&self, bill: NewBill) -> Result<Bill, StoreError> {
        let id = BillId(Uuid::new_v4().simple().to_string());
        let bill = bill.into_bill(id);
        self.bills.write().await.push(bill.clone());
        debug!(event_name = "store.memory.bill_created", bill_id = %bill.id, "bill stored");
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use billed_core::domain::bill::{BillStatus, ExpenseType, NewBill, ReceiptFile};
    use billed_core::store::BillStore;

    use super::InMemoryBillStore;
    use crate::fixtures::sample_bills;

    #[tokio::test]
    async fn seeded_store_lists_the_sample_bills_in_store_order() {
        let store = InMemoryBillStore::seeded();
        let bills = store.list().await.expect("list");

        let ids: Vec<&str> = bills.iter().map(|bill| bill.id.0.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "47qAXb6fIm2zOKkLzMro",
                "BeKy5Mo4jkmdfPGYpTxZ",
                "UIUZtnPQvnbFnB0ozvJh",
                "qcCK3SzECmaZAGRrHjaC",
            ]
        );
    }

    #[tokio::test]
    async fn upload_then_create_links_the_receipt() {
        let store = InMemoryBillStore::default().with_storage_base_url("https://files.test/");
        let file = ReceiptFile::new("C:\\fakepath\\test.png", "image/png", b"png".to_vec());

        let stored = store.upload_receipt(&file, "a@a").await.expect("upload");
        assert_eq!(stored.file_url, format!("https://files.test/{}/test.png", stored.key));

        let blob = store.receipt(&stored.key).await.expect("receipt kept");
        assert_eq!(blob.email, "a@a");
        assert_eq!(blob.content, b"png".to_vec());

        let created = store
            .create(NewBill {
                email: "a@a".to_string(),
                expense_type: ExpenseType::Transports,
                name: "Vol".to_string(),
                amount: 348,
                date: NaiveDate::from_ymd_opt(2024, 5, 2).expect("valid date"),
                vat: Some(70),
                pct: 20,
                commentary: String::new(),
                file_url: stored.file_url.clone(),
                file_name: "test.png".to_string(),
                status: BillStatus::Pending,
            })
            .await
            .expect("create");

        assert_eq!(created.date, "2024-05-02");
        assert_eq!(created.receipt_url(), Some(stored.file_url.as_str()));
        assert_eq!(store.bills().await, vec![created]);
    }

    #[test]
    fn json_records_keep_legacy_field_names() {
        let store = InMemoryBillStore::from_json(
            r#"[{"id":"x1","email":"a@a","type":"Transports","name":"taxi","amount":30,
                "date":"2021-06-01","status":"pending","fileUrl":"null","commentAdmin":"vu"}]"#,
        )
        .expect("valid json");

        let bills = store.bills.try_read().expect("uncontended").clone();
        assert_eq!(bills[0].comment_admin.as_deref(), Some("vu"));
        assert_eq!(bills[0].receipt_url(), None);
    }

    #[tokio::test]
    async fn malformed_records_do_not_drop_the_sample_bills() {
        let mut records = serde_json::to_value(sample_bills()).expect("samples serialize");
        let array = records.as_array_mut().expect("array");
        array.push(serde_json::json!({"id": "null-date", "date": null, "status": "pending"}));
        array.push(serde_json::json!({"id": "no-status", "date": "2002-02-02", "amount": 20}));
        array.push(serde_json::json!({
            "id": "fraction", "date": "2003-03-03", "status": "accepted", "amount": 12.5
        }));

        let store = InMemoryBillStore::from_json(&records.to_string()).expect("lenient records");
        let bills = store.list().await.expect("list");

        assert_eq!(bills.len(), 7);
        assert_eq!(&bills[..4], &sample_bills()[..]);
        assert_eq!(bills[4].date, "");
        assert_eq!(bills[5].status, BillStatus::Unrecognized(String::new()));
        assert_eq!(bills[6].amount, 13);
    }
}
