//! Contract of the bill store collaborator.
//!
//! Components depend on [`BillStore`] only. The in-memory and scripted
//! implementations live in the `billed-store` crate.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::bill::{Bill, NewBill, ReceiptFile};

/// Store failures. `Display` is the text shown to the employee, so it must
/// stay stable: `Status(404)` renders as `Erreur 404`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Erreur {0}")]
    Status(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("Erreur : délai d'attente dépassé ({after_ms} ms)")]
    Timeout { after_ms: u64 },
}

/// Location of an uploaded receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReceipt {
    pub key: String,
    pub file_url: String,
}

#[async_trait]
pub trait BillStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Bill>, StoreError>;
    async fn upload_receipt(
        &self,
        file: &ReceiptFile,
        email: &str,
    ) -> Result<StoredReceipt, StoreError>;
    async fn create(&self, bill: NewBill) -> Result<Bill, StoreError>;
}

/// Bounds a store call; an elapsed timer becomes [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { after_ms: timeout.as_millis() as u64 }),
    }
}
