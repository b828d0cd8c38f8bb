//! A store wrapper whose next calls can be scripted to fail, stall or wait.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::debug;

use billed_core::domain::bill::{Bill, NewBill, ReceiptFile};
use billed_core::store::{BillStore, StoreError, StoredReceipt};

use crate::memory::InMemoryBillStore;

/// Number of calls that reached the store, failed ones included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreCalls {
    pub list: usize,
    pub upload: usize,
    pub create: usize,
}

#[derive(Default)]
struct Script {
    list_failures: VecDeque<StoreError>,
    upload_failures: VecDeque<StoreError>,
    create_failures: VecDeque<StoreError>,
    stalled_creates: usize,
    create_gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    upload: AtomicUsize,
    create: AtomicUsize,
}

pub struct ScriptedBillStore<S = InMemoryBillStore> {
    inner: S,
    script: Mutex<Script>,
    counters: Counters,
}

impl Default for ScriptedBillStore {
    fn default() -> Self {
        Self::new(InMemoryBillStore::default())
    }
}

impl ScriptedBillStore {
    pub fn seeded() -> Self {
        Self::new(InMemoryBillStore::seeded())
    }
}

impl<S> ScriptedBillStore<S>
where
    S: BillStore,
{
    pub fn new(inner: S) -> Self {
        Self { inner, script: Mutex::new(Script::default()), counters: Counters::default() }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_next_list(&self, error: StoreError) {
        self.with_script(|script| script.list_failures.push_back(error));
    }

    pub fn fail_next_upload(&self, error: StoreError) {
        self.with_script(|script| script.upload_failures.push_back(error));
    }

    pub fn fail_next_create(&self, error: StoreError) {
        self.with_script(|script| script.create_failures.push_back(error));
    }

    /// The next `create` never resolves and never reaches the inner store.
    pub fn stall_next_create(&self) {
        self.with_script(|script| script.stalled_creates += 1);
    }

    /// Holds every following `create` until a permit is added to the
    /// returned semaphore.
    pub fn gate_creates(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.with_script(|script| script.create_gate = Some(gate.clone()));
        gate
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            list: self.counters.list.load(Ordering::SeqCst),
            upload: self.counters.upload.load(Ordering::SeqCst),
            create: self.counters.create.load(Ordering::SeqCst),
        }
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        match self.script.lock() {
            Ok(mut script) => f(&mut script),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl<S> BillStore for ScriptedBillStore<S>
where
    S: BillStore,
{
    async fn list(&self) -> Result<Vec<Bill>, StoreError> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.with_script(|script| script.list_failures.pop_front()) {
            debug!(event_name = "store.scripted.list_failed", error = %error, "scripted failure");
            return Err(error);
        }
        self.inner.list().await
    }

    async fn upload_receipt(
        &self,
        file: &ReceiptFile,
        email: &str,
    ) -> Result<StoredReceipt, StoreError> {
        self.counters.upload.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.with_script(|script| script.upload_failures.pop_front()) {
            debug!(event_name = "store.scripted.upload_failed", error = %error, "scripted failure");
            return Err(error);
        }
        self.inner.upload_receipt(file, email).await
    }

    async fn create(&self, bill: NewBill) -> Result<Bill, StoreError> {
        self.counters.create.fetch_add(1, Ordering::SeqCst);

        let (stall, failure, gate) = self.with_script(|script| {
            if script.stalled_creates > 0 {
                script.stalled_creates -= 1;
                return (true, None, None);
            }
            (false, script.create_failures.pop_front(), script.create_gate.clone())
        });

        if stall {
            debug!(event_name = "store.scripted.create_stalled", "create will never resolve");
            return std::future::pending().await;
        }
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(error) = failure {
            debug!(event_name = "store.scripted.create_failed", error = %error, "scripted failure");
            return Err(error);
        }
        self.inner.create(bill).await
    }
}

#[cfg(test)]
mod tests {
    use billed_core::store::{BillStore, StoreError};

    use super::{ScriptedBillStore, StoreCalls};

    #[tokio::test]
    async fn scripted_failures_apply_once_in_order() {
        let store = ScriptedBillStore::seeded();
        store.fail_next_list(StoreError::Status(404));
        store.fail_next_list(StoreError::Status(500));

        assert_eq!(store.list().await, Err(StoreError::Status(404)));
        assert_eq!(store.list().await, Err(StoreError::Status(500)));
        assert_eq!(store.list().await.expect("third call passes").len(), 4);
        assert_eq!(store.calls(), StoreCalls { list: 3, upload: 0, create: 0 });
    }
}
