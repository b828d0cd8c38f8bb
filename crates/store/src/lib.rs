//! Bill store implementations: an in-memory store seeded with sample bills
//! and a scripted wrapper for failure injection.

pub mod fixtures;
pub mod memory;
pub mod scripted;

pub use fixtures::{corrupted_bills, sample_bills, FIXTURE_EMAIL};
pub use memory::{InMemoryBillStore, ReceiptBlob, DEFAULT_STORAGE_BASE_URL};
pub use scripted::{ScriptedBillStore, StoreCalls};
