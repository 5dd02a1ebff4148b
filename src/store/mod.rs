// 🗄️ Record Store - where submitted counts live
//
// Every backend exposes the same two blocking calls. None of them deduplicate:
// a store appends whatever it is given, the form filters beforehand.

pub mod memory;
pub mod remote;
pub mod sqlite;

#[cfg(feature = "remote")]
pub mod sheets_http;

pub use memory::MemoryStore;
pub use remote::{RemoteStore, SheetClient};
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::record::InventoryRecord;

pub trait RecordStore: Send + Sync {
    /// Every persisted record, in storage order
    fn load_all(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    /// Persist each record in order. Returns how many were written.
    fn append(&self, records: &[InventoryRecord]) -> Result<usize, StoreError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
