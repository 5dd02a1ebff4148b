use super::RecordStore;
use crate::error::StoreError;
use crate::record::InventoryRecord;
use std::sync::Mutex;

/// Process-local ordered list shared by every session of this process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<InventoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<InventoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl RecordStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }

    fn append(&self, records: &[InventoryRecord]) -> Result<usize, StoreError> {
        let mut stored = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        stored.extend_from_slice(records);
        Ok(records.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reference: &str, quantity: u32) -> InventoryRecord {
        InventoryRecord::new("Clamsalla", reference, "Produit", quantity).unwrap()
    }

    #[test]
    fn test_append_preserves_order() {
        let store = MemoryStore::new();
        store.append(&[record("Ref003", 1), record("Ref001", 2)]).unwrap();
        store.append(&[record("Ref002", 3)]).unwrap();

        let refs: Vec<String> = store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|r| r.reference)
            .collect();
        assert_eq!(refs, ["Ref003", "Ref001", "Ref002"]);
    }

    #[test]
    fn test_store_does_not_deduplicate() {
        let store = MemoryStore::with_records(vec![record("Ref001", 1)]);
        let written = store.append(&[record("Ref001", 9)]).unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.load_all().unwrap().len(), 2);
    }
}
