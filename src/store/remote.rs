// ☁️ Remote spreadsheet backend
//
// The sheet is append-only: read every row, append one row per record.
// Rows are keyed by the header row, so column order on the sheet may differ
// from ours. Appends are best effort: a failure halfway leaves earlier rows
// in place and reports how many were written.

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{InventoryRecord, HEADERS};
use std::collections::HashMap;

/// Minimal API of a named spreadsheet worksheet.
pub trait SheetClient: Send + Sync {
    /// All rows, header row first. An untouched sheet returns no rows.
    fn read_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Append one row after the last non-empty row.
    fn append_row(&self, cells: &[String]) -> Result<(), StoreError>;
}

pub struct RemoteStore<C> {
    client: C,
}

impl<C: SheetClient> RemoteStore<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

/// Turn header-keyed rows into records. Blank rows are skipped.
fn parse_rows(rows: Vec<Vec<String>>) -> Result<Vec<InventoryRecord>, StoreError> {
    let mut rows = rows.into_iter();
    let header = match rows.next() {
        Some(header) => header,
        None => return Ok(Vec::new()),
    };

    let columns: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let mut index = [0usize; 4];
    for (slot, name) in HEADERS.iter().enumerate() {
        index[slot] = *columns.get(name).ok_or_else(|| StoreError::MalformedRow {
            row: 1,
            reason: format!("missing column {}", name),
        })?;
    }

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        // Sheet row number: header is row 1
        let row_number = i + 2;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |slot: usize| row.get(index[slot]).map(|c| c.trim()).unwrap_or("");

        let quantity = cell(3)
            .parse::<u32>()
            .map_err(|_| StoreError::MalformedRow {
                row: row_number,
                reason: format!("quantity {:?} is not a non-negative integer", cell(3)),
            })?;

        let record = InventoryRecord::new(cell(0), cell(1), cell(2), quantity).map_err(|e| {
            StoreError::MalformedRow {
                row: row_number,
                reason: e.to_string(),
            }
        })?;
        records.push(record);
    }

    Ok(records)
}

impl<C: SheetClient> RecordStore for RemoteStore<C> {
    fn load_all(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = self.client.read_rows()?;
        let records = parse_rows(rows)?;
        tracing::debug!(count = records.len(), "loaded remote records");
        Ok(records)
    }

    fn append(&self, records: &[InventoryRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        // A fresh sheet gets its header first, otherwise the first record
        // would be read back as the header row.
        if self.client.read_rows()?.is_empty() {
            let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
            self.client.append_row(&header)?;
        }

        for (written, record) in records.iter().enumerate() {
            if let Err(err) = self.client.append_row(&record.to_row()) {
                tracing::warn!(
                    written,
                    attempted = records.len(),
                    reference = %record.reference,
                    "remote append stopped partway"
                );
                return Err(match err {
                    StoreError::RemoteAccess { message, .. } => StoreError::RemoteAccess {
                        message,
                        appended: written,
                    },
                    other => other,
                });
            }
        }

        Ok(records.len())
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-process sheet that can be told to fail after N appends.
    #[derive(Default)]
    pub struct FakeSheet {
        pub rows: Mutex<Vec<Vec<String>>>,
        pub fail_reads: AtomicBool,
        pub fail_after: Option<usize>,
        appends: Mutex<usize>,
    }

    impl FakeSheet {
        pub fn with_rows(rows: &[&[&str]]) -> Self {
            let rows = rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect();
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        pub fn unreachable() -> Self {
            Self {
                fail_reads: AtomicBool::new(true),
                ..Default::default()
            }
        }

        pub fn read_only() -> Self {
            Self {
                fail_after: Some(0),
                ..Default::default()
            }
        }
    }

    impl SheetClient for FakeSheet {
        fn read_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::remote("403 Forbidden"));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        fn append_row(&self, cells: &[String]) -> Result<(), StoreError> {
            let mut appends = self.appends.lock().unwrap();
            if self.fail_after.is_some_and(|limit| *appends >= limit) {
                return Err(StoreError::remote("connection reset"));
            }
            *appends += 1;
            self.rows.lock().unwrap().push(cells.to_vec());
            Ok(())
        }
    }

    fn record(reference: &str, quantity: u32) -> InventoryRecord {
        InventoryRecord::new("Mguerger", reference, "Produit", quantity).unwrap()
    }

    #[test]
    fn test_empty_sheet_loads_nothing() {
        let store = RemoteStore::new(FakeSheet::default());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_rows_keyed_by_header() {
        let sheet = FakeSheet::with_rows(&[
            &["Quantité", "Référence", "Inventoriste", "Description"],
            &["3", "Ref002", "Bmehaini", "Produit B"],
            &["", "", "", ""],
            &["0", "Ref005", "Clamsalla", "Produit E"],
        ]);
        let store = RemoteStore::new(sheet);

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            InventoryRecord::new("Bmehaini", "Ref002", "Produit B", 3).unwrap()
        );
        assert_eq!(records[1].quantity, 0);
    }

    #[test]
    fn test_malformed_quantity_rejected() {
        let sheet = FakeSheet::with_rows(&[
            &["Inventoriste", "Référence", "Description", "Quantité"],
            &["Bmehaini", "Ref001", "Produit A", "-2"],
        ]);
        let err = RemoteStore::new(sheet).load_all().unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { row: 2, .. }));
    }

    #[test]
    fn test_missing_column_rejected() {
        let sheet = FakeSheet::with_rows(&[&["Inventoriste", "Référence"]]);
        let err = RemoteStore::new(sheet).load_all().unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { row: 1, .. }));
    }

    #[test]
    fn test_first_append_writes_header() {
        let store = RemoteStore::new(FakeSheet::default());
        store.append(&[record("Ref001", 5)]).unwrap();

        let rows = store.client().rows.lock().unwrap().clone();
        assert_eq!(rows[0], HEADERS.map(String::from).to_vec());
        assert_eq!(rows[1], record("Ref001", 5).to_row().to_vec());
        drop(rows);

        assert_eq!(store.load_all().unwrap(), vec![record("Ref001", 5)]);
    }

    #[test]
    fn test_zero_padded_reference_round_trips() {
        let store = RemoteStore::new(FakeSheet::default());
        let written = InventoryRecord::new("Clamsalla", "00123", "=Produit", 0).unwrap();
        store.append(std::slice::from_ref(&written)).unwrap();

        assert_eq!(store.client().rows.lock().unwrap()[1], ["Clamsalla", "00123", "=Produit", "0"]);
        assert_eq!(store.load_all().unwrap(), vec![written]);
    }

    #[test]
    fn test_partial_append_reports_rows_written() {
        let sheet = FakeSheet {
            // header + one record succeed, the second record fails
            fail_after: Some(2),
            ..Default::default()
        };
        let store = RemoteStore::new(sheet);

        let err = store
            .append(&[record("Ref001", 1), record("Ref002", 2), record("Ref003", 3)])
            .unwrap_err();

        assert_eq!(err.rows_written(), 1);
        // No rollback: the first record stays
        assert_eq!(store.load_all().unwrap(), vec![record("Ref001", 1)]);
    }

    #[test]
    fn test_read_failure_surfaces_remote_access() {
        let err = RemoteStore::new(FakeSheet::unreachable()).load_all().unwrap_err();
        assert!(matches!(err, StoreError::RemoteAccess { .. }));
    }
}
