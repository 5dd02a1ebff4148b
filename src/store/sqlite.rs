// 💾 SQLite backend - durable local store
// Append-only table; no UNIQUE on reference, the form owns deduplication.

use super::RecordStore;
use crate::error::StoreError;
use crate::record::InventoryRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM inventory_records", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), rusqlite::Error> {
    // WAL for crash recovery; in-memory databases silently stay in "memory" mode
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS inventory_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            inventoriste TEXT NOT NULL,
            reference TEXT NOT NULL,
            description TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 0),
            recorded_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_inventory_reference ON inventory_records(reference)",
        [],
    )?;

    Ok(())
}

impl RecordStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT inventoriste, reference, description, quantity
             FROM inventory_records
             ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .enumerate()
            .map(|(i, (inventoriste, reference, description, quantity))| {
                InventoryRecord::new(inventoriste, reference, description, quantity).map_err(|e| {
                    StoreError::MalformedRow {
                        row: i + 1,
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }

    fn append(&self, records: &[InventoryRecord]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let recorded_at = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        for record in records {
            tx.execute(
                "INSERT INTO inventory_records (inventoriste, reference, description, quantity, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.inventoriste,
                    record.reference,
                    record.description,
                    record.quantity,
                    recorded_at,
                ],
            )?;
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
