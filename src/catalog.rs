// 🗂️ Catalog - fixed reference list
// Availability = catalog entries with no stored record yet, in catalog order.

use crate::error::CatalogError;
use crate::record::InventoryRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Référence")]
    pub reference: String,

    #[serde(rename = "Description")]
    pub description: String,
}

impl CatalogEntry {
    pub fn new(reference: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or repeated references
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for (i, entry) in entries.iter().enumerate() {
            if entry.reference.trim().is_empty() {
                return Err(CatalogError::EmptyReference(i + 1));
            }
            if !seen.insert(entry.reference.as_str()) {
                return Err(CatalogError::DuplicateReference(entry.reference.clone()));
            }
        }

        Ok(Catalog { entries })
    }

    /// Load from a CSV file with `Référence,Description` headers
    pub fn from_csv_path(path: &Path) -> Result<Self, CatalogError> {
        let rdr = csv::Reader::from_path(path)?;
        Self::from_csv_reader(rdr)
    }

    pub fn from_csv<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Self::from_csv_reader(csv::Reader::from_reader(reader))
    }

    fn from_csv_reader<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self, CatalogError> {
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: CatalogEntry = result?;
            entries.push(entry);
        }
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, reference: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.reference == reference)
    }

    /// Entries not yet recorded in `records`, in catalog order.
    pub fn available(&self, records: &[InventoryRecord]) -> Vec<CatalogEntry> {
        let taken: HashSet<&str> = records.iter().map(|r| r.reference.as_str()).collect();

        self.entries
            .iter()
            .filter(|e| !taken.contains(e.reference.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for Catalog {
    /// The six packaging references the form ships with
    fn default() -> Self {
        let entries = [
            ("Ref001", "Produit A"),
            ("Ref002", "Produit B"),
            ("Ref003", "Produit C"),
            ("Ref004", "Produit D"),
            ("Ref005", "Produit E"),
            ("Ref006", "Produit F"),
        ]
        .into_iter()
        .map(|(reference, description)| CatalogEntry::new(reference, description))
        .collect();

        Catalog { entries }
    }
}
