// 📦 Inventory Record - one counted reference
// Fixed shape, validated once at construction, never edited afterwards.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// Column headers, in export and remote-sheet order.
pub const HEADERS: [&str; 4] = ["Inventoriste", "Référence", "Description", "Quantité"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Identity of the person who counted
    #[serde(rename = "Inventoriste")]
    pub inventoriste: String,

    /// Catalog reference (store-wide key)
    #[serde(rename = "Référence")]
    pub reference: String,

    #[serde(rename = "Description")]
    pub description: String,

    /// Observed count; zero is a real count, not "missing"
    #[serde(rename = "Quantité")]
    pub quantity: u32,
}

impl InventoryRecord {
    pub fn new(
        inventoriste: impl Into<String>,
        reference: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
    ) -> Result<Self, RecordError> {
        let inventoriste = inventoriste.into();
        let reference = reference.into();

        if inventoriste.trim().is_empty() {
            return Err(RecordError::MissingField("inventoriste"));
        }
        if reference.trim().is_empty() {
            return Err(RecordError::MissingField("reference"));
        }

        Ok(Self {
            inventoriste,
            reference,
            description: description.into(),
            quantity,
        })
    }

    /// Cells in `HEADERS` order.
    pub fn to_row(&self) -> [String; 4] {
        [
            self.inventoriste.clone(),
            self.reference.clone(),
            self.description.clone(),
            self.quantity.to_string(),
        ]
    }
}
