// Inventaire - Core Library
// Shared by the CLI, the terminal UI and the web server

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod form;
pub mod logging;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use auth::{AuthGate, Passphrase, Session};
pub use catalog::{Catalog, CatalogEntry};
pub use config::{AppConfig, StoreConfig};
pub use error::{AuthError, CatalogError, ConfigError, ExportError, FormError, RecordError, StoreError};
pub use export::{ExportFormat, EXPORT_FILE_NAME, SHEET_NAME, XLSX_MIME};
pub use form::{FormState, InventoryForm, Selection, SubmitOutcome};
pub use record::{InventoryRecord, HEADERS};
pub use store::{MemoryStore, RecordStore, RemoteStore, SheetClient, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
