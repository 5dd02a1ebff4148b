// ⚠️ Error model - one typed error per boundary
// Binaries wrap these in anyhow; the library never panics on bad input.

use thiserror::Error;

/// Failure talking to a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport, credential or API failure on the remote spreadsheet.
    /// `appended` counts rows already written before the failure (no rollback).
    #[error("remote store unavailable: {message}")]
    RemoteAccess { message: String, appended: usize },

    /// A stored row could not be turned into an inventory record.
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// Local SQLite failure.
    #[error("local store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The in-process store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteAccess {
            message: message.into(),
            appended: 0,
        }
    }

    /// Rows written before the failure; only meaningful for remote appends.
    pub fn rows_written(&self) -> usize {
        match self {
            Self::RemoteAccess { appended, .. } => *appended,
            _ => 0,
        }
    }
}

/// Authentication failure. Deliberately carries no detail about which part was wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Identifiants incorrects.")]
pub struct AuthError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate reference in catalog: {0}")]
    DuplicateReference(String),

    #[error("empty reference on catalog line {0}")]
    EmptyReference(usize),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("inventory record needs a non-empty {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet encoding failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv buffer error: {0}")]
    Buffer(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by the inventory form to whatever UI drives it.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("not signed in")]
    NotSignedIn,

    #[error("reference {0} is not available")]
    Unavailable(String),

    #[error("reference {0} is not selected")]
    NotSelected(String),

    #[error("nothing selected")]
    EmptySelection,

    #[error("all references have been inventoried")]
    FullyInventoried,

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
