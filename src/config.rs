// ⚙️ Configuration - inventaire.toml
//
// Every section is optional; an absent file yields the built-in defaults
// (three known identities, shared passphrase, six-reference catalog,
// in-memory store).

use crate::auth::{AuthGate, Passphrase, DEFAULT_IDENTITIES, DEFAULT_PASSPHRASE};
use crate::catalog::Catalog;
use crate::error::ConfigError;
use crate::store::{MemoryStore, RecordStore, SqliteStore};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONFIG_ENV: &str = "INVENTAIRE_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub identities: Vec<String>,
    pub passphrase: Option<String>,
    /// Hex SHA-256 of the passphrase; wins over `passphrase` when both are set
    pub passphrase_sha256: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identities: DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect(),
            passphrase: None,
            passphrase_sha256: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// CSV with `Référence,Description` headers
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
    },
    Remote {
        spreadsheet: String,
        #[serde(default = "default_worksheet")]
        worksheet: String,
        /// Environment variable holding the bearer token
        #[serde(default = "default_token_env")]
        token_env: String,
    },
}

fn default_worksheet() -> String {
    "Inventaire".to_string()
}

fn default_token_env() -> String {
    "INVENTAIRE_SHEETS_TOKEN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, or fall back to `$INVENTAIRE_CONFIG`, or to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };

        let Some(path) = path else {
            return Ok(AppConfig::default());
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.identities.is_empty() {
            return Err(ConfigError::Invalid("auth.identities must not be empty".into()));
        }
        if let Some(digest) = &self.auth.passphrase_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::Invalid(
                    "auth.passphrase_sha256 must be 64 hex characters".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn auth_gate(&self) -> AuthGate {
        let passphrase = match (&self.auth.passphrase_sha256, &self.auth.passphrase) {
            (Some(digest), _) => Passphrase::Sha256(digest.clone()),
            (None, Some(plain)) => Passphrase::Plain(plain.clone()),
            (None, None) => Passphrase::Plain(DEFAULT_PASSPHRASE.to_string()),
        };
        AuthGate::new(self.auth.identities.clone(), passphrase)
    }

    pub fn catalog(&self) -> Result<Catalog> {
        match &self.catalog.path {
            Some(path) => Catalog::from_csv_path(path)
                .with_context(|| format!("Failed to load catalog: {:?}", path)),
            None => Ok(Catalog::default()),
        }
    }

    /// Open the configured backend
    pub fn open_store(&self) -> Result<Arc<dyn RecordStore>> {
        let store: Arc<dyn RecordStore> = match &self.store {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::Sqlite { path } => Arc::new(
                SqliteStore::open(path)
                    .with_context(|| format!("Failed to open database: {:?}", path))?,
            ),
            StoreConfig::Remote {
                spreadsheet,
                worksheet,
                token_env,
            } => open_remote(spreadsheet, worksheet, token_env)?,
        };

        tracing::info!(backend = store.backend(), "record store ready");
        Ok(store)
    }
}

#[cfg(feature = "remote")]
fn open_remote(spreadsheet: &str, worksheet: &str, token_env: &str) -> Result<Arc<dyn RecordStore>> {
    use crate::store::sheets_http::HttpSheetClient;
    use crate::store::RemoteStore;

    let token = std::env::var(token_env)
        .with_context(|| format!("Missing bearer token in ${}", token_env))?;
    let client = HttpSheetClient::open_by_name(token, spreadsheet, worksheet)
        .with_context(|| format!("Failed to open spreadsheet {:?}", spreadsheet))?;
    Ok(Arc::new(RemoteStore::new(client)))
}

#[cfg(not(feature = "remote"))]
fn open_remote(_spreadsheet: &str, _worksheet: &str, _token_env: &str) -> Result<Arc<dyn RecordStore>> {
    anyhow::bail!("remote store not available: rebuild with --features remote")
}
