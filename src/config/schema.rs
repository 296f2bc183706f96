//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML config
//! file; every field has a default so the server runs with no file at all.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the preview server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, public host).
    pub listener: ListenerConfig,

    /// On-disk storage layout.
    pub storage: StorageConfig,

    /// Request limits and timeouts.
    pub limits: LimitsConfig,

    /// Temporary-site retention.
    pub expiry: ExpiryConfig,

    /// Premium-site credential sources.
    pub premium: PremiumConfig,

    /// Operator endpoints (/sites, /api/sites.json).
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Apex host used when computing site URLs for reporting endpoints.
    pub public_host: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_host: "instantpreview.dev".to_string(),
        }
    }
}

/// On-disk storage layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for temporary sites; wiped and recreated at process start.
    pub data_dir: PathBuf,

    /// Root for premium sites; persists across restarts.
    pub premium_data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            premium_data_dir: PathBuf::from("data-premium"),
        }
    }
}

/// Request limits and timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Upload-size ceiling in bytes.
    pub max_upload_bytes: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: crate::ingest::MAX_UPLOAD_BYTES,
            request_timeout_secs: 120,
        }
    }
}

/// Temporary-site retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExpiryConfig {
    /// How long a temporary site lives after creation.
    pub ttl_secs: u64,

    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 2 * 3600,
            sweep_interval_secs: 3600,
        }
    }
}

/// Premium-site credential sources. Both hold newline-separated
/// `name,password` records; the env var is read first, then the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PremiumConfig {
    /// Environment variable holding credential records.
    pub env_var: String,

    /// Optional secrets file with the same format.
    pub secrets_file: Option<PathBuf>,
}

impl Default for PremiumConfig {
    fn default() -> Self {
        Self {
            env_var: "PREMIUM_SITES".to_string(),
            secrets_file: None,
        }
    }
}

/// Operator endpoints. An empty password disables them.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared secret for /sites and /api/sites.json (`?pwd=`).
    pub password: String,
}
