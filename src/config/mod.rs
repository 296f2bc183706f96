//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     TOML file (optional) → schema defaults → validation → ServerConfig
//!     PREMIUM_SITES env var + secrets file → premium credentials
//! ```

pub mod loader;
pub mod schema;
pub mod secrets;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ServerConfig;
pub use secrets::{load_premium_credentials, PremiumCredential};
