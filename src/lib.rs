//! Ephemeral static-site hosting.
//!
//! Uploads (raw file, multipart folder drop, or zip archive) become
//! immediately servable sites, either under `/p/{token}/...` or, for
//! premium sites, under a dedicated subdomain. Temporary sites expire
//! after a fixed retention window; premium sites persist.

pub mod config;
pub mod http;
pub mod ingest;
pub mod paths;
pub mod resolve;
pub mod site;
pub mod sweep;
pub mod unpack;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use site::{Site, SiteStore};
