//! Site registry subsystem.
//!
//! # Data Flow
//! ```text
//! Upload (ingest):
//!     Files written to disk → Site built → SiteStore::register
//!
//! Preview (resolve):
//!     Host/path → SiteStore lookup → file picked from the Site's file set
//!
//! Expiry (sweep):
//!     Interval tick → SiteStore::sweep_expired → directories deleted
//! ```

pub mod model;
pub mod store;

pub use model::{Site, SiteFile, SiteSummary, TOKEN_LEN};
pub use store::{RegistryError, SiteStore};
