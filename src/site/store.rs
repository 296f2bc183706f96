//! In-memory site registry.
//!
//! # Responsibilities
//! - Own the name → Site mapping and its concurrency discipline
//! - Registration (duplicate rejection), lookup, SPA toggle
//! - Premium re-upload file-set replacement (last writer wins)
//! - Expiry sweep support
//!
//! # Design Decisions
//! - One mutex scoped to the whole registry for the name → Site map
//! - Lookups return clones so readers never hold the lock across I/O and
//!   never observe a partially mutated site
//! - Per-site upload guards serialize premium re-uploads, which write to a
//!   shared staging directory; the registry mutex itself is never held
//!   across filesystem work
//! - The sweep returns evicted directories so the caller can delete them
//!   after the lock is released

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::paths::humanize_size;
use crate::site::model::{Site, SiteSummary, TOKEN_LEN};

/// Registry mutation errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a site named '{0}' is already registered")]
    DuplicateName(String),

    #[error("no site named '{0}' is registered")]
    UnknownSite(String),
}

/// Registry of all currently hosted sites.
///
/// Constructed once at startup and shared via `Arc`; every component that
/// reads or mutates site state goes through it.
#[derive(Debug, Default)]
pub struct SiteStore {
    sites: Mutex<HashMap<String, Site>>,
    upload_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fully populated site. Fails if the name is taken.
    pub fn register(&self, site: Site) -> Result<(), RegistryError> {
        let mut sites = self.sites.lock().unwrap();
        if sites.contains_key(&site.name) {
            return Err(RegistryError::DuplicateName(site.name));
        }
        tracing::info!(
            site = %site.name,
            files = site.files.len(),
            total_size = site.total_size,
            premium = site.is_premium,
            "Site registered"
        );
        sites.insert(site.name.clone(), site);
        Ok(())
    }

    /// Exact-name lookup, cloned out from under the lock.
    pub fn find(&self, name: &str) -> Option<Site> {
        self.sites.lock().unwrap().get(name).cloned()
    }

    /// Look up a site by the fixed-length token embedded in a
    /// `/p/{token}/...` style path.
    pub fn find_by_path_token(&self, path: &str) -> Option<Site> {
        let rest = path.strip_prefix("/p/")?;
        let token = rest.split('/').next()?;
        if token.len() != TOKEN_LEN {
            return None;
        }
        self.find(token)
    }

    /// Flip a site's SPA flag; returns the new value.
    pub fn toggle_spa(&self, name: &str) -> Result<bool, RegistryError> {
        let mut sites = self.sites.lock().unwrap();
        let site = sites
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownSite(name.to_string()))?;
        site.is_spa = !site.is_spa;
        tracing::info!(site = %name, is_spa = site.is_spa, "SPA flag toggled");
        Ok(site.is_spa)
    }

    /// Per-site lock serializing uploads that target the same name.
    /// Premium re-uploads share one staging directory, so the guard must
    /// be held from the first staged write through the commit swap and the
    /// file-set replacement.
    pub fn upload_guard(&self, name: &str) -> Arc<Mutex<()>> {
        self.upload_locks
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Replace a site's whole file set in one step. Used by premium
    /// re-uploads so a concurrent reader sees either the old set or the
    /// new set, never a mix.
    pub fn replace_files(
        &self,
        name: &str,
        files: Vec<crate::site::model::SiteFile>,
        total_size: u64,
    ) -> Result<(), RegistryError> {
        let mut sites = self.sites.lock().unwrap();
        let site = sites
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownSite(name.to_string()))?;
        site.files = files;
        site.total_size = total_size;
        Ok(())
    }

    /// Read-only copies for reporting endpoints. `public_host` is the
    /// apex host used to compute premium subdomain URLs.
    pub fn snapshot(&self, public_host: &str) -> Vec<SiteSummary> {
        let sites = self.sites.lock().unwrap();
        let mut summaries: Vec<SiteSummary> = sites
            .values()
            .map(|s| SiteSummary {
                name: s.name.clone(),
                file_count: s.files.len(),
                total_size: s.total_size,
                total_size_str: humanize_size(s.total_size),
                is_spa: s.is_spa,
                is_premium: s.is_premium,
                url: if s.is_premium {
                    format!("https://{}.{}/", s.name, public_host)
                } else {
                    format!("https://{}/p/{}/", public_host, s.name)
                },
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Site count and total hosted bytes.
    pub fn stats(&self) -> (usize, u64) {
        let sites = self.sites.lock().unwrap();
        let total = sites.values().map(|s| s.total_size).sum();
        (sites.len(), total)
    }

    /// Remove every non-premium site older than `ttl` in a single pass.
    /// Returns the evicted names and directories; the caller deletes the
    /// directories after this method (and the lock) returns.
    pub fn sweep_expired(&self, ttl: Duration) -> Vec<(String, PathBuf)> {
        let mut sites = self.sites.lock().unwrap();
        let expired: Vec<String> = sites
            .values()
            .filter(|s| s.is_expired(ttl))
            .map(|s| s.name.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|name| sites.remove(&name).map(|s| (s.name, s.dir)))
            .collect()
    }
}
