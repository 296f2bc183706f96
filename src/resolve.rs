//! Request-path resolution against a site's file set.
//!
//! # Responsibilities
//! - Pick the site to serve (premium subdomain label or `/p/{token}` path)
//! - Pick the file to serve (exact match, clean URLs, directory index)
//! - Decide the fallback for unmatched paths (SPA shell, custom 404,
//!   built-in listing)
//!
//! # Design Decisions
//! - `resolve` is a pure function over a site snapshot; all side effects
//!   (SPA toggle, redirects, file reads) happen in the HTTP layer
//! - An unmatched path with a custom `404.html` serves the 404 page's own
//!   content with status 404
//! - Premium subdomain selection takes precedence over `/p/` paths

use crate::site::model::{Site, SiteFile};

/// Reserved control path that renders the file listing page.
pub const DIR_CONTROL_PATH: &str = "_dir";
/// Reserved control path that toggles the site's SPA flag.
pub const SPA_CONTROL_PATH: &str = "_spa";

/// Outcome of resolving a request path against one site.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Redirect to the same URL with a trailing slash appended, so
    /// relative links in served HTML stay stable.
    AppendSlash,
    /// Serve the file listing page.
    DirListing,
    /// Toggle the SPA flag, then redirect back.
    ToggleSpa,
    /// Serve this file with status 200.
    Serve(SiteFile),
    /// Unmatched path on an SPA site: serve the app shell with status 200.
    SpaFallback(SiteFile),
    /// Unmatched path with a custom 404 page: serve it with status 404.
    Custom404(SiteFile),
    /// Unmatched path, no fallback: built-in "no such file" listing, 404.
    NotFound,
}

/// Resolve `rest` (the request path with the site-selection prefix already
/// stripped, leading slash still present) against the site's file set.
pub fn resolve(site: &Site, rest: &str) -> Resolution {
    if rest.is_empty() {
        return Resolution::AppendSlash;
    }
    let mut to_find = rest.strip_prefix('/').unwrap_or(rest).to_string();

    if to_find == DIR_CONTROL_PATH {
        return Resolution::DirListing;
    }
    if to_find == SPA_CONTROL_PATH {
        return Resolution::ToggleSpa;
    }

    let file_index = site.files.iter().find(|f| f.path == "index.html");
    let file_404 = site.files.iter().find(|f| f.path == "404.html");

    if to_find.is_empty() {
        // a single-file site serves its only file at the root
        to_find = if site.files.len() == 1 {
            site.files[0].path.clone()
        } else {
            "index.html".to_string()
        };
    }

    if let Some(f) = site.files.iter().find(|f| f.path == to_find) {
        return Resolution::Serve(f.clone());
    }

    // clean URLs: /foo serves foo.html
    let with_html = format!("{}.html", to_find);
    if let Some(f) = site.files.iter().find(|f| f.path == with_html) {
        return Resolution::Serve(f.clone());
    }

    // directory index: /foo or /foo/ serves foo/index.html
    let with_index = format!("{}/index.html", to_find.trim_end_matches('/'));
    if let Some(f) = site.files.iter().find(|f| f.path == with_index) {
        return Resolution::Serve(f.clone());
    }

    if site.is_spa {
        if let Some(f) = file_index {
            return Resolution::SpaFallback(f.clone());
        }
    }
    if let Some(f) = file_404 {
        return Resolution::Custom404(f.clone());
    }
    Resolution::NotFound
}

/// Extract the premium-site label from a request host.
///
/// `"suma.instantpreview.dev"` => `Some("suma")`. Returns `None` for hosts
/// that are not a three-label subdomain or whose label is the reserved
/// `www`. The port, if any, is ignored.
pub fn premium_label(host: &str) -> Option<String> {
    let host = host.split(':').next().unwrap_or(host);
    let mut parts = host.split('.');
    let label = parts.next()?;
    if parts.count() != 2 {
        return None;
    }
    let label = label.to_lowercase();
    if label.is_empty() || label == "www" {
        return None;
    }
    Some(label)
}
