//! Response construction.
//!
//! # Responsibilities
//! - Map ingest errors to plaintext HTTP error responses
//! - Render the built-in HTML pages (file listing, not-found listing,
//!   operator site list)
//!
//! # Design Decisions
//! - Error bodies are plaintext, mirroring the upload endpoint's plaintext
//!   success body
//! - All interpolated values are HTML-escaped

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::ingest::IngestError;
use crate::paths::humanize_size;
use crate::site::model::{Site, SiteSummary};

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngestError::EmptyUpload
            | IngestError::UnknownPremiumHost(_)
            | IngestError::InvalidPassword(_)
            | IngestError::UnsupportedContentType(_)
            | IngestError::MalformedForm(_) => StatusCode::BAD_REQUEST,
            IngestError::Registry(_) | IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("Error: {}\n", self)).into_response()
    }
}

/// Minimal HTML escaping for interpolated names and paths.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn file_list_items(site: &Site) -> String {
    let mut items = String::new();
    for f in &site.files {
        let escaped = html_escape(&f.path);
        items.push_str(&format!(
            "<li><a href=\"{}\">{}</a> ({})</li>\n",
            escaped,
            escaped,
            humanize_size(f.size)
        ));
    }
    items
}

/// The `_dir` control page: every file in the site, with sizes.
pub fn dir_listing_page(site: &Site) -> String {
    format!(
        "<!doctype html><html><head><title>{name}</title></head><body>\n\
         <h1>Files in {name}</h1>\n\
         <p>{count} files, {size} total. SPA mode: {spa} (<a href=\"_spa\">toggle</a>)</p>\n\
         <ul>\n{items}</ul>\n\
         </body></html>",
        name = html_escape(&site.name),
        count = site.files.len(),
        size = humanize_size(site.total_size),
        spa = site.is_spa,
        items = file_list_items(site),
    )
}

/// Built-in fallback when a path matches nothing and the site has neither
/// an SPA shell nor a custom 404 page.
pub fn not_found_page(site: &Site, requested: &str) -> String {
    format!(
        "<!doctype html><html><head><title>404</title></head><body>\n\
         <h1>No file '{requested}'</h1>\n\
         <p>Files in this site:</p>\n\
         <ul>\n{items}</ul>\n\
         </body></html>",
        requested = html_escape(requested),
        items = file_list_items(site),
    )
}

/// The operator `/sites` page.
pub fn sites_listing_page(summaries: &[SiteSummary]) -> String {
    let mut rows = String::new();
    for s in summaries {
        rows.push_str(&format!(
            "<tr><td><a href=\"{url}\">{name}</a></td><td>{files}</td><td>{size}</td>\
             <td>{spa}</td><td>{premium}</td></tr>\n",
            url = html_escape(&s.url),
            name = html_escape(&s.name),
            files = s.file_count,
            size = html_escape(&s.total_size_str),
            spa = s.is_spa,
            premium = s.is_premium,
        ));
    }
    format!(
        "<!doctype html><html><head><title>sites</title></head><body>\n\
         <h1>{count} sites</h1>\n\
         <table border=\"1\"><tr><th>name</th><th>files</th><th>size</th>\
         <th>spa</th><th>premium</th></tr>\n{rows}</table>\n\
         </body></html>",
        count = summaries.len(),
        rows = rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::model::SiteFile;
    use std::path::PathBuf;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
    }

    #[test]
    fn test_listing_pages_escape_paths() {
        let mut site = Site::new_temporary("abc123".into(), PathBuf::from("/tmp/abc123"), false);
        site.files.push(SiteFile {
            path: "<script>.html".into(),
            size: 3,
            disk_path: PathBuf::from("/tmp/abc123/x"),
        });
        let page = dir_listing_page(&site);
        assert!(page.contains("&lt;script&gt;.html"));
        assert!(!page.contains("<script>.html"));

        let page = not_found_page(&site, "<img>");
        assert!(page.contains("&lt;img&gt;"));
    }
}
