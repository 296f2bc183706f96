//! Site and file data model.
//!
//! # Responsibilities
//! - Define `Site` and `SiteFile`
//! - Generate temporary-site tokens
//! - Rebuild a premium site's file set from its on-disk directory
//!
//! # Design Decisions
//! - Logical paths are slash-separated, relative, no leading slash
//! - `total_size` is maintained by whoever mutates `files`
//! - Duplicate logical paths collapse with last-write-wins

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rand::Rng;
use serde::Serialize;

/// Length of the random token that names a temporary site and is embedded
/// in its `/p/{token}/...` path prefix.
pub const TOKEN_LEN: usize = 6;

/// One served file. Immutable once created; owned exclusively by its Site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteFile {
    /// Logical path, slash-separated, relative, no leading slash.
    #[serde(rename = "Path")]
    pub path: String,

    /// Uncompressed byte size.
    #[serde(rename = "Size")]
    pub size: u64,

    /// Absolute on-disk location.
    #[serde(skip)]
    pub disk_path: PathBuf,
}

/// One hosted bundle of files under a unique name.
#[derive(Debug, Clone)]
pub struct Site {
    /// Stable identifier: random token for temporary sites, reserved
    /// subdomain label for premium sites. Unique within the registry.
    pub name: String,

    /// Absolute on-disk root; all file locations live under it.
    pub dir: PathBuf,

    /// Creation time; drives TTL eviction and "last modified" display.
    pub created_at: SystemTime,

    /// Served files, in insertion order.
    pub files: Vec<SiteFile>,

    /// Sum of `files[i].size`.
    pub total_size: u64,

    /// When true, unmatched paths fall back to `index.html`.
    pub is_spa: bool,

    /// Premium sites are loaded at startup and never expire.
    pub is_premium: bool,

    /// Required to re-upload to a premium site. Never empty for premium.
    pub upload_password: Option<String>,
}

impl Site {
    /// A fresh temporary site rooted at `dir`, empty until ingest fills it.
    pub fn new_temporary(name: String, dir: PathBuf, is_spa: bool) -> Self {
        Self {
            name,
            dir,
            created_at: SystemTime::now(),
            files: Vec::new(),
            total_size: 0,
            is_spa,
            is_premium: false,
            upload_password: None,
        }
    }

    /// A premium site whose file set is rebuilt by scanning `dir`.
    pub fn new_premium(name: String, dir: PathBuf, password: String) -> io::Result<Self> {
        let (files, total_size) = scan_site_dir(&dir)?;
        Ok(Self {
            name,
            dir,
            created_at: SystemTime::now(),
            files,
            total_size,
            is_spa: false,
            is_premium: true,
            upload_password: Some(password),
        })
    }

    /// Whether the sweeper may evict this site. Premium sites never expire.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        if self.is_premium {
            return false;
        }
        self.created_at.elapsed().unwrap_or_default() > ttl
    }
}

/// Read-only copy of one site for reporting endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SiteSummary {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "FileCount")]
    pub file_count: usize,
    #[serde(rename = "TotalSize")]
    pub total_size: u64,
    #[serde(rename = "TotalSizeStr")]
    pub total_size_str: String,
    #[serde(rename = "IsSPA")]
    pub is_spa: bool,
    #[serde(rename = "IsPremium")]
    pub is_premium: bool,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Generate a random lowercase-alphanumeric site token.
pub fn generate_site_token() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Append a file to a batch, replacing any earlier entry with the same
/// logical path (last write wins) and keeping the running total in sync.
pub fn upsert_file(files: &mut Vec<SiteFile>, total_size: &mut u64, file: SiteFile) {
    if let Some(existing) = files.iter_mut().find(|f| f.path == file.path) {
        *total_size = total_size.saturating_sub(existing.size) + file.size;
        *existing = file;
    } else {
        *total_size += file.size;
        files.push(file);
    }
}

/// Recursively scan a site directory, producing the file set and its total
/// size. A missing directory yields an empty set rather than an error.
pub fn scan_site_dir(root: &Path) -> io::Result<(Vec<SiteFile>, u64)> {
    let mut files = Vec::new();
    let mut total_size = 0u64;
    if !root.exists() {
        return Ok((files, total_size));
    }
    walk_dir(root, root, &mut files, &mut total_size)?;
    Ok((files, total_size))
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    files: &mut Vec<SiteFile>,
    total_size: &mut u64,
) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_dir() {
            walk_dir(root, &path, files, total_size)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            *total_size += meta.len();
            files.push(SiteFile {
                path: rel,
                size: meta.len(),
                disk_path: path,
            });
        }
    }
    Ok(())
}
