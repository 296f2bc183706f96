//! Upload ingestion.
//!
//! # Responsibilities
//! - Classify an upload once (`UploadKind`) instead of scattering sniffing
//! - Turn a request body into on-disk files plus a populated `Site`
//! - Select the target site: premium (password-checked) or fresh temporary
//! - Register the site only after every file is fully on disk
//!
//! # Design Decisions
//! - Premium uploads stage into a `{dir}-tmp` sibling and swap on success,
//!   so a failed re-upload never corrupts a currently-serving site
//! - Concurrent uploads to the same premium name are serialized by a
//!   per-site guard held from the first staged write through the commit
//!   swap and registry update; the swapped-in set is always one writer's
//!   complete upload
//! - Multipart batches have documented partial-success semantics: a failing
//!   file is skipped and logged, earlier files stay on disk, no rollback
//! - All functions here are synchronous; the HTTP layer collects the body
//!   first and runs ingest on a blocking task

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;

use crate::paths;
use crate::resolve;
use crate::site::model::{generate_site_token, upsert_file, Site, SiteFile};
use crate::site::store::{RegistryError, SiteStore};
use crate::unpack::unpack_zip_archives;

/// Maximum accepted upload payload.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// How one upload request is ingested, decided once at the top of ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Raw body persisted as a single file named after the request path.
    Raw,
    /// Raw body treated as a zip archive (`.zip` path suffix or the
    /// conventional `/upload` / `/api/upload` path).
    Archive,
    /// `multipart/form-data` batch, one file per form field.
    MultipartForm,
}

impl UploadKind {
    pub fn detect(content_type: Option<&str>, path: &str) -> Result<Self, IngestError> {
        match content_type {
            None | Some("") => {
                if paths::is_zip_path(path) || path == "/upload" || path == "/api/upload" {
                    Ok(UploadKind::Archive)
                } else {
                    Ok(UploadKind::Raw)
                }
            }
            Some(ct) if ct.starts_with("multipart/") => Ok(UploadKind::MultipartForm),
            Some(ct) => Err(IngestError::UnsupportedContentType(ct.to_string())),
        }
    }
}

/// One file pulled out of a multipart form: the field name carries the
/// relative path the uploader chose.
#[derive(Debug)]
pub struct FormFile {
    pub name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no files in upload")]
    EmptyUpload,

    #[error("can't upload to '{0}': no premium site with that name")]
    UnknownPremiumHost(String),

    #[error("invalid password for premium site '{0}'")]
    InvalidPassword(String),

    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("malformed multipart form: {0}")]
    MalformedForm(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Successful ingest: the registered site and the preview URL returned to
/// the client.
#[derive(Debug)]
pub struct IngestOutcome {
    pub site_name: String,
    pub url: String,
    pub file_count: usize,
}

/// Pick the site an upload targets: an existing premium site when the
/// request host carries a registered premium label (password required in
/// the query string), otherwise a fresh temporary site.
///
/// A `spa` token anywhere in the query marks a new temporary site as a
/// single-page app.
pub fn prepare_target(
    store: &SiteStore,
    data_dir: &Path,
    host: &str,
    query: &str,
) -> Result<Site, IngestError> {
    if let Some(label) = resolve::premium_label(host) {
        return match store.find(&label) {
            Some(site) if site.is_premium => {
                let password = site.upload_password.clone().unwrap_or_default();
                if password.is_empty() || !query.contains(&password) {
                    return Err(IngestError::InvalidPassword(host.to_string()));
                }
                Ok(site)
            }
            _ => Err(IngestError::UnknownPremiumHost(host.to_string())),
        };
    }
    let name = generate_site_token();
    let dir = data_dir.join(&name);
    let is_spa = query.to_lowercase().contains("spa");
    Ok(Site::new_temporary(name, dir, is_spa))
}

/// Ingest a raw body as a single file named after the request path.
pub fn ingest_raw(
    store: &SiteStore,
    site: Site,
    request_path: &str,
    body: Bytes,
    host: &str,
) -> Result<IngestOutcome, IngestError> {
    if body.is_empty() || paths::is_blacklisted_ext(request_path) {
        return Err(IngestError::EmptyUpload);
    }
    let rel = paths::canonicalize(request_path);
    if rel.is_empty() {
        return Err(IngestError::EmptyUpload);
    }

    let serial = site.is_premium.then(|| store.upload_guard(&site.name));
    let _serial = serial.as_ref().map(|l| l.lock().unwrap());
    let staging = Staging::new(&site);
    let write_path = staging.write_dir.join(&rel);
    if let Err(err) = write_file(&write_path, &body) {
        staging.abort();
        return Err(err.into());
    }
    let disk_path = staging.live_dir.join(&rel);
    let total_size = body.len() as u64;
    let files = vec![SiteFile {
        path: rel,
        size: total_size,
        disk_path,
    }];
    finish(store, site, files, total_size, staging, host)
}

/// Ingest a raw body that is a zip archive: spool it to a scratch file,
/// expand it into the site directory, and drop the scratch file.
pub fn ingest_archive(
    store: &SiteStore,
    data_dir: &Path,
    site: Site,
    body: Bytes,
    host: &str,
) -> Result<IngestOutcome, IngestError> {
    if body.is_empty() {
        return Err(IngestError::EmptyUpload);
    }
    // the guard also covers the per-name scratch spool
    let serial = site.is_premium.then(|| store.upload_guard(&site.name));
    let _serial = serial.as_ref().map(|l| l.lock().unwrap());
    let scratch = ScratchFile::create(data_dir.join(format!("{}.dat", site.name)), &body)?;

    let staging = Staging::new(&site);
    let out = unpack_zip_archives(
        std::slice::from_ref(&scratch.path),
        &staging.write_dir,
        &staging.live_dir,
    );
    if let Some(err) = &out.last_err {
        tracing::warn!(site = %site.name, error = %err, "Archive upload partially failed");
    }
    if out.files.is_empty() {
        staging.abort();
        return Err(IngestError::EmptyUpload);
    }
    finish(store, site, out.files, out.total_size, staging, host)
}

/// Ingest a multipart form batch. Earlier files written to disk are kept
/// even when a later file fails (partial success); zip-named entries get a
/// second expansion pass.
pub fn ingest_multipart(
    store: &SiteStore,
    site: Site,
    form_files: Vec<FormFile>,
    host: &str,
) -> Result<IngestOutcome, IngestError> {
    let mut batch: Vec<(String, Bytes)> = form_files
        .into_iter()
        .filter(|f| !paths::is_blacklisted_ext(&f.name))
        .map(|f| (paths::canonicalize(&f.name), f.bytes))
        .filter(|(name, _)| !name.is_empty())
        .collect();
    if batch.is_empty() {
        return Err(IngestError::EmptyUpload);
    }

    let mut names: Vec<String> = batch.iter().map(|(n, _)| n.clone()).collect();
    paths::trim_slash_prefixes(&mut names);
    paths::trim_common_dir_prefix(&mut names);
    for (i, (name, _)) in batch.iter_mut().enumerate() {
        *name = names[i].clone();
    }

    let serial = site.is_premium.then(|| store.upload_guard(&site.name));
    let _serial = serial.as_ref().map(|l| l.lock().unwrap());
    let staging = Staging::new(&site);
    let mut files: Vec<SiteFile> = Vec::new();
    let mut total_size = 0u64;
    let mut zip_paths: Vec<PathBuf> = Vec::new();
    let mut last_err: Option<io::Error> = None;

    for (rel, bytes) in &batch {
        let write_path = staging.write_dir.join(rel);
        if let Err(err) = write_file(&write_path, bytes) {
            tracing::warn!(
                site = %site.name,
                file = %rel,
                error = %err,
                "File in batch skipped"
            );
            last_err = Some(err);
            continue;
        }
        tracing::info!(
            site = %site.name,
            file = %rel,
            size = %paths::humanize_size(bytes.len() as u64),
            "File saved"
        );
        if paths::is_zip_path(rel) {
            zip_paths.push(write_path);
        }
        upsert_file(
            &mut files,
            &mut total_size,
            SiteFile {
                path: rel.clone(),
                size: bytes.len() as u64,
                disk_path: staging.live_dir.join(rel),
            },
        );
    }

    if !zip_paths.is_empty() {
        let out = unpack_zip_archives(&zip_paths, &staging.write_dir, &staging.live_dir);
        if let Some(err) = &out.last_err {
            tracing::warn!(site = %site.name, error = %err, "Zip pass partially failed");
        }
        for f in out.files {
            upsert_file(&mut files, &mut total_size, f);
        }
    }

    if files.is_empty() {
        staging.abort();
        return match last_err {
            Some(err) => Err(err.into()),
            None => Err(IngestError::EmptyUpload),
        };
    }
    if let Some(err) = last_err {
        tracing::warn!(site = %site.name, error = %err, "Batch completed with skipped files");
    }
    finish(store, site, files, total_size, staging, host)
}

/// Commit the upload: swap staged premium directories, update the registry,
/// and build the preview URL.
fn finish(
    store: &SiteStore,
    mut site: Site,
    files: Vec<SiteFile>,
    total_size: u64,
    staging: Staging,
    host: &str,
) -> Result<IngestOutcome, IngestError> {
    if let Err(err) = staging.commit() {
        return Err(err.into());
    }

    let name = site.name.clone();
    let file_count = files.len();
    let url = if site.is_premium {
        format!("https://{}/", host)
    } else if file_count > 1 {
        format!("https://{}/p/{}/", host, name)
    } else {
        format!("https://{}/p/{}/{}", host, name, files[0].path)
    };

    if site.is_premium {
        store.replace_files(&name, files, total_size)?;
    } else {
        site.files = files;
        site.total_size = total_size;
        if let Err(err) = store.register(site) {
            return Err(err.into());
        }
    }

    Ok(IngestOutcome {
        site_name: name,
        url,
        file_count,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

/// Where upload bytes land. Temporary sites write straight into their live
/// directory; premium re-uploads write into a `-tmp` sibling that replaces
/// the live directory only on commit.
struct Staging {
    live_dir: PathBuf,
    write_dir: PathBuf,
    staged: bool,
}

impl Staging {
    fn new(site: &Site) -> Self {
        let live_dir = site.dir.clone();
        let (write_dir, staged) = if site.is_premium {
            let mut os = live_dir.clone().into_os_string();
            os.push("-tmp");
            (PathBuf::from(os), true)
        } else {
            (live_dir.clone(), false)
        };
        Self {
            live_dir,
            write_dir,
            staged,
        }
    }

    /// Swap the staged directory into place. No-op for direct writes.
    fn commit(self) -> io::Result<()> {
        if !self.staged {
            return Ok(());
        }
        if self.live_dir.exists() {
            fs::remove_dir_all(&self.live_dir)?;
        }
        fs::rename(&self.write_dir, &self.live_dir)
    }

    /// Discard everything written so far.
    fn abort(self) {
        let dir = if self.staged {
            &self.write_dir
        } else {
            &self.live_dir
        };
        if dir.exists() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}

/// Scratch file removed on drop; used to hand raw zip bodies to the
/// unpacker, which wants a path.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn create(path: PathBuf, bytes: &[u8]) -> io::Result<Self> {
        write_file(&path, bytes)?;
        Ok(Self { path })
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
