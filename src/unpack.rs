//! Zip archive expansion into a site directory.
//!
//! # Responsibilities
//! - Open and validate each uploaded archive
//! - Normalize entry names and trim the per-archive common directory prefix
//! - Write decompressed entries to disk, skipping directories and
//!   blacklisted file types
//!
//! # Design Decisions
//! - Partial-failure semantics: a corrupt archive or failing entry is
//!   recorded and skipped, extraction continues with the rest
//! - Prefix trimming is per archive, never across archives
//! - The caller controls where bytes land (`write_dir`) separately from the
//!   on-disk location recorded in the file set (`final_dir`), which lets a
//!   premium re-upload stage into a sibling directory and swap on success

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use crate::paths;
use crate::site::model::{upsert_file, SiteFile};

/// One failure recorded during extraction.
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("failed to open archive '{path}': {source}")]
    OpenArchive {
        path: PathBuf,
        source: io::Error,
    },

    #[error("invalid zip archive '{path}': {source}")]
    BadArchive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to extract '{name}': {source}")]
    Entry { name: String, source: io::Error },
}

/// Result of expanding a batch of archives. `last_err` carries the most
/// recent failure when extraction was only partially successful.
#[derive(Debug, Default)]
pub struct UnpackOutcome {
    pub files: Vec<SiteFile>,
    pub total_size: u64,
    pub last_err: Option<UnpackError>,
}

/// Expand each archive under `write_dir`, recording every produced file
/// with its post-swap location under `final_dir`. For non-staged
/// extraction the two directories are the same.
pub fn unpack_zip_archives(
    archives: &[PathBuf],
    write_dir: &Path,
    final_dir: &Path,
) -> UnpackOutcome {
    let mut out = UnpackOutcome::default();
    for archive in archives {
        if let Err(err) = unpack_one(archive, write_dir, final_dir, &mut out) {
            tracing::warn!(archive = %archive.display(), error = %err, "Archive skipped");
            out.last_err = Some(err);
        }
    }
    out
}

fn unpack_one(
    archive_path: &Path,
    write_dir: &Path,
    final_dir: &Path,
    out: &mut UnpackOutcome,
) -> Result<(), UnpackError> {
    let file = File::open(archive_path).map_err(|source| UnpackError::OpenArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| UnpackError::BadArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    // First pass: collect normalized entry names so the common directory
    // prefix can be trimmed across the whole archive. A zip whose content
    // lives entirely under one top-level folder is rehosted at the root.
    let mut names: Vec<String> = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|source| UnpackError::BadArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;
        names.push(paths::canonicalize(entry.name()));
    }
    paths::trim_slash_prefixes(&mut names);
    paths::trim_common_dir_prefix(&mut names);

    let mut unpacked = 0usize;
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(e) => e,
            Err(source) => {
                out.last_err = Some(UnpackError::BadArchive {
                    path: archive_path.to_path_buf(),
                    source,
                });
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        if paths::is_blacklisted_ext(entry.name()) {
            tracing::info!(
                entry = %entry.name(),
                archive = %archive_path.display(),
                "Skipping blacklisted file"
            );
            continue;
        }

        let rel = &names[i];
        if rel.is_empty() {
            continue;
        }
        let write_path = write_dir.join(rel);
        let size = entry.size();

        if let Err(source) = write_entry(&mut entry, &write_path) {
            tracing::warn!(
                entry = %rel,
                path = %write_path.display(),
                error = %source,
                "Entry extraction failed"
            );
            out.last_err = Some(UnpackError::Entry {
                name: rel.clone(),
                source,
            });
            continue;
        }
        unpacked += 1;
        upsert_file(
            &mut out.files,
            &mut out.total_size,
            SiteFile {
                path: rel.clone(),
                size,
                disk_path: final_dir.join(rel),
            },
        );
    }
    tracing::info!(
        archive = %archive_path.display(),
        unpacked,
        "Archive unpacked"
    );
    Ok(())
}

fn write_entry(entry: &mut impl io::Read, write_path: &Path) -> io::Result<()> {
    if let Some(parent) = write_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(write_path)?;
    io::copy(entry, &mut out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_test_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zw = ZipWriter::new(file);
        for (name, bytes) in entries {
            zw.start_file(*name, SimpleFileOptions::default()).unwrap();
            zw.write_all(bytes).unwrap();
        }
        zw.finish().unwrap();
    }

    #[test]
    fn test_common_prefix_rehosted_at_root() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("upload.zip");
        write_test_zip(
            &zip_path,
            &[
                ("site/index.html", b"<html>hi</html>"),
                ("site/css/main.css", b"body{}"),
            ],
        );

        let dest = tmp.path().join("abc123");
        let out = unpack_zip_archives(&[zip_path], &dest, &dest);
        assert!(out.last_err.is_none());
        assert_eq!(out.files.len(), 2);

        let mut paths: Vec<&str> = out.files.iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["css/main.css", "index.html"]);
        assert!(dest.join("index.html").exists());
        assert!(dest.join("css/main.css").exists());
        assert_eq!(out.total_size, 15 + 6);
    }

    #[test]
    fn test_blacklisted_entry_never_written() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("upload.zip");
        write_test_zip(
            &zip_path,
            &[("index.html", b"<html>"), ("virus.exe", b"MZ....")],
        );

        let dest = tmp.path().join("abc123");
        let out = unpack_zip_archives(&[zip_path], &dest, &dest);
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].path, "index.html");
        assert!(!dest.join("virus.exe").exists());
    }

    #[test]
    fn test_corrupt_archive_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.zip");
        write_test_zip(&good, &[("a.txt", b"aaa")]);
        let bad = tmp.path().join("bad.zip");
        fs::write(&bad, b"this is not a zip file").unwrap();

        let dest = tmp.path().join("abc123");
        let out = unpack_zip_archives(&[bad, good], &dest, &dest);
        assert!(matches!(out.last_err, Some(UnpackError::BadArchive { .. })));
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].path, "a.txt");
    }

    #[test]
    fn test_staged_extraction_records_final_location() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("upload.zip");
        write_test_zip(&zip_path, &[("index.html", b"<html>")]);

        let live = tmp.path().join("corpsy");
        let staging = tmp.path().join("corpsy-tmp");
        let out = unpack_zip_archives(&[zip_path], &staging, &live);
        assert!(staging.join("index.html").exists());
        assert!(!live.join("index.html").exists());
        assert_eq!(out.files[0].disk_path, live.join("index.html"));
    }
}
