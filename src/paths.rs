//! Path normalization for uploaded file names.
//!
//! # Responsibilities
//! - Canonicalize paths coming from browsers (backslashes, leading slashes)
//! - Reject dangerous file types by extension
//! - Trim the shared directory prefix left behind by folder drag-and-drop
//!
//! # Design Decisions
//! - All functions are pure; no filesystem access
//! - Blacklist is a fixed allow-nothing list, not configurable
//! - Prefix trimming never splits a path component

/// Extensions that are silently skipped during ingest (executables,
/// videos, shared libraries).
const BLACKLISTED_EXTENSIONS: &[&str] = &[
    "exe", "mp4", "avi", "flv", "mpg", "mpeg", "mov", "mkv", "wmv", "dll", "so",
];

/// Lowercased file extension without the dot. `"foo.BaR"` => `"bar"`.
pub fn file_ext(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') && !ext.contains('\\') => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Whether the path names a zip archive, by extension.
pub fn is_zip_path(path: &str) -> bool {
    file_ext(path) == "zip"
}

/// Whether the path's extension is on the upload blacklist.
pub fn is_blacklisted_ext(path: &str) -> bool {
    let ext = file_ext(path);
    BLACKLISTED_EXTENSIONS.iter().any(|s| *s == ext)
}

/// Convert Windows separators to `/` and strip a single leading slash.
pub fn canonicalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Strip every leading slash or backslash from each path.
pub fn trim_slash_prefixes(paths: &mut [String]) {
    for p in paths.iter_mut() {
        let trimmed = p.trim_start_matches(['/', '\\']);
        if trimmed.len() != p.len() {
            *p = trimmed.to_string();
        }
    }
}

/// Remove the longest shared directory prefix from a batch of paths.
///
/// When a user drags a folder `myproj/` into the uploader every path arrives
/// prefixed with `myproj/`; trimming it makes the site root correspond to the
/// folder's contents rather than the folder itself.
///
/// The common prefix is computed per character and then backed off to the
/// preceding `/` so a path component is never split. No-op for fewer than two
/// paths or when there is no shared directory component.
pub fn trim_common_dir_prefix(paths: &mut [String]) {
    if paths.len() < 2 {
        return;
    }
    let first = paths[0].as_bytes();
    let mut idx = 0;
    'outer: while idx < first.len() {
        let c = first[idx];
        for p in paths.iter() {
            let b = p.as_bytes();
            if idx >= b.len() || b[idx] != c {
                break 'outer;
            }
        }
        idx += 1;
    }
    // back off to the last '/' inside the common prefix
    let prefix = &paths[0][..idx];
    let cut = match prefix.rfind('/') {
        Some(pos) => pos + 1,
        None => return,
    };
    for p in paths.iter_mut() {
        *p = p[cut..].to_string();
    }
}

/// Render a byte count as a human-readable string (`"3.52 MB"`).
pub fn humanize_size(n: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    let fs = |n: u64, d: u64, unit: &str| {
        let s = format!("{:.2}", n as f64 / d as f64);
        format!("{} {}", s.trim_end_matches(".00"), unit)
    };

    if n > TB {
        fs(n, TB, "TB")
    } else if n > GB {
        fs(n, GB, "GB")
    } else if n > MB {
        fs(n, MB, "MB")
    } else if n > KB {
        fs(n, KB, "kB")
    } else {
        format!("{} B", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(paths: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = paths.iter().map(|s| s.to_string()).collect();
        trim_common_dir_prefix(&mut v);
        v
    }

    #[test]
    fn test_trim_common_dir_prefix() {
        assert_eq!(
            trimmed(&["foo/abc.txt", "foo/ab.txt"]),
            vec!["abc.txt", "ab.txt"]
        );
        assert_eq!(trimmed(&["abc.txt", "ab.txt"]), vec!["abc.txt", "ab.txt"]);
        assert_eq!(trimmed(&["/abc.txt", "ab.txt"]), vec!["/abc.txt", "ab.txt"]);
        assert_eq!(trimmed(&["/abc.txt", "/ab.txt"]), vec!["abc.txt", "ab.txt"]);
    }

    #[test]
    fn test_trim_common_dir_prefix_single_path_untouched() {
        assert_eq!(trimmed(&["foo/abc.txt"]), vec!["foo/abc.txt"]);
        assert_eq!(trimmed(&[]), Vec::<String>::new());
    }

    #[test]
    fn test_trim_common_dir_prefix_nested() {
        assert_eq!(
            trimmed(&["a/b/c/x.txt", "a/b/d/y.txt"]),
            vec!["c/x.txt", "d/y.txt"]
        );
    }

    #[test]
    fn test_file_ext() {
        assert_eq!(file_ext("foo.BaR"), "bar");
        assert_eq!(file_ext("foo"), "");
        assert_eq!(file_ext("dir.v2/foo"), "");
        assert_eq!(file_ext("a/b/c.ZIP"), "zip");
    }

    #[test]
    fn test_blacklist() {
        assert!(is_blacklisted_ext("setup.exe"));
        assert!(is_blacklisted_ext("movie.MP4"));
        assert!(is_blacklisted_ext("libfoo.so"));
        assert!(!is_blacklisted_ext("index.html"));
        assert!(!is_blacklisted_ext("archive.zip"));
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize(r"foo\bar\x.txt"), "foo/bar/x.txt");
        assert_eq!(canonicalize("/foo/bar"), "foo/bar");
        assert_eq!(canonicalize("foo/bar"), "foo/bar");
        // only a single leading slash is stripped
        assert_eq!(canonicalize("//foo"), "/foo");
    }

    #[test]
    fn test_humanize_size() {
        assert_eq!(humanize_size(512), "512 B");
        assert_eq!(humanize_size(2048), "2 kB");
        assert_eq!(humanize_size(3 * 1024 * 1024 + 550 * 1024), "3.54 MB");
    }
}
