use crate::models::FileHash;
use anyhow::Result;
use blake3;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Compute Blake3 hash of file contents
pub fn compute_file_hash(file_path: &Path) -> Result<String> {
    let mut file = File::open(file_path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Staleness signal for a file: a content hash when the bytes are readable,
/// otherwise the modification time as a weaker fallback.
pub fn file_hash(path: &Path) -> FileHash {
    match compute_file_hash(path) {
        Ok(hash) => FileHash::Content(hash),
        Err(_) => FileHash::MtimeFallback(mtime_secs(path)),
    }
}

fn mtime_secs(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Get file extension from path (without the dot)
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Absolutize a path without requiring it to exist
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_compute_file_hash() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "test content").unwrap();
        file.flush().unwrap();

        let hash = compute_file_hash(file.path()).unwrap();
        assert!(!hash.is_empty());
        assert_eq!(hash.len(), 64); // Blake3 hex string length
    }

    #[test]
    fn test_compute_file_hash_consistent() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "same content").unwrap();
        file.flush().unwrap();

        let hash1 = compute_file_hash(file.path()).unwrap();
        let hash2 = compute_file_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_compute_file_hash_different_content() {
        let mut file1 = NamedTempFile::new().unwrap();
        write!(file1, "content one").unwrap();
        file1.flush().unwrap();

        let mut file2 = NamedTempFile::new().unwrap();
        write!(file2, "content two").unwrap();
        file2.flush().unwrap();

        let hash1 = compute_file_hash(file1.path()).unwrap();
        let hash2 = compute_file_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_file_hash_prefers_content() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "hash me").unwrap();
        file.flush().unwrap();

        match file_hash(file.path()) {
            FileHash::Content(hex) => assert_eq!(hex.len(), 64),
            FileHash::MtimeFallback(_) => panic!("expected content hash for readable file"),
        }
    }

    #[test]
    fn test_file_hash_falls_back_for_missing_file() {
        let path = Path::new("/nonexistent/docdex/file.txt");
        assert_eq!(file_hash(path), FileHash::MtimeFallback(0));
    }

    #[test]
    fn test_get_extension_with_txt() {
        let path = Path::new("/path/to/file.txt");
        assert_eq!(get_extension(path), Some("txt".to_string()));
    }

    #[test]
    fn test_get_extension_lowercase() {
        let path = Path::new("/path/to/file.TXT");
        assert_eq!(get_extension(path), Some("txt".to_string()));
    }

    #[test]
    fn test_get_extension_no_extension() {
        let path = Path::new("/path/to/file");
        assert_eq!(get_extension(path), None);
    }

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        let path = Path::new("/already/absolute.txt");
        assert_eq!(absolute(path), path);
    }

    #[test]
    fn test_absolute_resolves_relative_paths() {
        let abs = absolute(Path::new("relative.txt"));
        assert!(abs.is_absolute());
        assert!(abs.ends_with("relative.txt"));
    }
}
