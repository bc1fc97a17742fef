use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

/// Content digest used both for whole-file tracking hashes and for the
/// fast-path equality check on a [`crate::code::CodeDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        ContentHash(*blake3::hash(bytes).as_bytes())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Reads a file fully and hashes its contents. Used by the dependency
/// tracker and driver to decide whether a watcher event corresponds to a
/// real content change, not just a touch.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(ContentHash::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir();
        let path = dir.join(format!(
            "reload_core_filehash_test_{}_{}",
            name,
            std::process::id()
        ));
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn from_bytes_matches_blake3_hash() {
        let data = b"hello\nworld\n";
        let got = ContentHash::from_bytes(data);
        let expected = blake3::hash(data);
        assert_eq!(got.0, *expected.as_bytes());
    }

    #[test]
    fn hash_file_matches_from_bytes() {
        let data = b"fn fun(a) { a }\n";
        let path = write_temp_file("hash_file", data);
        let got = hash_file(&path).unwrap();
        assert_eq!(got, ContentHash::from_bytes(data));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn different_contents_produce_different_hashes() {
        let a = b"aaa";
        let b = b"aab";
        assert_ne!(ContentHash::from_bytes(a), ContentHash::from_bytes(b));
    }
}
