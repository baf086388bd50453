//! Content digests used to decide whether a replica file is up to date

use std::fmt;
use std::io::Read;
use std::path::Path;

use color_eyre::eyre::WrapErr as _;
use md5::{Digest as _, Md5};

/// An MD5 content digest (128-bit)
///
/// MD5 is not collision-resistant. Two different files hashing to the same
/// digest would leave a stale replica file in place; for mirroring local trees
/// that risk is accepted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Hash arbitrary bytes
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_digest(&Md5::digest(data))
    }

    /// Hash a file by path, streaming its full contents
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read
    pub fn from_file(path: &Path) -> color_eyre::Result<Self> {
        let mut file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to open {} for hashing", path.display()))?;
        let mut hasher = Md5::new();
        let mut buffer = [0u8; 64 * 1024];

        loop {
            let bytes_read = file
                .read(&mut buffer)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self::from_digest(&hasher.finalize()))
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(digest);
        Self(raw)
    }

    /// Get raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Check whether two files have byte-identical contents by comparing digests.
///
/// Both files are read in full on every call.
///
/// # Errors
/// Returns an error if either file cannot be opened or read
pub fn files_are_equal(a: &Path, b: &Path) -> color_eyre::Result<bool> {
    let hash_a = ContentHash::from_file(a)?;
    let hash_b = ContentHash::from_file(b)?;
    Ok(hash_a == hash_b)
}
