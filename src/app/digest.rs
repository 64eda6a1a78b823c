//! Truncated BLAKE2b-512 content digest
//!
//! Parameter files are fingerprinted by the first 16 bytes of their
//! BLAKE2b-512 hash, written as 32 lowercase hex characters in manifests.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use blake2::{Blake2b512, Digest};

use crate::constants::verify;

/// First 16 bytes of a BLAKE2b-512 hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; verify::DIGEST_LEN]);

impl ContentDigest {
    /// Hash an in-memory buffer
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::truncate(Blake2b512::digest(data).as_slice())
    }

    /// Stream a file through the hasher
    ///
    /// Blocking; callers on the async runtime should run this on the
    /// blocking pool.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(verify::HASH_BUFFER_SIZE, file);
        let mut hasher = Blake2b512::new();
        io::copy(&mut reader, &mut hasher)?;
        Ok(Self::truncate(hasher.finalize().as_slice()))
    }

    fn truncate(full: &[u8]) -> Self {
        let mut bytes = [0u8; verify::DIGEST_LEN];
        bytes.copy_from_slice(&full[..verify::DIGEST_LEN]);
        ContentDigest(bytes)
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compare against a manifest digest string.
    ///
    /// The comparison is on the lowercase hex text, so an uppercase manifest
    /// digest never matches.
    pub fn matches(&self, expected: &str) -> bool {
        self.to_hex() == expected
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
