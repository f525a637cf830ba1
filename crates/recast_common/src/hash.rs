//! Content fingerprints for change detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};

use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content fingerprint computed using XXH3.
///
/// Two inputs with the same `ContentHash` are assumed to have identical bytes.
/// Fingerprints are what the change classifier compares between runs, and what
/// the state container uses as a payload checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a fingerprint from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a fingerprint by streaming a reader to its end.
    ///
    /// Produces the same value as [`from_bytes`](Self::from_bytes) on the
    /// concatenated bytes.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Xxh3::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.digest128().to_le_bytes()))
    }

    /// Fingerprints a sequence of fields.
    ///
    /// Each field is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
    /// differ.
    pub fn from_fields<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        let mut hasher = Xxh3::new();
        for field in fields {
            let field = field.as_ref();
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        Self(hasher.digest128().to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
