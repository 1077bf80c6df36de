//! Content digests
//!
//! Defines the digest used as the deduplication key for stored assets.

use serde::Deserialize;
use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

/// Hashing algorithm used to address stored content
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, 128-bit
    #[default]
    Md5,
    /// xxHash3, 128-bit
    Xxh3,
    /// BLAKE3, 256-bit
    Blake3,
}

impl DigestAlgorithm {
    /// Digest length in bytes
    pub fn byte_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 | DigestAlgorithm::Xxh3 => 16,
            DigestAlgorithm::Blake3 => 32,
        }
    }

    /// Length of the lowercase hex rendering
    pub fn hex_len(self) -> usize {
        self.byte_len() * 2
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Xxh3 => "xxh3",
            DigestAlgorithm::Blake3 => "blake3",
        };
        f.write_str(name)
    }
}

/// Content digest
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// Compute the digest of data
    pub fn compute(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let bytes = match algorithm {
            DigestAlgorithm::Md5 => md5::compute(data).0.to_vec(),
            // Big-endian so the hex matches the canonical XXH128 rendering
            DigestAlgorithm::Xxh3 => xxh3_128(data).to_be_bytes().to_vec(),
            DigestAlgorithm::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        };
        Self { algorithm, bytes }
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{})", self.algorithm, &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_md5_known_value() {
        let digest = Digest::compute(DigestAlgorithm::Md5, &[0x01, 0x02, 0x03]);
        assert_eq!(digest.to_hex(), "5289df737df57326fcdd22597afb1fac");

        let digest = Digest::compute(DigestAlgorithm::Md5, b"hello world");
        assert_eq!(digest.to_hex(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_deterministic() {
        for algorithm in [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Xxh3,
            DigestAlgorithm::Blake3,
        ] {
            let a = Digest::compute(algorithm, b"avatar bytes");
            let b = Digest::compute(algorithm, b"avatar bytes");
            assert_eq!(a, b);
            assert_eq!(a.to_hex().len(), algorithm.hex_len());
            assert_ne!(a, Digest::compute(algorithm, b"other bytes"));
        }
    }

    #[test]
    fn test_digest_as_set_key() {
        let mut seen = HashSet::new();
        assert!(seen.insert(Digest::compute(DigestAlgorithm::Md5, b"one")));
        assert!(!seen.insert(Digest::compute(DigestAlgorithm::Md5, b"one")));
        assert!(seen.insert(Digest::compute(DigestAlgorithm::Xxh3, b"one")));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_hex_is_lowercase() {
        let hex = Digest::compute(DigestAlgorithm::Blake3, b"case").to_hex();
        assert_eq!(hex, hex.to_lowercase());
    }
}
