//! Content digests of stored objects

use std::io::Read;

use sha2::{Digest, Sha256};

/// Computes a hex digest of a byte stream
pub trait ContentHasher: Send + Sync {
    fn hash(&self, reader: &mut dyn Read) -> std::io::Result<String>;
}

/// Streaming SHA-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, reader: &mut dyn Read) -> std::io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let digest = Sha256Hasher.hash(&mut "abc".as_bytes()).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_stream() {
        let digest = Sha256Hasher.hash(&mut std::io::empty()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
