//! Checksum utilities for package and file verification

use crate::error::{HdpError, Result};
use crate::types::ChecksumAlgorithm;
use sha2::{Digest, Sha256, Sha512};
use std::io::Read;
use std::path::Path;

/// Compute the hex digest of an in-memory byte slice
pub fn digest_bytes(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        ChecksumAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
    }
}

/// Compute the hex digest of any readable source, streaming in 8 KiB chunks
pub fn digest_reader<R: Read>(reader: &mut R, algorithm: ChecksumAlgorithm) -> Result<String> {
    match algorithm {
        ChecksumAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            let mut buffer = [0u8; 8192];

            loop {
                let bytes_read = reader.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }

            Ok(hex::encode(hasher.finalize()))
        },
        ChecksumAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            let mut buffer = [0u8; 8192];

            loop {
                let bytes_read = reader.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }

            Ok(hex::encode(hasher.finalize()))
        },
    }
}

/// Compute the digest of a file on disk
pub fn digest_file(path: impl AsRef<Path>, algorithm: ChecksumAlgorithm) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    digest_reader(&mut file, algorithm)
}

/// Verify that a byte slice matches an expected digest
pub fn verify_bytes(data: &[u8], expected: &str, algorithm: ChecksumAlgorithm) -> Result<()> {
    let actual = digest_bytes(data, algorithm);
    if actual == expected {
        Ok(())
    } else {
        Err(HdpError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
