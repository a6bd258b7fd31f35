//! Streamed digests for transfer integrity verification.
//!
//! Digests are computed incrementally over fixed-size chunks, so memory use
//! is independent of file size. Output is always lowercase hexadecimal.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::error::{CourierError, Result};

/// Chunk size for incremental hashing. A performance parameter, not a
/// correctness one: any chunk size produces the same digest.
pub const DIGEST_CHUNK_SIZE: usize = 4096;

/// A digest algorithm selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Parse an algorithm name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::UnsupportedAlgorithm`] for unknown names.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(CourierError::UnsupportedAlgorithm {
                name: name.to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Incremental hasher dispatching on the selected algorithm.
enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Box<Sha512>),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(Md5::new()),
            DigestAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(Box::new(Sha512::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> String {
        match self {
            Self::Md5(h) => const_hex::encode(h.finalize()),
            Self::Sha1(h) => const_hex::encode(h.finalize()),
            Self::Sha256(h) => const_hex::encode(h.finalize()),
            Self::Sha512(h) => const_hex::encode(h.finalize()),
        }
    }
}

/// Compute the digest of a byte stream, reading it to the end in
/// [`DIGEST_CHUNK_SIZE`] chunks.
///
/// # Errors
///
/// Returns an error if reading from the stream fails.
pub async fn compute_digest<R>(mut reader: R, algorithm: DigestAlgorithm) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; DIGEST_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute the digest of a local file.
///
/// # Errors
///
/// Returns [`CourierError::LocalRead`] if the file cannot be opened or read.
pub async fn file_digest(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    let file = File::open(path)
        .await
        .map_err(|e| CourierError::LocalRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    compute_digest(BufReader::new(file), algorithm)
        .await
        .map_err(|e| match e {
            CourierError::Io(io) => CourierError::LocalRead {
                path: path.display().to_string(),
                reason: io.to_string(),
            },
            other => other,
        })
}
