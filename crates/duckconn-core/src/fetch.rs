//! Remote source fetching seam

use crate::errors::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Compression detected from a payload's leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0x1f, 0x8b]) {
            Compression::Gzip
        } else if bytes.starts_with(b"BZh") {
            Compression::Bzip2
        } else if bytes.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Compression::Xz
        } else if bytes.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    /// Suffix the engine's auto-detection relies on
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some(".gz"),
            Compression::Bzip2 => Some(".bz2"),
            Compression::Xz => Some(".xz"),
            Compression::Zstd => Some(".zst"),
        }
    }
}

/// A remote source staged on local disk
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSource {
    pub path: PathBuf,
    pub bytes: u64,
    pub compression: Compression,
    pub elapsed_ms: f64,
}

/// Fetch attempts and the pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff before attempt `attempt` (1-based; the first attempt never waits)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff * attempt.saturating_sub(1)
    }
}

/// Downloads a source to local disk
pub trait RemoteFetcher: Send + Sync {
    /// Stage `url` locally, failing with `Network` if it cannot be read within `timeout`.
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedSource>;

    /// Remove a staged file once it has been materialized.
    fn discard(&self, path: &Path) {
        std::fs::remove_file(path).ok();
    }
}
