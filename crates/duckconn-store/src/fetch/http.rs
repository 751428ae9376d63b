//! `RemoteFetcher` over HTTP(S) and local files

use super::atomic::atomic_stream;
use crate::errors::{io_error, network_error, storage_access, Result};
use duckconn_core::errors::ConnError;
use duckconn_core::fetch::{Compression, FetchedSource, RemoteFetcher};
use duckconn_core::metrics::elapsed_ms;
use duckconn_core::{log_op_end, log_op_error, log_op_start};
use duckconn_core_types::schema::OP_FETCH;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

/// Downloads sources into a per-fetch directory under `staging_dir`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    staging_dir: PathBuf,
    direct: bool,
}

impl HttpFetcher {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            direct: false,
        }
    }

    /// Ignore proxy settings from the environment
    pub fn direct(mut self) -> Self {
        self.direct = true;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    fn open(&self, url: &Url, timeout: Duration) -> Result<Box<dyn Read>> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| storage_access(Path::new(url.path()), "not a local file path"))?;
                let file = File::open(&path).map_err(|e| io_error("open_source", &path, e))?;
                Ok(Box::new(file))
            }
            "http" | "https" => {
                let mut builder = reqwest::blocking::Client::builder().timeout(timeout);
                if self.direct {
                    builder = builder.no_proxy();
                }
                let client = builder
                    .build()
                    .map_err(|e| network_error(url, e))?;
                let response = client
                    .get(url.as_str())
                    .send()
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| network_error(url, e))?;
                Ok(Box::new(response))
            }
            other => Err(ConnError::Network {
                target: url.to_string(),
                reason: format!("unsupported source scheme '{}'", other),
            }),
        }
    }

    fn stage(&self, url: &Url, timeout: Duration, start: Instant) -> Result<FetchedSource> {
        let dir = self.staging_dir.join(Uuid::now_v7().to_string());
        let mut reader = self.open(url, timeout)?;

        let mut compression = Compression::None;
        let staged = atomic_stream(&dir, reader.as_mut(), |head| {
            compression = Compression::detect(head);
            staged_file_name(url, compression)
        });
        let (path, bytes) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                fs::remove_dir_all(&dir).ok();
                return Err(reclassify_read_failure(url, e));
            }
        };

        tracing::debug!(url = %url, path = %path.display(), "source staged");

        Ok(FetchedSource {
            path,
            bytes,
            compression,
            elapsed_ms: elapsed_ms(start),
        })
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedSource> {
        log_op_start!(OP_FETCH, url = %url);
        let start = Instant::now();
        let result = self.stage(url, timeout, start);
        let ms = elapsed_ms(start);
        match &result {
            Ok(source) => {
                log_op_end!(OP_FETCH, duration_ms = ms, url = %url, bytes = source.bytes);
            }
            Err(e) => {
                log_op_error!(OP_FETCH, e.clone(), duration_ms = ms, url = %url);
            }
        }
        result
    }

    fn discard(&self, path: &Path) {
        fs::remove_file(path).ok();
        if let Some(dir) = path.parent().filter(|d| d.starts_with(&self.staging_dir)) {
            fs::remove_dir(dir).ok();
        }
    }
}

/// A body that dies mid-stream is a network failure, not a disk one.
fn reclassify_read_failure(url: &Url, err: ConnError) -> ConnError {
    match err {
        ConnError::StorageAccess { reason, .. }
            if url.scheme() != "file" && reason.starts_with("write_staging_temp") =>
        {
            ConnError::Network {
                target: url.to_string(),
                reason,
            }
        }
        other => other,
    }
}

/// Last URL segment, made filesystem-safe, with a compression suffix the
/// engine's reader recognizes.
pub fn staged_file_name(url: &Url, compression: Compression) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.rfind(|seg| !seg.is_empty()))
        .unwrap_or_default();

    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let mut name = if cleaned.is_empty() {
        "source".to_string()
    } else {
        cleaned.to_string()
    };

    if let Some(suffix) = compression.suffix() {
        if !name.ends_with(suffix) {
            name.push_str(suffix);
        }
    }
    name
}
