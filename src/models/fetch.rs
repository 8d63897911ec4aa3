use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use super::{catalog::ModelDescriptor, error::ProvisionError};

pub const CHUNK_SIZE: usize = 8 * 1024;

/// Shared interrupt switch, polled between download chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    /// `None` when the server declared no size, or a size of zero.
    pub total: Option<u64>,
}

impl TransferProgress {
    #[must_use]
    pub fn fraction(&self) -> Option<f32> {
        let total = self.total.filter(|total| *total > 0)?;
        Some((self.downloaded as f64 / total as f64).clamp(0.0, 1.0) as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The artifact was already on disk; no request was made.
    Skipped(PathBuf),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl FetchOutcome {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Skipped(path) => path,
            FetchOutcome::Downloaded { path, .. } => path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("transfer cancelled")]
struct TransferCancelled;

pub struct Fetcher {
    client: Client,
    cancel: CancelFlag,
}

impl Fetcher {
    pub fn new(cancel: CancelFlag) -> Result<Self> {
        // The blocking client defaults to a 30s total timeout, which large models exceed.
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("create http client")?;
        Ok(Self { client, cancel })
    }

    pub fn fetch(
        &self,
        descriptor: &ModelDescriptor,
        models_dir: &Path,
    ) -> Result<FetchOutcome, ProvisionError> {
        self.fetch_with_progress(descriptor, models_dir, |_| {})
    }

    pub fn fetch_with_progress<F>(
        &self,
        descriptor: &ModelDescriptor,
        models_dir: &Path,
        mut progress: F,
    ) -> Result<FetchOutcome, ProvisionError>
    where
        F: FnMut(TransferProgress),
    {
        let artifact = descriptor.artifact_path(models_dir);
        if artifact.exists() {
            tracing::info!(model = %descriptor.id, path = %artifact.display(), "artifact present, skipping download");
            return Ok(FetchOutcome::Skipped(artifact));
        }

        let staging = descriptor.staging_path(models_dir);
        let result = fs::create_dir_all(models_dir)
            .context("create models directory")
            .and_then(|()| self.download_to_file(&descriptor.url, &staging, &mut progress))
            .and_then(|bytes| {
                fs::rename(&staging, &artifact)
                    .with_context(|| format!("move download into {}", artifact.display()))?;
                Ok(bytes)
            });

        match result {
            Ok(bytes) => {
                tracing::info!(model = %descriptor.id, bytes, "download complete");
                Ok(FetchOutcome::Downloaded {
                    path: artifact,
                    bytes,
                })
            }
            Err(cause) => {
                discard_partial(&staging);
                let id = descriptor.id.clone();
                if cause.downcast_ref::<TransferCancelled>().is_some() {
                    tracing::warn!(model = %id, "download cancelled");
                    Err(ProvisionError::Cancelled { id })
                } else {
                    tracing::warn!(model = %id, "download failed: {cause:#}");
                    Err(ProvisionError::DownloadFailed { id, cause })
                }
            }
        }
    }

    fn download_to_file<F>(&self, uri: &str, path: &Path, progress: &mut F) -> Result<u64>
    where
        F: FnMut(TransferProgress),
    {
        if self.cancel.is_cancelled() {
            return Err(TransferCancelled.into());
        }

        let mut response = self
            .client
            .get(uri)
            .send()
            .with_context(|| format!("request {uri}"))?
            .error_for_status()
            .with_context(|| format!("download {uri}"))?;

        let total = response.content_length().filter(|len| *len > 0);
        tracing::debug!(uri, ?total, "streaming response body");

        let mut file = File::create(path).context("create staging file")?;
        let mut downloaded = 0u64;
        progress(TransferProgress { downloaded, total });
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            if self.cancel.is_cancelled() {
                return Err(TransferCancelled.into());
            }
            let read = response.read(&mut buffer).context("read download chunk")?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .context("write download chunk")?;
            downloaded += read as u64;
            progress(TransferProgress { downloaded, total });
        }
        file.sync_all().context("flush staging file")?;
        Ok(downloaded)
    }
}

fn discard_partial(path: &Path) {
    if path.exists() {
        if let Err(error) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), "failed to remove partial download: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_requires_known_total() {
        let unknown = TransferProgress {
            downloaded: 10,
            total: None,
        };
        assert_eq!(unknown.fraction(), None);

        let half = TransferProgress {
            downloaded: 50,
            total: Some(100),
        };
        assert_eq!(half.fraction(), Some(0.5));

        let over = TransferProgress {
            downloaded: 150,
            total: Some(100),
        };
        assert_eq!(over.fraction(), Some(1.0));
    }

    #[test]
    fn existing_artifact_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        // Unroutable url: any request would fail the test.
        let descriptor = ModelDescriptor::new("m", "http://127.0.0.1:9/m.bin", "m.bin");
        fs::write(dir.path().join("m.bin"), b"cached").unwrap();

        let fetcher = Fetcher::new(CancelFlag::new()).unwrap();
        let outcome = fetcher.fetch(&descriptor, dir.path()).unwrap();
        assert_eq!(outcome, FetchOutcome::Skipped(dir.path().join("m.bin")));
        assert_eq!(fs::read(dir.path().join("m.bin")).unwrap(), b"cached");
    }

    #[test]
    fn connection_error_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ModelDescriptor::new("m", "http://127.0.0.1:9/m.bin", "m.bin");

        let fetcher = Fetcher::new(CancelFlag::new()).unwrap();
        let err = fetcher.fetch(&descriptor, dir.path()).unwrap_err();
        assert!(matches!(err, ProvisionError::DownloadFailed { .. }));
        assert!(!dir.path().join("m.bin").exists());
        assert!(!dir.path().join("m.bin.part").exists());
    }

    #[test]
    fn cancelled_before_request() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = ModelDescriptor::new("m", "http://127.0.0.1:9/m.bin", "m.bin");
        let cancel = CancelFlag::new();
        cancel.cancel();

        let fetcher = Fetcher::new(cancel).unwrap();
        let err = fetcher.fetch(&descriptor, dir.path()).unwrap_err();
        assert!(err.is_cancelled());
        assert!(!dir.path().join("m.bin").exists());
    }
}
