use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;

use super::{
    catalog::{Catalog, ModelDescriptor},
    error::ProvisionError,
    extract::{extract, ExtractOutcome},
    fetch::{CancelFlag, Fetcher, TransferProgress},
    report::{OutcomeReport, ProvisionOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStage {
    Pending,
    Fetching,
    Extracting,
    Ready,
    Done { success: bool },
}

#[derive(Debug, Clone, Copy)]
pub enum ProvisionEvent<'a> {
    Stage {
        id: &'a str,
        stage: ProvisionStage,
    },
    Transfer {
        id: &'a str,
        progress: TransferProgress,
    },
    /// Emitted once per resolved descriptor, right after `Done`.
    Finished {
        id: &'a str,
        result: &'a Result<ProvisionOutcome, ProvisionError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Installed,
    Downloaded,
    Missing,
}

/// Runs fetch and extract for catalog entries, one at a time, into a single
/// models directory.
pub struct Provisioner {
    catalog: Catalog,
    models_dir: PathBuf,
    fetcher: Fetcher,
    cancel: CancelFlag,
}

impl Provisioner {
    pub fn new(catalog: Catalog, models_dir: impl Into<PathBuf>, cancel: CancelFlag) -> Result<Self> {
        Ok(Self {
            catalog,
            models_dir: models_dir.into(),
            fetcher: Fetcher::new(cancel.clone())?,
            cancel,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn provision_one(&self, id: &str) -> Result<ProvisionOutcome, ProvisionError> {
        self.provision_one_with_progress(id, |_| {})
    }

    pub fn provision_one_with_progress<F>(
        &self,
        id: &str,
        mut progress: F,
    ) -> Result<ProvisionOutcome, ProvisionError>
    where
        F: FnMut(ProvisionEvent<'_>),
    {
        let descriptor = self.catalog.resolve(id)?;
        progress(ProvisionEvent::Stage {
            id,
            stage: ProvisionStage::Pending,
        });
        let result = self.run_descriptor(descriptor, &mut progress);
        progress(ProvisionEvent::Stage {
            id,
            stage: ProvisionStage::Done {
                success: result.is_ok(),
            },
        });
        progress(ProvisionEvent::Finished {
            id,
            result: &result,
        });
        result
    }

    pub fn provision_all(&self) -> OutcomeReport {
        self.provision_all_with_progress(|_| {})
    }

    /// Provisions every entry in catalog order. A failed entry never stops the
    /// run; only cancellation does.
    pub fn provision_all_with_progress<F>(&self, mut progress: F) -> OutcomeReport
    where
        F: FnMut(ProvisionEvent<'_>),
    {
        let mut report = OutcomeReport::new(self.catalog.len());
        for descriptor in self.catalog.all() {
            if self.cancel.is_cancelled() {
                report.mark_cancelled();
                break;
            }
            let result = self.provision_one_with_progress(&descriptor.id, &mut progress);
            if let Err(error) = &result {
                tracing::warn!(model = %descriptor.id, "{error}");
            }
            report.record(descriptor.id.clone(), result);
            if report.cancelled() {
                break;
            }
        }
        tracing::info!(
            succeeded = report.succeeded(),
            total = report.total(),
            "provisioning run finished"
        );
        report
    }

    /// Path-existence view of every catalog entry.
    #[must_use]
    pub fn status(&self) -> Vec<(&ModelDescriptor, ModelStatus)> {
        self.catalog
            .all()
            .iter()
            .map(|descriptor| (descriptor, status_of(descriptor, &self.models_dir)))
            .collect()
    }

    fn run_descriptor<F>(
        &self,
        descriptor: &ModelDescriptor,
        progress: &mut F,
    ) -> Result<ProvisionOutcome, ProvisionError>
    where
        F: FnMut(ProvisionEvent<'_>),
    {
        let id = descriptor.id.as_str();

        // The archive is deleted after extraction, so an extracted asset must
        // short-circuit before the fetcher sees a missing artifact.
        if let Some(target) = descriptor.extracted_path(&self.models_dir) {
            if target.exists() {
                tracing::info!(model = %id, path = %target.display(), "already installed");
                progress(ProvisionEvent::Stage {
                    id,
                    stage: ProvisionStage::Ready,
                });
                let archive_removed = remove_archive(&descriptor.artifact_path(&self.models_dir));
                return Ok(ProvisionOutcome {
                    id: id.to_string(),
                    path: target.clone(),
                    fetch: None,
                    extract: Some(ExtractOutcome::Skipped(target)),
                    archive_removed,
                });
            }
        }

        progress(ProvisionEvent::Stage {
            id,
            stage: ProvisionStage::Fetching,
        });
        let fetched = self
            .fetcher
            .fetch_with_progress(descriptor, &self.models_dir, |transfer| {
                progress(ProvisionEvent::Transfer {
                    id,
                    progress: transfer,
                });
            })?;

        let Some(member_dir) = descriptor.extract_dir.as_deref() else {
            progress(ProvisionEvent::Stage {
                id,
                stage: ProvisionStage::Ready,
            });
            return Ok(ProvisionOutcome {
                id: id.to_string(),
                path: fetched.path().to_path_buf(),
                fetch: Some(fetched),
                extract: None,
                archive_removed: false,
            });
        };

        progress(ProvisionEvent::Stage {
            id,
            stage: ProvisionStage::Extracting,
        });
        let extracted = extract(
            fetched.path(),
            &self.models_dir,
            member_dir,
            descriptor.archive_format,
        )
        .map_err(|cause| ProvisionError::ExtractionFailed {
            id: id.to_string(),
            cause,
        })?;
        let archive_removed = remove_archive(fetched.path());

        progress(ProvisionEvent::Stage {
            id,
            stage: ProvisionStage::Ready,
        });
        Ok(ProvisionOutcome {
            id: id.to_string(),
            path: extracted.path().to_path_buf(),
            fetch: Some(fetched),
            extract: Some(extracted),
            archive_removed,
        })
    }
}

fn remove_archive(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed archive after extraction");
            true
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), "failed to remove archive: {error}");
            false
        }
    }
}

fn status_of(descriptor: &ModelDescriptor, models_dir: &Path) -> ModelStatus {
    let artifact = descriptor.artifact_path(models_dir).exists();
    match descriptor.extracted_path(models_dir) {
        Some(target) if target.exists() => ModelStatus::Installed,
        Some(_) if artifact => ModelStatus::Downloaded,
        None if artifact => ModelStatus::Installed,
        _ => ModelStatus::Missing,
    }
}
