use std::path::PathBuf;

use super::{error::ProvisionError, extract::ExtractOutcome, fetch::FetchOutcome};

/// What a successful `provision_one` did on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub id: String,
    /// The usable asset: the extracted directory or the downloaded file.
    pub path: PathBuf,
    /// `None` when the extracted asset was already present and fetching was skipped.
    pub fetch: Option<FetchOutcome>,
    pub extract: Option<ExtractOutcome>,
    pub archive_removed: bool,
}

#[derive(Debug)]
pub struct EntryOutcome {
    pub id: String,
    pub result: Result<ProvisionOutcome, ProvisionError>,
}

impl EntryOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-descriptor results of one run, in catalog order.
#[derive(Debug, Default)]
pub struct OutcomeReport {
    entries: Vec<EntryOutcome>,
    total: usize,
    cancelled: bool,
}

impl OutcomeReport {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            entries: Vec::with_capacity(total),
            total,
            cancelled: false,
        }
    }

    pub fn record(&mut self, id: impl Into<String>, result: Result<ProvisionOutcome, ProvisionError>) {
        if matches!(&result, Err(error) if error.is_cancelled()) {
            self.cancelled = true;
        }
        self.entries.push(EntryOutcome {
            id: id.into(),
            result,
        });
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    #[must_use]
    pub fn entries(&self) -> &[EntryOutcome] {
        &self.entries
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ProvisionError)> {
        self.entries.iter().filter_map(|entry| match &entry.result {
            Err(error) => Some((entry.id.as_str(), error)),
            Ok(_) => None,
        })
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|entry| entry.succeeded()).count()
    }

    /// Number of catalog entries the run was asked to provision, attempted or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.total > 0 && self.succeeded() == self.total
    }
}
