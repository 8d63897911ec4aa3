mod catalog;
pub mod cleanup;
mod error;
mod extract;
mod fetch;
mod provision;
mod report;

pub use catalog::{ArchiveFormat, Catalog, ModelDescriptor};
pub use cleanup::{CleanupItem, CleanupPlan, CleanupReason};
pub use error::{CatalogError, ProvisionError};
pub use extract::{extract, ExtractOutcome};
pub use fetch::{CancelFlag, FetchOutcome, Fetcher, TransferProgress, CHUNK_SIZE};
pub use provision::{ModelStatus, ProvisionEvent, ProvisionStage, Provisioner};
pub use report::{EntryOutcome, OutcomeReport, ProvisionOutcome};
