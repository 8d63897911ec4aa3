use std::{
    collections::HashSet,
    fs,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::error::{CatalogError, ProvisionError};

const STAGING_SUFFIX: &str = "part";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    TarGz,
    TarBz2,
}

/// One fetchable model. `extract_dir` is set when `filename` is an archive
/// whose top-level directory is the usable asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub url: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_dir: Option<String>,
    #[serde(default)]
    pub archive_format: ArchiveFormat,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            filename: filename.into(),
            extract_dir: None,
            archive_format: ArchiveFormat::Zip,
        }
    }

    #[must_use]
    pub fn archived(mut self, extract_dir: impl Into<String>, format: ArchiveFormat) -> Self {
        self.extract_dir = Some(extract_dir.into());
        self.archive_format = format;
        self
    }

    #[must_use]
    pub fn is_archive(&self) -> bool {
        self.extract_dir.is_some()
    }

    #[must_use]
    pub fn artifact_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(&self.filename)
    }

    #[must_use]
    pub fn staging_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(format!("{}.{STAGING_SUFFIX}", self.filename))
    }

    #[must_use]
    pub fn extracted_path(&self, models_dir: &Path) -> Option<PathBuf> {
        self.extract_dir.as_ref().map(|dir| models_dir.join(dir))
    }
}

/// Ordered, immutable set of descriptors. Order is preserved for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ModelDescriptor>,
}

impl Catalog {
    pub fn new(entries: Vec<ModelDescriptor>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(CatalogError::Duplicate {
                    id: entry.id.clone(),
                });
            }
            let names = std::iter::once(&entry.filename).chain(entry.extract_dir.as_ref());
            for name in names {
                if !is_plain_component(name) {
                    return Err(CatalogError::InvalidFilename {
                        id: entry.id.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// The speech-recognition models the voice bot ships with.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                ModelDescriptor::new(
                    "vosk_en",
                    "https://alphacephei.com/vosk/models/vosk-model-en-us-0.22.zip",
                    "vosk-model-en-us-0.22.zip",
                )
                .archived("vosk-model-en-us-0.22", ArchiveFormat::Zip),
                ModelDescriptor::new(
                    "vosk_hi",
                    "https://alphacephei.com/vosk/models/vosk-model-hi-0.22.zip",
                    "vosk-model-hi-0.22.zip",
                )
                .archived("vosk-model-hi-0.22", ArchiveFormat::Zip),
                ModelDescriptor::new(
                    "whisper",
                    "https://openaipublic.azureedge.net/main/whisper/models/ed3a0b6b1c0edf879ad9b11b1af5a0e6d1bb5de3bea4046af3849889c54472b/medium.pt",
                    "whisper-medium.pt",
                ),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<ModelDescriptor> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn resolve(&self, id: &str) -> Result<&ModelDescriptor, ProvisionError> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| ProvisionError::UnknownModel { id: id.to_string() })
    }

    #[must_use]
    pub fn all(&self) -> &[ModelDescriptor] {
        &self.entries
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
