//! Stage outputs persisted under the output directory.
//!
//! Every stage writes one file per keyword (and per source for the
//! per-source stages), so a run can be resumed from any stage.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lncd_core::SourceKind;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    LicenseProfile,
    Coarse(SourceKind),
    Processed(SourceKind),
    Filtered(SourceKind),
    Violations(SourceKind),
    CitedPapers,
    OpenSourceCheck,
    Report,
}

impl ArtifactKind {
    /// File name prefix shared by every keyword.
    #[must_use]
    pub fn prefix(self) -> String {
        match self {
            Self::LicenseProfile => "license_profile".to_string(),
            Self::Coarse(source) => format!("coarse_{source}"),
            Self::Processed(source) => format!("processed_{source}"),
            Self::Filtered(source) => format!("filtered_{source}"),
            Self::Violations(source) => format!("violations_{source}"),
            Self::CitedPapers => "cited_papers".to_string(),
            Self::OpenSourceCheck => "open_source_check".to_string(),
            Self::Report => "report".to_string(),
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::CitedPapers | Self::OpenSourceCheck => "csv",
            _ => "json",
        }
    }

    /// `<prefix>_<keyword>.<ext>`; `keyword` must already be file-name safe.
    #[must_use]
    pub fn file_name(self, keyword: &str) -> String {
        format!("{}_{keyword}.{}", self.prefix(), self.extension())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid artifact pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// A directory of stage artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path(&self, kind: ArtifactKind, keyword: &str) -> PathBuf {
        self.root.join(kind.file_name(keyword))
    }

    #[must_use]
    pub fn exists(&self, kind: ArtifactKind, keyword: &str) -> bool {
        self.path(kind, keyword).is_file()
    }

    fn prepare(&self, kind: ArtifactKind, keyword: &str) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.root).map_err(|source| ArtifactError::Io {
            path: self.root.clone(),
            source,
        })?;
        Ok(self.path(kind, keyword))
    }

    fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
        fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArtifactError::Missing(path.to_path_buf())
            } else {
                ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }

    pub fn save_json<T: Serialize + ?Sized>(
        &self,
        kind: ArtifactKind,
        keyword: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.prepare(kind, keyword)?;
        let json = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Saved {kind} to {}", path.display());
        Ok(path)
    }

    pub fn load_json<T: DeserializeOwned>(
        &self,
        kind: ArtifactKind,
        keyword: &str,
    ) -> Result<T, ArtifactError> {
        Self::load_json_path(&self.path(kind, keyword))
    }

    pub fn load_json_path<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
        let bytes = Self::read(path)?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write `rows` with a header line, even when there are no rows.
    pub fn save_csv<T: Serialize>(
        &self,
        kind: ArtifactKind,
        keyword: &str,
        headers: &[&str],
        rows: &[T],
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.prepare(kind, keyword)?;
        let csv_error = |source| ArtifactError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(csv_error)?;
        writer.write_record(headers).map_err(csv_error)?;
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Saved {} rows of {kind} to {}", rows.len(), path.display());
        Ok(path)
    }

    pub fn load_csv<T: DeserializeOwned>(
        &self,
        kind: ArtifactKind,
        keyword: &str,
    ) -> Result<Vec<T>, ArtifactError> {
        let path = self.path(kind, keyword);
        let bytes = Self::read(&path)?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| ArtifactError::Csv { path, source })
    }

    /// Keywords with an artifact of `kind`, sorted.
    pub fn keywords(&self, kind: ArtifactKind) -> Result<Vec<String>, ArtifactError> {
        let prefix = format!("{}_", kind.prefix());
        let suffix = format!(".{}", kind.extension());
        let pattern = self
            .root
            .join(format!("{prefix}*{suffix}"))
            .to_string_lossy()
            .into_owned();

        let mut keywords: Vec<String> = glob::glob(&pattern)?
            .filter_map(Result::ok)
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let keyword = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
                (!keyword.is_empty()).then(|| keyword.to_string())
            })
            .collect();
        keywords.sort();
        Ok(keywords)
    }
}
