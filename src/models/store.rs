//! Model artifact persistence

use crate::config::ModelConfig;
use crate::error::StoreError;
use crate::models::artifact::ModelArtifact;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Reads and writes the single serialized artifact at `dir/name`.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    name: String,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            name: name.to_string(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(&config.dir, &config.name)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Load the artifact; a missing file is [`StoreError::NotFound`], unreadable
    /// or schema-inconsistent content is [`StoreError::Corrupt`].
    pub fn load(&self) -> Result<ModelArtifact, StoreError> {
        let path = self.path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(path)),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if !artifact.is_consistent() {
            return Err(StoreError::Corrupt {
                path,
                reason: format!(
                    "feature schema has {} names but fitted components disagree",
                    artifact.feature_count()
                ),
            });
        }

        info!(
            path = %path.display(),
            version = %artifact.version,
            features = artifact.feature_count(),
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Write the artifact to a temporary file next to the target and rename
    /// it into place, so readers see either the old file or the new one.
    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf, StoreError> {
        let path = self.path();
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, artifact).map_err(StoreError::Serialize)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        debug!(tmp = %tmp.path().display(), "Artifact staged");

        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        info!(
            path = %path.display(),
            version = %artifact.version,
            "Model artifact saved"
        );
        Ok(path)
    }
}
