//! Fuentes de la entrada del pipeline.
//!
//! La entrada se obtiene una sola vez, al construir el `Pipeline`, y queda
//! inmutable durante la vida de la instancia.
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::{Artifact, ArtifactSet};
use crate::constants::{DEFAULT_INPUT_EXTENSION, VIDEOS_KEY};
use crate::errors::CoreEngineError;

/// Produce el `ArtifactSet` inicial de un pipeline.
pub trait InputSource {
    fn scan(&self) -> Result<ArtifactSet, CoreEngineError>;
}

/// Un set ya construido actúa como su propia fuente.
impl InputSource for ArtifactSet {
    fn scan(&self) -> Result<ArtifactSet, CoreEngineError> {
        Ok(self.clone())
    }
}

/// Escaneo no recursivo de un directorio: ficheros regulares cuyo nombre
/// termina en `.<extension>`, ordenados por nombre y publicados bajo `videos`.
#[derive(Debug, Clone)]
pub struct DirectoryInput {
    root: PathBuf,
    extension: String,
}

impl DirectoryInput {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(),
               extension: DEFAULT_INPUT_EXTENSION.to_string() }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl InputSource for DirectoryInput {
    fn scan(&self) -> Result<ArtifactSet, CoreEngineError> {
        let suffix = format!(".{}", self.extension);
        let entries = fs::read_dir(&self.root).map_err(|e| CoreEngineError::io(&self.root, e))?;
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreEngineError::io(&self.root, e))?;
            let path = entry.path();
            let matches = path.file_name()
                              .and_then(|n| n.to_str())
                              .is_some_and(|n| n.ends_with(&suffix));
            if matches && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        debug!("scanned {} '{}' inputs under {}", found.len(), suffix, self.root.display());
        Ok(ArtifactSet::new().with(VIDEOS_KEY, found.into_iter().map(Artifact::from)))
    }
}
