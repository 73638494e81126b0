//! Errores de persistencia.
//! Mapea errores de IO / serde a variantes semánticas y, en el borde del
//! trait `TraceStore`, a `CoreEngineError`.

use std::path::PathBuf;

use cipipe_core::CoreEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trace file {} is not valid JSON: {reason}", path.display())]
    CorruptTrace { path: PathBuf, reason: String },
    #[error("defaults file {} is malformed: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(),
                   source }
    }
}

impl From<PersistenceError> for CoreEngineError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Io { path, source } => CoreEngineError::Io { path, source },
            e @ PersistenceError::CorruptTrace { .. } => CoreEngineError::CorruptTrace(e.to_string()),
            e @ PersistenceError::ConfigParse { .. } => CoreEngineError::ConfigParse(e.to_string()),
            other => CoreEngineError::Store(other.to_string()),
        }
    }
}
