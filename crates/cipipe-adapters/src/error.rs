use std::path::PathBuf;

use thiserror::Error;

/// Errores de la librería de algoritmos y del catálogo.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{operation} failed: {reason}")]
    Failed { operation: &'static str, reason: String },
    #[error("{operation}: {inputs} inputs but {outputs} outputs")]
    Arity {
        operation: &'static str,
        inputs: usize,
        outputs: usize,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),
}

impl LibraryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LibraryError::Io { path: path.into(),
                           source }
    }
}
