//! Errores del núcleo del orquestador.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error opaco devuelto por los cuerpos de step (colaborador externo).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum CoreEngineError {
    /// La entrada escaneada no coincide con la registrada en la traza.
    #[error("pipeline input differs from the input recorded in branch '{branch}' of the trace")]
    InvalidInputMismatch {
        branch: String,
        recorded: Vec<String>,
        scanned: Vec<String>,
    },
    #[error("corrupt trace: {0}")]
    CorruptTrace(String),
    #[error("no step output nor pipeline input provides key '{0}'")]
    UnresolvedKey(String),
    #[error("malformed parameter defaults: {0}")]
    ConfigParse(String),
    #[error("branch '{0}' already holds entries that diverge from its source")]
    BranchAlreadyDiverged(String),
    #[error("invalid branch name {0:?}")]
    InvalidBranchName(String),
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trace store: {0}")]
    Store(String),
    /// Fallo del cuerpo del step; el error original queda como `source`.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: BoxError,
    },
}

impl CoreEngineError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(),
                   source }
    }

    /// Convierte el error de un cuerpo de step. Los errores del propio core
    /// (p.ej. `UnresolvedKey` propagado con `?` desde `lookup`) se devuelven
    /// tal cual; el resto se envuelve en `StepFailed`.
    pub(crate) fn from_step_body(step: &str, error: BoxError) -> Self {
        match error.downcast::<CoreEngineError>() {
            Ok(core) => *core,
            Err(source) => Self::StepFailed { step: step.to_string(),
                                              source },
        }
    }
}
