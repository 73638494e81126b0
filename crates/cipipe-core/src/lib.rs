//! cipipe-core: orquestador de steps reanudable y con ramas.
//!
//! - `model`: artifacts, sets con clave y fuentes de entrada.
//! - `naming`: carpetas de step y rutas de salida deterministas.
//! - `trace`: documento de traza persistido y trait `TraceStore`.
//! - `step`: steps ejecutados / reproducidos y resolución por clave.
//! - `engine`: `Pipeline` y manejo de ramas.
//! - `injection`: defaults de parámetros + overrides.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod hashing;
pub mod injection;
pub mod model;
pub mod naming;
pub mod step;
pub mod trace;

pub use engine::{Pipeline, PipelineBuilder, PipelineInfo};
pub use errors::{BoxError, CoreEngineError};
pub use injection::ParameterDefaults;
pub use model::{Artifact, ArtifactSet, DirectoryInput, InputSource};
pub use step::{ArtifactResolver, Step, StepContext, StepInfo, StepResult};
pub use trace::{BranchTrace, InMemoryTraceStore, KeyLayouts, RecordKeys, StepRecord, TraceDocument, TraceStore};
