//! cipipe
//!
//! Fachada del workspace:
//! - `core`: pipeline, traza, resolución por clave y ramas.
//! - `persistence`: traza en fichero JSON, configuración y defaults.
//! - `adapters`: librería de algoritmos y steps de imagen de calcio.
//!
//! Los tipos de uso habitual se re-exportan en la raíz.

pub use cipipe_adapters as adapters;
pub use cipipe_core as core;
pub use cipipe_persistence as persistence;

pub use cipipe_adapters::{builtin_defaults, Algorithm, AlgorithmLibrary, CalciumImagingSteps, RecordingLibrary};
pub use cipipe_core::{artifacts, Artifact, ArtifactSet, CoreEngineError, DirectoryInput, Pipeline, Step, StepContext,
                      StepResult, TraceStore};
pub use cipipe_persistence::{load_defaults, JsonFileTraceStore, PipelineConfig};
