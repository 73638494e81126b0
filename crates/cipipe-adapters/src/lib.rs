//! cipipe-adapters: steps de imagen de calcio sobre el core.
//!
//! Este crate provee:
//! - El trait `AlgorithmLibrary`: la interfaz de la librería externa que hace
//!   el cálculo real. Se inyecta explícitamente en cada llamada, no hay
//!   instancia global.
//! - `RecordingLibrary`: implementación que registra las llamadas y crea
//!   ficheros de salida vacíos (ejecución en seco, tests).
//! - El catálogo `Algorithm` con nombres de step y parámetros por defecto.
//! - `CalciumImagingSteps`: métodos encadenables sobre `Pipeline`.
//!
//! Nota: el core sólo ve nombres de ficheros; aquí se decide qué clave
//! (`videos`, `cellsets`, `events`) consume y publica cada algoritmo.

pub mod catalogue;
pub mod error;
pub mod library;
pub mod params;
pub mod recording;
pub mod steps;

pub use catalogue::{builtin_defaults, Algorithm};
pub use error::LibraryError;
pub use library::{AlgorithmLibrary, MotionCorrectionFiles};
pub use recording::{LibraryCall, RecordingLibrary};
pub use steps::CalciumImagingSteps;
