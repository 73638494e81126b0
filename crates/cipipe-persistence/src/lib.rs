//! cipipe-persistence
//!
//! Persistencia durable de la traza y configuración del pipeline.
//!
//! Módulos:
//! - `file_store`: `TraceStore` sobre un fichero JSON (escritura atómica).
//! - `defaults`: carga del fichero de defaults de parámetros.
//! - `config`: configuración desde variables de entorno / `.env`.
//! - `error`: errores de persistencia y su conversión a `CoreEngineError`.

pub mod config;
pub mod defaults;
pub mod error;
pub mod file_store;

pub use config::{init_dotenv, PipelineConfig};
pub use defaults::load_defaults;
pub use error::PersistenceError;
pub use file_store::JsonFileTraceStore;
