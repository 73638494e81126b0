//! Carga de configuración desde variables de entorno.
//! Convención `CIPIPE_*`; un `.env` en el directorio actual se carga una sola
//! vez antes de leer las variables.

use std::env;
use std::path::PathBuf;

use cipipe_core::constants::{DEFAULT_BRANCH, DEFAULT_INPUT_EXTENSION};
use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_TRACE_FILE: &str = "trace.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directorio escaneado en busca de ficheros de entrada.
    pub input_dir: PathBuf,
    /// Raíz de salida: fichero de traza y carpetas de los steps.
    pub output_dir: PathBuf,
    pub trace_file: String,
    /// Fichero JSON opcional con defaults de parámetros por step.
    pub defaults_file: Option<PathBuf>,
    pub branch: String,
    pub input_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { input_dir: PathBuf::from("."),
               output_dir: PathBuf::from("output"),
               trace_file: DEFAULT_TRACE_FILE.to_string(),
               defaults_file: None,
               branch: DEFAULT_BRANCH.to_string(),
               input_extension: DEFAULT_INPUT_EXTENSION.to_string() }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una función de lookup inyectable.
    pub fn from_lookup<F>(lookup: F) -> Self
        where F: Fn(&str) -> Option<String>
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self { input_dir: non_empty("CIPIPE_INPUT_DIR").map(PathBuf::from).unwrap_or(defaults.input_dir),
               output_dir: non_empty("CIPIPE_OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
               trace_file: non_empty("CIPIPE_TRACE_FILE").unwrap_or(defaults.trace_file),
               defaults_file: non_empty("CIPIPE_DEFAULTS_FILE").map(PathBuf::from),
               branch: non_empty("CIPIPE_BRANCH").unwrap_or(defaults.branch),
               input_extension: non_empty("CIPIPE_INPUT_EXTENSION").unwrap_or(defaults.input_extension) }
    }

    pub fn trace_path(&self) -> PathBuf {
        self.output_dir.join(&self.trace_file)
    }

    /// Comprobaciones previas a abrir un pipeline: la entrada debe ser un
    /// directorio existente y el fichero de traza un nombre simple.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if !self.input_dir.is_dir() {
            return Err(PersistenceError::InvalidConfig(format!("input directory {} does not exist",
                                                               self.input_dir.display())));
        }
        if self.trace_file.contains(['/', '\\']) {
            return Err(PersistenceError::InvalidConfig(format!("trace file name {:?} must not contain path separators",
                                                               self.trace_file)));
        }
        if self.input_extension.trim_start_matches('.').is_empty() {
            return Err(PersistenceError::InvalidConfig("empty input extension".to_string()));
        }
        Ok(())
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
