//! `TraceStore` sobre un fichero JSON.
//!
//! - `open` crea el directorio y un documento `{}` si el fichero no existe,
//!   así el fichero siempre parsea como un único documento JSON.
//! - Cada escritura va a un fichero temporal del mismo directorio y se
//!   renombra encima del original: un lector nunca ve un documento a medias.
//! - Las claves de cada registro van en `<trace>.keys.json`, que se escribe
//!   antes que la traza. Si falta, los registros se reproducen con las
//!   claves por defecto.
//! - No hay bloqueo entre procesos: un solo escritor por fichero de traza.
//! - Las carpetas de los steps se crean junto al fichero de traza.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cipipe_core::{CoreEngineError, KeyLayouts, TraceDocument, TraceStore};
use log::{debug, error};
use uuid::Uuid;

use crate::error::PersistenceError;

#[derive(Debug, Clone)]
pub struct JsonFileTraceStore {
    path: PathBuf,
    keys_path: PathBuf,
    root: PathBuf,
}

impl JsonFileTraceStore {
    /// Abre (o crea vacío) el fichero de traza en `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&root).map_err(|e| PersistenceError::io(&root, e))?;
        let store = Self { keys_path: keys_path_for(&path),
                           path,
                           root };
        if !store.path.exists() {
            debug!("creating empty trace at {}", store.path.display());
            store.write_document(&TraceDocument::default())?;
        }
        Ok(store)
    }

    /// `<output_dir>/<file_name>`.
    pub fn in_directory(output_dir: impl AsRef<Path>, file_name: &str) -> Result<Self, PersistenceError> {
        Self::open(output_dir.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fichero con las claves de cada registro.
    pub fn keys_path(&self) -> &Path {
        &self.keys_path
    }

    pub fn read_document(&self) -> Result<TraceDocument, PersistenceError> {
        let Some(text) = read_optional(&self.path)? else {
            return Ok(TraceDocument::default());
        };
        let mut document = TraceDocument::from_json_str(&text).map_err(|e| {
                                                                  error!("trace {} does not parse: {e}", self.path.display());
                                                                  PersistenceError::CorruptTrace { path: self.path.clone(),
                                                                                                   reason: e.to_string() }
                                                              })?;
        if let Some(text) = read_optional(&self.keys_path)? {
            let layouts = KeyLayouts::from_json_str(&text).map_err(|e| {
                                                              error!("key layouts {} do not parse: {e}", self.keys_path.display());
                                                              PersistenceError::CorruptTrace { path: self.keys_path.clone(),
                                                                                               reason: e.to_string() }
                                                          })?;
            document.apply_key_layouts(&layouts);
        }
        Ok(document)
    }

    pub fn write_document(&self, document: &TraceDocument) -> Result<(), PersistenceError> {
        let keys = document.key_layouts()
                           .to_json_pretty()
                           .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        let trace = document.to_json_pretty()
                            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        self.replace_file(&self.keys_path, keys)?;
        self.replace_file(&self.path, trace)?;
        debug!("trace written to {}", self.path.display());
        Ok(())
    }

    fn replace_file(&self, target: &Path, mut text: String) -> Result<(), PersistenceError> {
        text.push('\n');
        let tmp = self.root.join(format!(".{}.{}.tmp", file_name_of(target), Uuid::new_v4()));
        fs::write(&tmp, text).map_err(|e| PersistenceError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, target) {
            let _ = fs::remove_file(&tmp);
            return Err(PersistenceError::io(target, e));
        }
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::io(path, e)),
    }
}

/// `trace.json` -> `trace.keys.json`.
fn keys_path_for(path: &Path) -> PathBuf {
    path.with_extension("keys.json")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string())
}

impl TraceStore for JsonFileTraceStore {
    fn read_trace(&self) -> Result<TraceDocument, CoreEngineError> {
        Ok(self.read_document()?)
    }

    fn write_trace(&self, document: &TraceDocument) -> Result<(), CoreEngineError> {
        Ok(self.write_document(document)?)
    }

    fn root_dir(&self) -> &Path {
        &self.root
    }
}
