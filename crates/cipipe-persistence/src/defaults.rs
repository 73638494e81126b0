//! Lectura del fichero de defaults de parámetros.
//!
//! El fichero es opcional: si no existe se usan defaults vacíos. Un fichero
//! existente pero mal formado es un error fatal para la construcción.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use cipipe_core::ParameterDefaults;
use log::{debug, warn};

use crate::error::PersistenceError;

pub fn load_defaults(path: &Path) -> Result<ParameterDefaults, PersistenceError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("defaults file {} not found, using empty defaults", path.display());
            return Ok(ParameterDefaults::default());
        }
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    let defaults = ParameterDefaults::from_json_str(&text).map_err(|e| PersistenceError::ConfigParse { path: path.to_path_buf(),
                                                                                                         reason: e.to_string() })?;
    debug!("loaded defaults for {} step labels from {}", defaults.labels().count(), path.display());
    Ok(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipipe_core::CoreEngineError;
    use serde_json::json;

    #[test]
    fn missing_file_means_empty_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_defaults(&dir.path().join("defaults.json")).unwrap().is_empty());
    }

    #[test]
    fn reads_label_to_parameter_maps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, r#"{"Detect Events in Cells": {"threshold": 4}}"#).unwrap();

        let defaults = load_defaults(&path).unwrap();
        assert_eq!(defaults.for_label("Detect Events in Cells").unwrap()["threshold"], json!(4));
    }

    #[test]
    fn malformed_file_surfaces_as_config_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, "threshold: 4").unwrap();

        let err = load_defaults(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::ConfigParse { .. }));
        assert!(matches!(CoreEngineError::from(err), CoreEngineError::ConfigParse(_)));
    }
}
