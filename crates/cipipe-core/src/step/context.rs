use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ArtifactResolver;
use crate::errors::{BoxError, CoreEngineError};
use crate::model::{Artifact, ArtifactSet};

/// Resultado de un cuerpo de step: el set producido o el error del
/// colaborador externo.
pub type StepResult = Result<ArtifactSet, BoxError>;

/// Lo que recibe un cuerpo de step: el resolver (`lookup`), los parámetros
/// ya resueltos y la carpeta donde debe escribir sus ficheros nuevos.
///
/// Los cuerpos no deben modificar en sitio los artifacts que leen.
#[derive(Debug)]
pub struct StepContext<'a> {
    step_name: &'a str,
    resolver: ArtifactResolver<'a>,
    parameters: &'a Map<String, Value>,
    output_dir: &'a Path,
}

impl<'a> StepContext<'a> {
    pub fn new(step_name: &'a str,
               resolver: ArtifactResolver<'a>,
               parameters: &'a Map<String, Value>,
               output_dir: &'a Path)
               -> Self {
        Self { step_name,
               resolver,
               parameters,
               output_dir }
    }

    /// Artifacts más recientes publicados bajo `key`.
    pub fn lookup(&self, key: &str) -> Result<&'a [Artifact], CoreEngineError> {
        self.resolver.resolve(key)
    }

    pub fn visible(&self) -> ArtifactSet {
        self.resolver.visible()
    }

    pub fn step_name(&self) -> &'a str {
        self.step_name
    }

    pub fn output_dir(&self) -> &'a Path {
        self.output_dir
    }

    pub fn parameters(&self) -> &'a Map<String, Value> {
        self.parameters
    }

    pub fn param(&self, name: &str) -> Option<&'a Value> {
        self.parameters.get(name)
    }

    /// Parámetro tipado; `Ok(None)` si no está presente.
    pub fn param_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CoreEngineError> {
        self.param(name)
            .map(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                                                      CoreEngineError::ConfigParse(format!("parameter '{name}' of step '{}': {e}",
                                                                                           self.step_name))
                                                  })
            })
            .transpose()
    }
}
