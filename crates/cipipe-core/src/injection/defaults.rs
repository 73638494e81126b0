//! Overlay de parámetros por defecto.
//!
//! La fuente de configuración asocia una etiqueta de step con un mapa plano
//! de parámetros. `resolve` parte de ese mapa (vacío si la etiqueta no
//! existe) y aplica encima los overrides explícitos, clave a clave.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::merge::merge_params;
use crate::errors::CoreEngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterDefaults {
    by_label: IndexMap<String, Map<String, Value>>,
}

impl ParameterDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsea `{ "<label>": { "<param>": <valor>, ... }, ... }`. Un texto
    /// vacío equivale a no tener defaults.
    pub fn from_json_str(text: &str) -> Result<Self, CoreEngineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| CoreEngineError::ConfigParse(e.to_string()))
    }

    /// Variante encadenable que fija los defaults de una etiqueta.
    pub fn with(mut self, label: impl Into<String>, params: Map<String, Value>) -> Self {
        self.by_label.insert(label.into(), params);
        self
    }

    pub fn for_label(&self, label: &str) -> Option<&Map<String, Value>> {
        self.by_label.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_label.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// Defaults de `label` con `overrides` aplicados encima.
    pub fn resolve(&self, label: &str, overrides: &Map<String, Value>) -> Map<String, Value> {
        match self.for_label(label) {
            Some(defaults) => merge_params(defaults, overrides),
            None => overrides.clone(),
        }
    }

    /// Superpone `other` (p.ej. fichero de configuración) sobre `self`
    /// (p.ej. defaults incorporados): por etiqueta, las claves de `other`
    /// ganan.
    pub fn merged(mut self, other: &ParameterDefaults) -> Self {
        for (label, params) in &other.by_label {
            let entry = self.by_label.entry(label.clone()).or_default();
            *entry = merge_params(entry, params);
        }
        self
    }
}
