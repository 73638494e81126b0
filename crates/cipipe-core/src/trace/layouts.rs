//! Claves de los registros, persistidas junto a la traza.
//!
//! Forma: `{ "<rama>": { "1": { "input": {"videos": 2}, "output": {..} } } }`.
//! Un índice sin entrada se reproduce con las claves por defecto.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::CoreEngineError;

/// Cantidad de artifacts por clave en la entrada y la salida de un registro.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKeys {
    pub input: IndexMap<String, usize>,
    pub output: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyLayouts {
    branches: IndexMap<String, IndexMap<String, RecordKeys>>,
}

impl KeyLayouts {
    /// Texto vacío equivale a no tener claves; JSON inválido es `CorruptTrace`.
    pub fn from_json_str(text: &str) -> Result<Self, CoreEngineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| CoreEngineError::CorruptTrace(format!("key layouts: {e}")))
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreEngineError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreEngineError::Store(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn get(&self, branch: &str, index: usize) -> Option<&RecordKeys> {
        self.branches.get(branch).and_then(|records| records.get(&index.to_string()))
    }

    pub fn insert(&mut self, branch: &str, index: usize, keys: RecordKeys) {
        self.branches
            .entry(branch.to_string())
            .or_default()
            .insert(index.to_string(), keys);
    }
}
