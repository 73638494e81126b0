//! Tipos de la traza y su forma JSON.
//!
//! Rol en el flujo:
//! - La traza es el único estado durable: rama -> registros de steps en orden.
//! - Cada `StepRecord` se crea una vez y no se modifica nunca.
//! - Los índices de una rama forman una secuencia densa `1..N`; una traza que
//!   rompa esa invariante se rechaza al deserializar.
//!
//! Forma persistida:
//! `{ "<rama>": { "1": { "algorithm": .., "input": [..], "output": [..] } } }`
//!
//! Las claves de cada lista (`input_keys` / `output_keys`) no forman parte
//! del registro JSON; viajan aparte como `KeyLayouts` (ver `layouts.rs`).
use indexmap::IndexMap;
use log::warn;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::layouts::{KeyLayouts, RecordKeys};
use crate::constants::{LEGACY_INPUT_KEY, LEGACY_OUTPUT_KEY};
use crate::errors::CoreEngineError;
use crate::model::{Artifact, ArtifactSet};

/// Registro inmutable de una ejecución de step.
///
/// `input` y `output` se guardan como listas planas; `input_keys` y
/// `output_keys` conservan cuántos artifacts aporta cada clave para poder
/// reconstruir los sets al reanudar. Sólo existen en memoria: el store los
/// persiste fuera del registro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub algorithm: String,
    pub input: Vec<Artifact>,
    pub output: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(skip)]
    pub input_keys: Option<IndexMap<String, usize>>,
    #[serde(skip)]
    pub output_keys: Option<IndexMap<String, usize>>,
}

impl StepRecord {
    /// Registro a partir de sets con clave (forma escrita por el engine).
    pub fn new(algorithm: impl Into<String>, input: &ArtifactSet, output: &ArtifactSet, parameters: Map<String, Value>) -> Self {
        Self { algorithm: algorithm.into(),
               input: input.flatten(),
               output: output.flatten(),
               parameters,
               input_keys: Some(input.layout()),
               output_keys: Some(output.layout()) }
    }

    pub fn input_set(&self) -> Result<ArtifactSet, CoreEngineError> {
        keyed(&self.algorithm, &self.input, self.input_keys.as_ref(), LEGACY_INPUT_KEY)
    }

    pub fn output_set(&self) -> Result<ArtifactSet, CoreEngineError> {
        keyed(&self.algorithm, &self.output, self.output_keys.as_ref(), LEGACY_OUTPUT_KEY)
    }
}

fn keyed(algorithm: &str,
         flat: &[Artifact],
         layout: Option<&IndexMap<String, usize>>,
         legacy_key: &str)
         -> Result<ArtifactSet, CoreEngineError> {
    match layout {
        Some(layout) => ArtifactSet::from_layout(flat, layout).ok_or_else(|| {
                            CoreEngineError::CorruptTrace(format!("step '{algorithm}': key layout does not match its {} artifacts",
                                                                  flat.len()))
                        }),
        None => {
            warn!("step '{algorithm}' has no key layout; replaying its artifacts under '{legacy_key}'");
            Ok(ArtifactSet::new().with(legacy_key, flat.iter().cloned()))
        }
    }
}

/// Registros de una rama, densos y en orden (índice 1-based).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchTrace {
    records: Vec<StepRecord>,
}

impl BranchTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registro en la posición `index` (1-based).
    pub fn get(&self, index: usize) -> Option<&StepRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter()
    }

    /// Añade un registro y devuelve su índice.
    pub fn push(&mut self, record: StepRecord) -> usize {
        self.records.push(record);
        self.records.len()
    }

    /// `true` si `prefix` coincide con los primeros registros de esta rama.
    pub fn starts_with(&self, prefix: &BranchTrace) -> bool {
        self.records.starts_with(&prefix.records)
    }
}

impl FromIterator<StepRecord> for BranchTrace {
    fn from_iter<T: IntoIterator<Item = StepRecord>>(iter: T) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

impl Serialize for BranchTrace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for (i, record) in self.records.iter().enumerate() {
            map.serialize_entry(&(i + 1).to_string(), record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BranchTrace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, StepRecord>::deserialize(deserializer)?;
        let mut indexed = Vec::with_capacity(raw.len());
        for (key, record) in raw {
            let index: usize = key.parse()
                                  .map_err(|_| D::Error::custom(format!("step index {key:?} is not a positive integer")))?;
            indexed.push((index, record));
        }
        indexed.sort_by_key(|(index, _)| *index);
        for (expected, (index, _)) in (1..).zip(indexed.iter()) {
            if *index != expected {
                return Err(D::Error::custom(format!("step indices must be dense from 1, found {index} at position {expected}")));
            }
        }
        Ok(Self { records: indexed.into_iter().map(|(_, r)| r).collect() })
    }
}

/// Documento completo: rama -> `BranchTrace`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceDocument {
    branches: IndexMap<String, BranchTrace>,
}

impl TraceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsea un documento. Un texto vacío (fichero recién creado) equivale a
    /// `{}`.
    pub fn from_json_str(text: &str) -> Result<Self, CoreEngineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| CoreEngineError::CorruptTrace(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreEngineError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreEngineError::Store(e.to_string()))
    }

    /// `true` si no hay ninguna rama.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn branch(&self, name: &str) -> Option<&BranchTrace> {
        self.branches.get(name)
    }

    pub fn branch_len(&self, name: &str) -> usize {
        self.branch(name).map_or(0, BranchTrace::len)
    }

    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &BranchTrace)> {
        self.branches.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Añade un registro al final de la rama (creándola si no existe) y
    /// devuelve su índice.
    pub fn append(&mut self, branch: &str, record: StepRecord) -> usize {
        self.branches.entry(branch.to_string()).or_default().push(record)
    }

    /// Sustituye por completo el contenido de una rama.
    pub fn set_branch(&mut self, branch: &str, trace: BranchTrace) {
        self.branches.insert(branch.to_string(), trace);
    }

    /// Claves de cada registro que las tenga, para persistirlas aparte.
    pub fn key_layouts(&self) -> KeyLayouts {
        let mut layouts = KeyLayouts::default();
        for (branch, trace) in &self.branches {
            for (i, record) in trace.records.iter().enumerate() {
                if let (Some(input), Some(output)) = (&record.input_keys, &record.output_keys) {
                    layouts.insert(branch, i + 1, RecordKeys { input: input.clone(),
                                                              output: output.clone() });
                }
            }
        }
        layouts
    }

    /// Devuelve a cada registro las claves guardadas para su posición. Las
    /// entradas sin registro correspondiente se ignoran.
    pub fn apply_key_layouts(&mut self, layouts: &KeyLayouts) {
        for (branch, trace) in self.branches.iter_mut() {
            for (i, record) in trace.records.iter_mut().enumerate() {
                if let Some(keys) = layouts.get(branch, i + 1) {
                    record.input_keys = Some(keys.input.clone());
                    record.output_keys = Some(keys.output.clone());
                }
            }
        }
    }
}
