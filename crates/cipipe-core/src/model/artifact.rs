//! Artifact y ArtifactSet.
//!
//! Un `Artifact` es una referencia opaca (normalmente una ruta de fichero);
//! el motor nunca interpreta su contenido. Un `ArtifactSet` asocia claves
//! simbólicas (`"videos"`, `"cellsets"`, ...) con secuencias ordenadas de
//! artifacts. El orden de cada secuencia es significativo: los steps suelen
//! emparejar 1:1 sus salidas con las secuencias de entrada.
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Referencia a un fichero producido o consumido por un step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Último componente de la ruta, si existe.
    pub fn file_name(&self) -> Option<&str> {
        self.as_path().file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for Artifact {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl From<&str> for Artifact {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Artifact {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Path> for Artifact {
    fn from(value: &Path) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Artifact {
    fn from(value: PathBuf) -> Self {
        Self::from(value.as_path())
    }
}

/// Mapa clave simbólica -> secuencia ordenada de artifacts.
///
/// La igualdad es de mapa (el orden de las claves no cuenta) pero el orden
/// dentro de cada secuencia sí. El orden de inserción de claves se conserva
/// para `flatten` y `layout`, que definen la forma persistida en la traza.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet {
    entries: IndexMap<String, Vec<Artifact>>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variante encadenable de `insert`.
    pub fn with<I, A>(mut self, key: impl Into<String>, artifacts: I) -> Self
        where I: IntoIterator<Item = A>,
              A: Into<Artifact>
    {
        self.insert(key, artifacts.into_iter().map(Into::into).collect());
        self
    }

    /// Inserta (o reemplaza) la secuencia asociada a `key`.
    pub fn insert(&mut self, key: impl Into<String>, artifacts: Vec<Artifact>) -> Option<Vec<Artifact>> {
        self.entries.insert(key.into(), artifacts)
    }

    pub fn get(&self, key: &str) -> Option<&[Artifact]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Artifact])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Número de claves.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatena todas las secuencias en orden de clave.
    pub fn flatten(&self) -> Vec<Artifact> {
        self.entries.values().flatten().cloned().collect()
    }

    /// Aplica `other` encima: cada clave de `other` sustituye a la propia.
    pub fn overlay(&mut self, other: &ArtifactSet) {
        for (key, artifacts) in &other.entries {
            self.entries.insert(key.clone(), artifacts.clone());
        }
    }

    /// Cantidad de artifacts por clave, en orden de inserción.
    pub fn layout(&self) -> IndexMap<String, usize> {
        self.entries.iter().map(|(k, v)| (k.clone(), v.len())).collect()
    }

    /// Reconstruye un set a partir de una lista plana y su `layout`.
    /// Devuelve `None` si las cantidades no cuadran con la lista.
    pub fn from_layout(flat: &[Artifact], layout: &IndexMap<String, usize>) -> Option<Self> {
        let total = layout.values().try_fold(0usize, |acc, n| acc.checked_add(*n))?;
        if total != flat.len() {
            return None;
        }
        let mut rest = flat;
        let mut set = ArtifactSet::new();
        for (key, count) in layout {
            if *count > rest.len() {
                return None;
            }
            let (head, tail) = rest.split_at(*count);
            set.insert(key.clone(), head.to_vec());
            rest = tail;
        }
        Some(set)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<Artifact>)> for ArtifactSet {
    fn from_iter<T: IntoIterator<Item = (K, Vec<Artifact>)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

/// Construye un `ArtifactSet` literal.
///
/// ```
/// let set = cipipe_core::artifacts! { "videos" => ["a.isxd", "b.isxd"] };
/// assert_eq!(set.get("videos").map(|v| v.len()), Some(2));
/// ```
#[macro_export]
macro_rules! artifacts {
    () => { $crate::model::ArtifactSet::new() };
    ($($key:expr => [$($item:expr),* $(,)?]),+ $(,)?) => {
        $crate::model::ArtifactSet::new()
            $(.with($key, {
                let items: ::std::vec::Vec<$crate::model::Artifact> =
                    ::std::vec![$($crate::model::Artifact::from($item)),*];
                items
            }))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_replaces_whole_sequence_per_key() {
        let mut base = artifacts! { "videos" => ["a.isxd", "b.isxd"], "events" => ["e.isxd"] };
        base.overlay(&artifacts! { "videos" => ["a-PP.isxd"] });

        assert_eq!(base.get("videos").unwrap(), &[Artifact::from("a-PP.isxd")]);
        assert_eq!(base.get("events").unwrap(), &[Artifact::from("e.isxd")]);
    }

    #[test]
    fn layout_rebuilds_keyed_set_from_flat_list() {
        let set = artifacts! { "cellsets" => ["c1", "c2"], "events" => [], "videos" => ["v1"] };
        let rebuilt = ArtifactSet::from_layout(&set.flatten(), &set.layout()).expect("layout fits");
        assert_eq!(rebuilt, set);
        assert_eq!(rebuilt.keys().collect::<Vec<_>>(), vec!["cellsets", "events", "videos"]);
    }

    #[test]
    fn layout_with_wrong_counts_is_rejected() {
        let set = artifacts! { "videos" => ["v1", "v2"] };
        let mut layout = set.layout();
        layout.insert("videos".into(), 3);
        assert!(ArtifactSet::from_layout(&set.flatten(), &layout).is_none());
    }

    #[test]
    fn overflowing_layout_counts_are_rejected() {
        let flat = vec![Artifact::from("a.isxd")];
        let layout: IndexMap<String, usize> = [("a".to_string(), usize::MAX), ("b".to_string(), 2)].into_iter().collect();
        assert!(ArtifactSet::from_layout(&flat, &layout).is_none());
    }

    #[test]
    fn serializes_as_plain_json_object() {
        let set = artifacts! { "videos" => ["a.isxd"] };
        assert_eq!(serde_json::to_value(&set).unwrap(), serde_json::json!({"videos": ["a.isxd"]}));
    }
}
