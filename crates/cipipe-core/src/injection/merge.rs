//! Utilidades para fusionar parámetros JSON de forma determinista.
//!
//! Merge "shallow": las claves de `b` reemplazan a las de `a`; los valores
//! anidados no se fusionan, se sustituyen enteros.

use serde_json::{Map, Value};

/// Merge shallow de dos mapas de parámetros: `overrides` gana.
pub fn merge_params(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut out = base.clone();
    for (k, v) in overrides {
        out.insert(k.clone(), v.clone());
    }
    out
}
