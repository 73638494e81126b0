//! Parámetros tipados de cada algoritmo.
//!
//! Los `Default` son los valores incorporados; el catálogo los serializa como
//! defaults de step y cada cuerpo vuelve a leerlos, ya combinados con la
//! configuración y los overrides, desde `StepContext::parameters`.

use cipipe_core::{CoreEngineError, StepContext};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    pub spatial_downsample_factor: u32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self { spatial_downsample_factor: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandpassParams {
    pub low_cutoff: f64,
    pub high_cutoff: f64,
}

impl Default for BandpassParams {
    fn default() -> Self {
        Self { low_cutoff: 0.005,
               high_cutoff: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionCorrectionParams {
    pub max_translation: u32,
    /// Prefijo de la proyección media y del rectángulo de recorte.
    pub series_name: String,
}

impl Default for MotionCorrectionParams {
    fn default() -> Self {
        Self { max_translation: 20,
               series_name: "series".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DffParams {
    pub f0_type: String,
}

impl Default for DffParams {
    fn default() -> Self {
        Self { f0_type: "mean".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaIcaParams {
    pub num_cells: u32,
    pub block_size: u32,
}

impl Default for PcaIcaParams {
    fn default() -> Self {
        Self { num_cells: 180,
               block_size: 1000 }
    }
}

impl PcaIcaParams {
    /// Componentes independientes: 15 % más que células buscadas, en
    /// aritmética entera (redondeo hacia abajo).
    pub fn num_ics(&self) -> u32 {
        u32::try_from(u64::from(self.num_cells) * 115 / 100).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDetectionParams {
    pub threshold: f64,
}

impl Default for EventDetectionParams {
    fn default() -> Self {
        Self { threshold: 5.0 }
    }
}

/// Filtro de aceptación: `<metric> <comparison> <value>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFilter {
    pub metric: String,
    pub comparison: String,
    pub value: f64,
}

impl CellFilter {
    pub fn new(metric: &str, comparison: &str, value: f64) -> Self {
        Self { metric: metric.to_string(),
               comparison: comparison.to_string(),
               value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptRejectParams {
    pub filters: Vec<CellFilter>,
}

impl Default for AcceptRejectParams {
    fn default() -> Self {
        Self { filters: vec![CellFilter::new("SNR", ">", 3.0),
                             CellFilter::new("Event Rate", ">", 0.0),
                             CellFilter::new("# Comps", "=", 1.0)] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongitudinalRegistrationParams {
    /// Sólo registra las células aceptadas de cada cellset.
    pub accepted_cells_only: bool,
}

impl Default for LongitudinalRegistrationParams {
    fn default() -> Self {
        Self { accepted_cells_only: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    /// Origen de los tiempos en los CSV (`start`, `unix`).
    pub time_ref: String,
    pub write_invalid_frames: bool,
    pub sparse_output: bool,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self { time_ref: "start".to_string(),
               write_invalid_frames: true,
               sparse_output: false }
    }
}

/// Lee los parámetros resueltos del step como `P`; las claves ausentes toman
/// el valor de `P::default()`.
pub fn from_context<P>(ctx: &StepContext<'_>) -> Result<P, CoreEngineError>
    where P: DeserializeOwned
{
    serde_json::from_value(Value::Object(ctx.parameters().clone())).map_err(|e| {
                                                                       CoreEngineError::ConfigParse(format!("parameters of step '{}': {e}",
                                                                                                            ctx.step_name()))
                                                                   })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pca_ica_asks_for_fifteen_percent_more_components() {
        assert_eq!(PcaIcaParams::default().num_ics(), 207);
        assert_eq!(PcaIcaParams { num_cells: 20,
                                  block_size: 1 }.num_ics(),
                   23);
    }

    #[test]
    fn missing_keys_take_builtin_values() {
        let p: BandpassParams = serde_json::from_value(json!({"high_cutoff": 0.25})).unwrap();
        assert_eq!(p.low_cutoff, 0.005);
        assert_eq!(p.high_cutoff, 0.25);
    }

    #[test]
    fn export_and_registration_builtins() {
        let export: ExportParams = serde_json::from_value(json!({"sparse_output": true})).unwrap();
        assert_eq!(export.time_ref, "start");
        assert!(export.write_invalid_frames && export.sparse_output);
        assert!(LongitudinalRegistrationParams::default().accepted_cells_only);
    }
}
