//! Catálogo de algoritmos: nombre de step por defecto, identificador corto
//! (CLI) y parámetros incorporados.

use std::fmt;
use std::str::FromStr;

use cipipe_core::ParameterDefaults;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LibraryError;
use crate::params::{AcceptRejectParams, BandpassParams, DffParams, EventDetectionParams, ExportParams,
                    LongitudinalRegistrationParams, MotionCorrectionParams, PcaIcaParams, PreprocessParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    PreprocessMinImage,
    Preprocess,
    BandpassFilter,
    MotionCorrection,
    NormalizeDff,
    PcaIca,
    EventDetection,
    AutoAcceptReject,
    LongitudinalRegistration,
    ExportResults,
}

impl Algorithm {
    /// En el orden habitual de una cadena completa.
    pub const ALL: [Algorithm; 10] = [Algorithm::PreprocessMinImage,
                                      Algorithm::Preprocess,
                                      Algorithm::BandpassFilter,
                                      Algorithm::MotionCorrection,
                                      Algorithm::NormalizeDff,
                                      Algorithm::PcaIca,
                                      Algorithm::EventDetection,
                                      Algorithm::AutoAcceptReject,
                                      Algorithm::LongitudinalRegistration,
                                      Algorithm::ExportResults];

    /// Nombre de step por defecto. Es también la etiqueta de sus defaults y
    /// forma parte del nombre de carpeta, así que no lleva separadores de
    /// ruta.
    pub fn display_name(self) -> &'static str {
        match self {
            Algorithm::PreprocessMinImage => "Preprocess Min Image",
            Algorithm::Preprocess => "Preprocess Videos",
            Algorithm::BandpassFilter => "Bandpass Filter Videos",
            Algorithm::MotionCorrection => "Motion Correction Videos",
            Algorithm::NormalizeDff => "Normalize dFF Videos",
            Algorithm::PcaIca => "Extract Neurons PCA-ICA",
            Algorithm::EventDetection => "Detect Events in Cells",
            Algorithm::AutoAcceptReject => "Auto Accept-Reject Cells",
            Algorithm::LongitudinalRegistration => "Longitudinal Registration",
            Algorithm::ExportResults => "Export Results",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Algorithm::PreprocessMinImage => "min-image",
            Algorithm::Preprocess => "preprocess",
            Algorithm::BandpassFilter => "bandpass",
            Algorithm::MotionCorrection => "motion-correction",
            Algorithm::NormalizeDff => "dff",
            Algorithm::PcaIca => "pca-ica",
            Algorithm::EventDetection => "event-detection",
            Algorithm::AutoAcceptReject => "accept-reject",
            Algorithm::LongitudinalRegistration => "longitudinal-registration",
            Algorithm::ExportResults => "export",
        }
    }

    pub fn default_parameters(self) -> Map<String, Value> {
        match self {
            Algorithm::PreprocessMinImage => Map::new(),
            Algorithm::Preprocess => to_map(&PreprocessParams::default()),
            Algorithm::BandpassFilter => to_map(&BandpassParams::default()),
            Algorithm::MotionCorrection => to_map(&MotionCorrectionParams::default()),
            Algorithm::NormalizeDff => to_map(&DffParams::default()),
            Algorithm::PcaIca => to_map(&PcaIcaParams::default()),
            Algorithm::EventDetection => to_map(&EventDetectionParams::default()),
            Algorithm::AutoAcceptReject => to_map(&AcceptRejectParams::default()),
            Algorithm::LongitudinalRegistration => to_map(&LongitudinalRegistrationParams::default()),
            Algorithm::ExportResults => to_map(&ExportParams::default()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Acepta el identificador corto o el nombre de step.
impl FromStr for Algorithm {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Algorithm::ALL.into_iter()
                      .find(|a| a.slug().eq_ignore_ascii_case(wanted) || a.display_name() == wanted)
                      .ok_or_else(|| LibraryError::UnknownAlgorithm(wanted.to_string()))
    }
}

// Los structs de parámetros siempre serializan como objeto.
fn to_map<P: Serialize>(params: &P) -> Map<String, Value> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Defaults incorporados de todo el catálogo, por nombre de step. La fuente
/// de configuración se superpone con `ParameterDefaults::merged`.
pub fn builtin_defaults() -> ParameterDefaults {
    Algorithm::ALL.into_iter()
                  .fold(ParameterDefaults::new(), |acc, a| acc.with(a.display_name(), a.default_parameters()))
}
