//! Interfaz de la librería externa de procesamiento de imagen.
//!
//! Cada operación recibe los ficheros de entrada y las rutas de salida ya
//! calculadas por el step; la librería sólo escribe en esas rutas.

use cipipe_core::Artifact;

use crate::error::LibraryError;
use crate::params::{AcceptRejectParams, BandpassParams, DffParams, EventDetectionParams, ExportParams,
                    LongitudinalRegistrationParams, MotionCorrectionParams, PcaIcaParams, PreprocessParams};

/// Ficheros auxiliares de la corrección de movimiento.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionCorrectionFiles {
    /// Proyección media usada como imagen de referencia.
    pub reference: Artifact,
    /// Un CSV de traslaciones por vídeo corregido.
    pub translations: Vec<Artifact>,
    pub crop_rect: Artifact,
}

/// Salidas del registro longitudinal.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationFiles {
    pub cellsets: Vec<Artifact>,
    pub movies: Vec<Artifact>,
    /// Tabla de correspondencia de células entre sesiones.
    pub table: Artifact,
}

pub trait AlgorithmLibrary {
    /// Imagen mínima píxel a píxel de cada vídeo.
    fn preprocess_min_image(&self, inputs: &[Artifact], outputs: &[Artifact]) -> Result<(), LibraryError>;

    fn preprocess(&self,
                  inputs: &[Artifact],
                  outputs: &[Artifact],
                  params: &PreprocessParams)
                  -> Result<(), LibraryError>;

    /// Filtro pasa-banda espacial.
    fn spatial_filter(&self,
                      inputs: &[Artifact],
                      outputs: &[Artifact],
                      params: &BandpassParams)
                      -> Result<(), LibraryError>;

    /// Proyección de todos los vídeos en una sola imagen (`stat_type`: mean,
    /// min, max).
    fn project_movie(&self, inputs: &[Artifact], output: &Artifact, stat_type: &str) -> Result<(), LibraryError>;

    fn motion_correct(&self,
                      inputs: &[Artifact],
                      outputs: &[Artifact],
                      params: &MotionCorrectionParams,
                      files: &MotionCorrectionFiles)
                      -> Result<(), LibraryError>;

    fn dff(&self, inputs: &[Artifact], outputs: &[Artifact], params: &DffParams) -> Result<(), LibraryError>;

    /// Extracción de células; produce un cellset por vídeo.
    fn pca_ica(&self, inputs: &[Artifact], outputs: &[Artifact], params: &PcaIcaParams) -> Result<(), LibraryError>;

    fn event_detection(&self,
                       cellsets: &[Artifact],
                       outputs: &[Artifact],
                       params: &EventDetectionParams)
                       -> Result<(), LibraryError>;

    /// Marca células aceptadas / rechazadas dentro de `cellsets`.
    fn auto_accept_reject(&self,
                          cellsets: &[Artifact],
                          events: &[Artifact],
                          params: &AcceptRejectParams)
                          -> Result<(), LibraryError>;

    /// Alinea las células de varias sesiones y reescribe cellsets y vídeos.
    fn longitudinal_registration(&self,
                                 cellsets: &[Artifact],
                                 movies: &[Artifact],
                                 params: &LongitudinalRegistrationParams,
                                 files: &RegistrationFiles)
                                 -> Result<(), LibraryError>;

    fn export_movie_to_tiff(&self, movies: &[Artifact], output: &Artifact, params: &ExportParams) -> Result<(), LibraryError>;

    /// Trazas en CSV e imágenes de las células en TIFF.
    fn export_cell_set(&self,
                       cellsets: &[Artifact],
                       traces_csv: &Artifact,
                       images_tiff: &Artifact,
                       params: &ExportParams)
                       -> Result<(), LibraryError>;

    fn export_event_set(&self, events: &[Artifact], output: &Artifact, params: &ExportParams) -> Result<(), LibraryError>;
}
