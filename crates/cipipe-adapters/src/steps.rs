//! Steps de imagen de calcio como métodos encadenables de `Pipeline`.
//!
//! Cada método ejecuta un `Algorithm` con su nombre por defecto;
//! `algorithm_step_with` permite otro nombre (p.ej. dos pasadas del mismo
//! algoritmo) y overrides explícitos.
//!
//! Claves: los vídeos viajan en `videos`; PCA-ICA publica `cellsets` y la
//! detección de eventos `events`. El registro longitudinal reescribe
//! `cellsets` y `videos` y añade `registration`; la exportación publica
//! sus ficheros en `exports`.

use std::fs;

use cipipe_core::constants::{CELLSETS_KEY, EVENTS_KEY, VIDEOS_KEY};
use cipipe_core::naming::output_file_paths;
use cipipe_core::{Artifact, ArtifactSet, CoreEngineError, Pipeline, StepContext, StepResult, TraceStore};
use log::debug;
use serde_json::{Map, Value};

use crate::catalogue::Algorithm;
use crate::error::LibraryError;
use crate::library::{AlgorithmLibrary, MotionCorrectionFiles, RegistrationFiles};
use crate::params::{from_context, AcceptRejectParams, BandpassParams, DffParams, EventDetectionParams, ExportParams,
                    LongitudinalRegistrationParams, MotionCorrectionParams, PcaIcaParams, PreprocessParams};

const MOVIE_EXTENSION: &str = "isxd";

pub const MIN_IMAGES_KEY: &str = "min_images";
pub const REGISTRATION_KEY: &str = "registration";
pub const EXPORTS_KEY: &str = "exports";

pub trait CalciumImagingSteps: Sized {
    /// Ejecuta `algorithm` como step `name` con `overrides` sobre sus
    /// defaults.
    fn algorithm_step_with(&mut self,
                           name: &str,
                           algorithm: Algorithm,
                           library: &dyn AlgorithmLibrary,
                           overrides: Map<String, Value>)
                           -> Result<&mut Self, CoreEngineError>;

    fn algorithm_step(&mut self, algorithm: Algorithm, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step_with(algorithm.display_name(), algorithm, library, Map::new())
    }

    fn preprocess_min_image(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::PreprocessMinImage, library)
    }

    fn preprocess_videos(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::Preprocess, library)
    }

    fn bandpass_filter_videos(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::BandpassFilter, library)
    }

    fn motion_correction_videos(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::MotionCorrection, library)
    }

    fn normalize_dff_videos(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::NormalizeDff, library)
    }

    fn extract_neurons_pca_ica(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::PcaIca, library)
    }

    fn detect_events_in_cells(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::EventDetection, library)
    }

    fn auto_accept_reject_cells(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::AutoAcceptReject, library)
    }

    fn longitudinal_registration(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::LongitudinalRegistration, library)
    }

    fn export_results(&mut self, library: &dyn AlgorithmLibrary) -> Result<&mut Self, CoreEngineError> {
        self.algorithm_step(Algorithm::ExportResults, library)
    }
}

impl<S> CalciumImagingSteps for Pipeline<S>
    where S: TraceStore
{
    fn algorithm_step_with(&mut self,
                           name: &str,
                           algorithm: Algorithm,
                           library: &dyn AlgorithmLibrary,
                           overrides: Map<String, Value>)
                           -> Result<&mut Self, CoreEngineError> {
        self.step_with(name, |ctx| run_algorithm(algorithm, ctx, library), overrides)
    }
}

/// Cuerpo de step de `algorithm`: resuelve sus entradas, calcula las rutas
/// de salida en la carpeta del step y delega en la librería.
pub fn run_algorithm(algorithm: Algorithm, ctx: &StepContext<'_>, library: &dyn AlgorithmLibrary) -> StepResult {
    debug!("running {} as step '{}'", algorithm.slug(), ctx.step_name());
    let dir = ctx.output_dir();
    match algorithm {
        Algorithm::PreprocessMinImage => {
            let videos = ctx.lookup(VIDEOS_KEY)?;
            let outputs = output_file_paths(videos, dir, "min_image", MOVIE_EXTENSION);
            library.preprocess_min_image(videos, &outputs)?;
            Ok(ArtifactSet::new().with(MIN_IMAGES_KEY, outputs))
        }
        Algorithm::Preprocess => {
            let params: PreprocessParams = from_context(ctx)?;
            let videos = ctx.lookup(VIDEOS_KEY)?;
            let outputs = output_file_paths(videos, dir, "PP", MOVIE_EXTENSION);
            library.preprocess(videos, &outputs, &params)?;
            Ok(ArtifactSet::new().with(VIDEOS_KEY, outputs))
        }
        Algorithm::BandpassFilter => {
            let params: BandpassParams = from_context(ctx)?;
            let videos = ctx.lookup(VIDEOS_KEY)?;
            let outputs = output_file_paths(videos, dir, "BP", MOVIE_EXTENSION);
            library.spatial_filter(videos, &outputs, &params)?;
            Ok(ArtifactSet::new().with(VIDEOS_KEY, outputs))
        }
        Algorithm::MotionCorrection => {
            let params: MotionCorrectionParams = from_context(ctx)?;
            let videos = ctx.lookup(VIDEOS_KEY)?;
            let reference = Artifact::from(dir.join(format!("{}-mean_image.{MOVIE_EXTENSION}", params.series_name)));
            library.project_movie(videos, &reference, "mean")?;

            let outputs = output_file_paths(videos, dir, "MC", MOVIE_EXTENSION);
            let files = MotionCorrectionFiles { reference: reference.clone(),
                                                translations: output_file_paths(&outputs, dir, "translations", "csv"),
                                                crop_rect: Artifact::from(dir.join(format!("{}-crop_rect.csv",
                                                                                           params.series_name))) };
            library.motion_correct(videos, &outputs, &params, &files)?;
            Ok(ArtifactSet::new().with(VIDEOS_KEY, outputs)
                                 .with("mean_image", [reference])
                                 .with("translations", files.translations))
        }
        Algorithm::NormalizeDff => {
            let params: DffParams = from_context(ctx)?;
            let videos = ctx.lookup(VIDEOS_KEY)?;
            let outputs = output_file_paths(videos, dir, "DFF", MOVIE_EXTENSION);
            library.dff(videos, &outputs, &params)?;
            Ok(ArtifactSet::new().with(VIDEOS_KEY, outputs))
        }
        Algorithm::PcaIca => {
            let params: PcaIcaParams = from_context(ctx)?;
            let videos = ctx.lookup(VIDEOS_KEY)?;
            let outputs = output_file_paths(videos, dir, "PCA-ICA", MOVIE_EXTENSION);
            library.pca_ica(videos, &outputs, &params)?;
            Ok(ArtifactSet::new().with(CELLSETS_KEY, outputs))
        }
        Algorithm::EventDetection => {
            let params: EventDetectionParams = from_context(ctx)?;
            let cellsets = ctx.lookup(CELLSETS_KEY)?;
            let outputs = output_file_paths(cellsets, dir, "ED", MOVIE_EXTENSION);
            library.event_detection(cellsets, &outputs, &params)?;
            Ok(ArtifactSet::new().with(EVENTS_KEY, outputs))
        }
        Algorithm::AutoAcceptReject => {
            let params: AcceptRejectParams = from_context(ctx)?;
            let cellsets = ctx.lookup(CELLSETS_KEY)?;
            let events = ctx.lookup(EVENTS_KEY)?;
            // La librería marca las células dentro del cellset: se trabaja
            // sobre copias para no tocar la salida del step anterior.
            let copies = output_file_paths(cellsets, dir, "AR", MOVIE_EXTENSION);
            for (source, copy) in cellsets.iter().zip(&copies) {
                fs::copy(source.as_path(), copy.as_path()).map_err(|e| LibraryError::io(source.as_path(), e))?;
            }
            library.auto_accept_reject(&copies, events, &params)?;
            Ok(ArtifactSet::new().with(CELLSETS_KEY, copies))
        }
        Algorithm::LongitudinalRegistration => {
            let params: LongitudinalRegistrationParams = from_context(ctx)?;
            let cellsets = ctx.lookup(CELLSETS_KEY)?;
            let movies = ctx.lookup(VIDEOS_KEY)?;
            let files = RegistrationFiles { cellsets: output_file_paths(cellsets, dir, "LR", MOVIE_EXTENSION),
                                            movies: output_file_paths(movies, dir, "LR", MOVIE_EXTENSION),
                                            table: Artifact::from(dir.join("LR.csv")) };
            library.longitudinal_registration(cellsets, movies, &params, &files)?;
            Ok(ArtifactSet::new().with(CELLSETS_KEY, files.cellsets)
                                 .with(VIDEOS_KEY, files.movies)
                                 .with(REGISTRATION_KEY, [files.table]))
        }
        Algorithm::ExportResults => {
            let params: ExportParams = from_context(ctx)?;
            let movies = ctx.lookup(VIDEOS_KEY)?;
            let cellsets = ctx.lookup(CELLSETS_KEY)?;
            let events = ctx.lookup(EVENTS_KEY)?;
            let movie_tiff = Artifact::from(dir.join("DFF-LR.tif"));
            let images_tiff = Artifact::from(dir.join("DFF-PCA-ICA-LR.tif"));
            let traces_csv = Artifact::from(dir.join("DFF-PCA-ICA-LR.csv"));
            let events_csv = Artifact::from(dir.join("DFF-PCA-ICA-LR-ED.csv"));
            library.export_movie_to_tiff(movies, &movie_tiff, &params)?;
            library.export_cell_set(cellsets, &traces_csv, &images_tiff, &params)?;
            library.export_event_set(events, &events_csv, &params)?;
            Ok(ArtifactSet::new().with(EXPORTS_KEY, [movie_tiff, images_tiff, traces_csv, events_csv]))
        }
    }
}
