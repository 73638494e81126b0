//! Librería de ejecución en seco.
//!
//! Registra cada llamada con sus ficheros y parámetros y crea ficheros de
//! salida vacíos, de modo que los steps posteriores encuentran sus entradas
//! en disco. `failing_on` permite simular un fallo de una operación.

use std::cell::RefCell;
use std::fs::{self, File};

use cipipe_core::Artifact;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::LibraryError;
use crate::library::{AlgorithmLibrary, MotionCorrectionFiles, RegistrationFiles};
use crate::params::{AcceptRejectParams, BandpassParams, DffParams, EventDetectionParams, ExportParams,
                    LongitudinalRegistrationParams, MotionCorrectionParams, PcaIcaParams, PreprocessParams};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryCall {
    pub operation: &'static str,
    pub inputs: Vec<Artifact>,
    pub outputs: Vec<Artifact>,
    pub parameters: Value,
}

#[derive(Debug, Default)]
pub struct RecordingLibrary {
    calls: RefCell<Vec<LibraryCall>>,
    fail_on: Option<&'static str>,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variante cuya operación `operation` siempre falla.
    pub fn failing_on(operation: &'static str) -> Self {
        Self { calls: RefCell::default(),
               fail_on: Some(operation) }
    }

    pub fn calls(&self) -> Vec<LibraryCall> {
        self.calls.borrow().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|c| c.operation).collect()
    }

    fn record<P>(&self,
                 operation: &'static str,
                 inputs: &[Artifact],
                 outputs: &[Artifact],
                 params: &P)
                 -> Result<(), LibraryError>
        where P: Serialize
    {
        if self.fail_on == Some(operation) {
            return Err(LibraryError::Failed { operation,
                                              reason: "simulated failure".to_string() });
        }
        for output in outputs {
            if let Some(parent) = output.as_path().parent() {
                fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
            }
            File::create(output.as_path()).map_err(|e| LibraryError::io(output.as_path(), e))?;
        }
        let parameters = serde_json::to_value(params).map_err(|e| LibraryError::Failed { operation,
                                                                                          reason: e.to_string() })?;
        debug!("{} {} -> {} files", operation, inputs.len(), outputs.len());
        self.calls.borrow_mut().push(LibraryCall { operation,
                                                   inputs: inputs.to_vec(),
                                                   outputs: outputs.to_vec(),
                                                   parameters });
        Ok(())
    }
}

fn same_arity(operation: &'static str, inputs: &[Artifact], outputs: &[Artifact]) -> Result<(), LibraryError> {
    if inputs.len() != outputs.len() {
        return Err(LibraryError::Arity { operation,
                                         inputs: inputs.len(),
                                         outputs: outputs.len() });
    }
    Ok(())
}

impl AlgorithmLibrary for RecordingLibrary {
    fn preprocess_min_image(&self, inputs: &[Artifact], outputs: &[Artifact]) -> Result<(), LibraryError> {
        same_arity("preprocess_min_image", inputs, outputs)?;
        self.record("preprocess_min_image", inputs, outputs, &json!({}))
    }

    fn preprocess(&self, inputs: &[Artifact], outputs: &[Artifact], params: &PreprocessParams) -> Result<(), LibraryError> {
        same_arity("preprocess", inputs, outputs)?;
        self.record("preprocess", inputs, outputs, params)
    }

    fn spatial_filter(&self, inputs: &[Artifact], outputs: &[Artifact], params: &BandpassParams) -> Result<(), LibraryError> {
        same_arity("spatial_filter", inputs, outputs)?;
        self.record("spatial_filter", inputs, outputs, params)
    }

    fn project_movie(&self, inputs: &[Artifact], output: &Artifact, stat_type: &str) -> Result<(), LibraryError> {
        self.record("project_movie",
                    inputs,
                    std::slice::from_ref(output),
                    &json!({ "stat_type": stat_type }))
    }

    fn motion_correct(&self,
                      inputs: &[Artifact],
                      outputs: &[Artifact],
                      params: &MotionCorrectionParams,
                      files: &MotionCorrectionFiles)
                      -> Result<(), LibraryError> {
        same_arity("motion_correct", inputs, outputs)?;
        same_arity("motion_correct", outputs, &files.translations)?;
        let mut written = outputs.to_vec();
        written.extend(files.translations.iter().cloned());
        written.push(files.crop_rect.clone());
        self.record("motion_correct",
                    inputs,
                    &written,
                    &json!({
                        "max_translation": params.max_translation,
                        "reference_file_name": files.reference,
                    }))
    }

    fn dff(&self, inputs: &[Artifact], outputs: &[Artifact], params: &DffParams) -> Result<(), LibraryError> {
        same_arity("dff", inputs, outputs)?;
        self.record("dff", inputs, outputs, params)
    }

    fn pca_ica(&self, inputs: &[Artifact], outputs: &[Artifact], params: &PcaIcaParams) -> Result<(), LibraryError> {
        same_arity("pca_ica", inputs, outputs)?;
        self.record("pca_ica",
                    inputs,
                    outputs,
                    &json!({
                        "num_cells": params.num_cells,
                        "num_ics": params.num_ics(),
                        "block_size": params.block_size,
                    }))
    }

    fn event_detection(&self,
                       cellsets: &[Artifact],
                       outputs: &[Artifact],
                       params: &EventDetectionParams)
                       -> Result<(), LibraryError> {
        same_arity("event_detection", cellsets, outputs)?;
        self.record("event_detection", cellsets, outputs, params)
    }

    fn auto_accept_reject(&self,
                          cellsets: &[Artifact],
                          events: &[Artifact],
                          params: &AcceptRejectParams)
                          -> Result<(), LibraryError> {
        same_arity("auto_accept_reject", cellsets, events)?;
        let mut inputs = cellsets.to_vec();
        inputs.extend(events.iter().cloned());
        self.record("auto_accept_reject", &inputs, &[], params)
    }

    fn longitudinal_registration(&self,
                                 cellsets: &[Artifact],
                                 movies: &[Artifact],
                                 params: &LongitudinalRegistrationParams,
                                 files: &RegistrationFiles)
                                 -> Result<(), LibraryError> {
        same_arity("longitudinal_registration", cellsets, &files.cellsets)?;
        same_arity("longitudinal_registration", movies, &files.movies)?;
        let mut inputs = cellsets.to_vec();
        inputs.extend(movies.iter().cloned());
        let mut written = files.cellsets.clone();
        written.extend(files.movies.iter().cloned());
        written.push(files.table.clone());
        self.record("longitudinal_registration", &inputs, &written, params)
    }

    fn export_movie_to_tiff(&self, movies: &[Artifact], output: &Artifact, params: &ExportParams) -> Result<(), LibraryError> {
        self.record("export_movie_to_tiff",
                    movies,
                    std::slice::from_ref(output),
                    &json!({ "write_invalid_frames": params.write_invalid_frames }))
    }

    fn export_cell_set(&self,
                       cellsets: &[Artifact],
                       traces_csv: &Artifact,
                       images_tiff: &Artifact,
                       params: &ExportParams)
                       -> Result<(), LibraryError> {
        self.record("export_cell_set",
                    cellsets,
                    &[traces_csv.clone(), images_tiff.clone()],
                    &json!({ "time_ref": params.time_ref }))
    }

    fn export_event_set(&self, events: &[Artifact], output: &Artifact, params: &ExportParams) -> Result<(), LibraryError> {
        self.record("export_event_set",
                    events,
                    std::slice::from_ref(output),
                    &json!({
                        "time_ref": params.time_ref,
                        "sparse_output": params.sparse_output,
                    }))
    }
}
