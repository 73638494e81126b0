// Cadena completa de imagen de calcio con la librería de ejecución en seco.
use std::fs;

use cipipe_adapters::{builtin_defaults, Algorithm, CalciumImagingSteps, LibraryError, RecordingLibrary};
use cipipe_core::{artifacts, CoreEngineError, DirectoryInput, InMemoryTraceStore, Pipeline};
use serde_json::{json, Map};

fn recordings(dir: &std::path::Path) -> DirectoryInput {
    let input_dir = dir.join("in");
    fs::create_dir_all(&input_dir).unwrap();
    fs::write(input_dir.join("rec_2.isxd"), b"").unwrap();
    fs::write(input_dir.join("rec_1.isxd"), b"").unwrap();
    DirectoryInput::new(input_dir)
}

fn run_full_chain(pipeline: &mut Pipeline<InMemoryTraceStore>, library: &RecordingLibrary) {
    pipeline.preprocess_videos(library)
            .unwrap()
            .bandpass_filter_videos(library)
            .unwrap()
            .motion_correction_videos(library)
            .unwrap()
            .normalize_dff_videos(library)
            .unwrap()
            .extract_neurons_pca_ica(library)
            .unwrap()
            .detect_events_in_cells(library)
            .unwrap()
            .auto_accept_reject_cells(library)
            .unwrap();
}

#[test]
fn full_chain_names_outputs_per_step_folder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(&out);
    let library = RecordingLibrary::new();
    let mut pipeline = Pipeline::builder(store.clone()).defaults(builtin_defaults()).open(&input).unwrap();

    run_full_chain(&mut pipeline, &library);

    assert_eq!(library.operations(),
               ["preprocess",
                "spatial_filter",
                "project_movie",
                "motion_correct",
                "dff",
                "pca_ica",
                "event_detection",
                "auto_accept_reject"]);

    let pp_dir = out.join("branch 1 - step 1 - Preprocess Videos");
    let videos = pipeline.resolve("videos").unwrap();
    assert_eq!(videos.len(), 2);
    assert!(videos[0].as_str().ends_with("rec_1-PP-BP-MC-DFF.isxd"));
    assert!(pp_dir.join("rec_1-PP.isxd").is_file());

    let events = pipeline.resolve("events").unwrap();
    assert!(events[1].as_str().ends_with("rec_2-PP-BP-MC-DFF-PCA-ICA-ED.isxd"));
    let accepted = pipeline.output().get("cellsets").unwrap();
    assert!(accepted[0].as_str().ends_with("rec_1-PP-BP-MC-DFF-PCA-ICA-AR.isxd"));
    assert!(out.join("branch 1 - step 7 - Auto Accept-Reject Cells").join("rec_1-PP-BP-MC-DFF-PCA-ICA-AR.isxd").is_file());

    let mc = pipeline.steps()[2].output();
    assert!(mc.get("mean_image").unwrap()[0].as_str().ends_with("series-mean_image.isxd"));
    assert_eq!(mc.get("translations").unwrap().len(), 2);

    let trace = pipeline.trace().unwrap();
    assert_eq!(trace.len(), 7);
    assert_eq!(trace.get(6).unwrap().parameters["threshold"], json!(5.0));
    assert_eq!(store.writes(), 7);
}

#[test]
fn resuming_the_chain_calls_the_library_for_new_steps_only() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(&out);

    {
        let library = RecordingLibrary::new();
        let mut first = Pipeline::new(&input, store.clone(), None).unwrap();
        first.preprocess_videos(&library).unwrap().bandpass_filter_videos(&library).unwrap();
    }

    let library = RecordingLibrary::new();
    let mut second = Pipeline::new(&input, store.clone(), None).unwrap();
    run_full_chain(&mut second, &library);

    assert_eq!(library.operations().first(), Some(&"project_movie"));
    assert_eq!(second.trace().unwrap().len(), 7);
    // las claves se conservan al reconstruir desde la traza
    assert!(second.steps()[1].is_recorded());
    assert_eq!(second.steps()[1].output().get("videos").unwrap().len(), 2);
}

#[test]
fn renamed_step_with_overrides_and_branch_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(dir.path().join("out"));
    let library = RecordingLibrary::new();
    let mut main = Pipeline::builder(store).defaults(builtin_defaults()).open(&input).unwrap();
    main.preprocess_videos(&library)
        .unwrap()
        .extract_neurons_pca_ica(&library)
        .unwrap();

    let mut alt = main.branch("few cells").unwrap();
    let mut overrides = Map::new();
    overrides.insert("threshold".to_string(), json!(2));
    alt.algorithm_step_with("Detect Events (low threshold)", Algorithm::EventDetection, &library, overrides)
       .unwrap();
    main.detect_events_in_cells(&library).unwrap();

    let calls = library.calls();
    let thresholds: Vec<_> = calls.iter()
                                  .filter(|c| c.operation == "event_detection")
                                  .map(|c| c.parameters["threshold"].clone())
                                  .collect();
    assert_eq!(thresholds, [json!(2.0), json!(5.0)]);
    assert_eq!(alt.trace().unwrap().len(), 3);
    assert_eq!(main.trace().unwrap().get(3).unwrap().algorithm, "Detect Events in Cells");
}

#[test]
fn library_failure_is_wrapped_and_nothing_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(dir.path().join("out"));
    let library = RecordingLibrary::failing_on("spatial_filter");
    let mut pipeline = Pipeline::new(&input, store.clone(), None).unwrap();

    pipeline.preprocess_videos(&library).unwrap();
    let err = pipeline.bandpass_filter_videos(&library).unwrap_err();
    match err {
        CoreEngineError::StepFailed { step, source } => {
            assert_eq!(step, "Bandpass Filter Videos");
            assert!(source.to_string().contains("simulated failure"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(pipeline.trace().unwrap().len(), 1);
}

#[test]
fn event_detection_without_cellsets_is_unresolved() {
    let dir = tempfile::tempdir().unwrap();
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(dir.path().join("out"));
    let mut pipeline = Pipeline::new(&input, store, None).unwrap();
    let err = pipeline.detect_events_in_cells(&RecordingLibrary::new()).unwrap_err();
    assert!(matches!(err, CoreEngineError::UnresolvedKey(ref k) if k == "cellsets"));
}

#[test]
fn min_image_registration_and_export_extend_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(&out);
    let library = RecordingLibrary::new();
    let mut pipeline = Pipeline::builder(store).defaults(builtin_defaults()).open(&input).unwrap();

    pipeline.preprocess_min_image(&library).unwrap();
    run_full_chain(&mut pipeline, &library);
    pipeline.longitudinal_registration(&library).unwrap().export_results(&library).unwrap();

    let min_images = pipeline.steps()[0].output().get("min_images").unwrap();
    assert!(min_images[0].as_str().ends_with("rec_1-min_image.isxd"));
    assert!(min_images[0].as_path().is_file());
    // la imagen mínima no sustituye a los vídeos
    assert!(pipeline.steps()[1].info().input.get("videos").unwrap()[0].as_str().ends_with("in/rec_1.isxd"));

    let lr = pipeline.steps()[8].output();
    assert!(lr.get("cellsets").unwrap()[1].as_str().ends_with("rec_2-PP-BP-MC-DFF-PCA-ICA-AR-LR.isxd"));
    assert!(lr.get("videos").unwrap()[0].as_str().ends_with("rec_1-PP-BP-MC-DFF-LR.isxd"));
    assert!(lr.get("registration").unwrap()[0].as_str().ends_with("LR.csv"));

    let export_dir = out.join("branch 1 - step 10 - Export Results");
    let exports = pipeline.output().get("exports").unwrap();
    assert_eq!(exports.len(), 4);
    for name in ["DFF-LR.tif", "DFF-PCA-ICA-LR.tif", "DFF-PCA-ICA-LR.csv", "DFF-PCA-ICA-LR-ED.csv"] {
        assert!(export_dir.join(name).is_file(), "{name}");
    }

    let calls = library.calls();
    let ops: Vec<_> = calls.iter().map(|c| c.operation).collect();
    assert_eq!(ops.first(), Some(&"preprocess_min_image"));
    assert_eq!(&ops[ops.len() - 4..],
               ["longitudinal_registration", "export_movie_to_tiff", "export_cell_set", "export_event_set"]);
    let registration = calls.iter().find(|c| c.operation == "longitudinal_registration").unwrap();
    assert_eq!(registration.inputs, [lr_inputs(&pipeline, "cellsets"), lr_inputs(&pipeline, "videos")].concat());
    assert_eq!(registration.parameters["accepted_cells_only"], json!(true));
    let events = calls.iter().find(|c| c.operation == "export_event_set").unwrap();
    assert_eq!(events.parameters, json!({"time_ref": "start", "sparse_output": false}));
    assert_eq!(events.inputs, pipeline.steps()[6].output().get("events").unwrap());
    assert_eq!(pipeline.trace().unwrap().len(), 10);
}

fn lr_inputs(pipeline: &Pipeline<InMemoryTraceStore>, key: &str) -> Vec<cipipe_core::Artifact> {
    pipeline.steps()[8].info().input.get(key).unwrap().to_vec()
}

#[test]
fn accept_reject_fails_when_a_cellset_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let input = recordings(dir.path());
    let store = InMemoryTraceStore::new(dir.path().join("out"));
    let library = RecordingLibrary::new();
    let missing = dir.path().join("gone-PCA-ICA.isxd");
    let mut pipeline = Pipeline::new(&input, store, None).unwrap();
    pipeline.step("Imported Cells", |_| Ok(artifacts! { "cellsets" => [missing.clone()], "events" => ["gone-ED.isxd"] }))
            .unwrap();

    let err = pipeline.auto_accept_reject_cells(&library).unwrap_err();
    match err {
        CoreEngineError::StepFailed { step, source } => {
            assert_eq!(step, "Auto Accept-Reject Cells");
            assert!(matches!(source.downcast_ref::<LibraryError>(), Some(LibraryError::Io { path, .. }) if *path == missing));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(library.operations().is_empty());
    assert_eq!(pipeline.trace().unwrap().len(), 1);
}
