//! Core Pipeline implementation
//!
//! Un `Pipeline` es una caché en memoria más el replay de una rama de la
//! traza. La traza persistida es la fuente de verdad:
//! - al construir, los steps registrados se reconstruyen como
//!   `Step::Recorded` (sus cuerpos no se invocan);
//! - cada step nuevo hace exactamente una lectura y una escritura de la
//!   traza; los steps ya completados no hacen ninguna.
//! - un registro sólo se añade después de que el cuerpo termina bien, así que
//!   un fallo deja la traza en su estado previo.

use std::collections::HashSet;
use std::fs;

use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::constants::{DEFAULT_BRANCH, ENGINE_VERSION};
use crate::engine::PipelineBuilder;
use crate::errors::CoreEngineError;
use crate::hashing::hash_value;
use crate::injection::ParameterDefaults;
use crate::model::{Artifact, ArtifactSet, InputSource};
use crate::naming::step_folder;
use crate::step::{ArtifactResolver, Step, StepContext, StepInfo, StepResult};
use crate::trace::{BranchTrace, TraceDocument, TraceStore};

/// Orquestador de steps sobre una rama de la traza.
#[derive(Debug)]
pub struct Pipeline<S>
    where S: TraceStore
{
    pub(crate) store: S,
    pub(crate) inputs: ArtifactSet,
    pub(crate) branch: String,
    pub(crate) steps: Vec<Step>,
    pub(crate) completed: HashSet<String>,
    pub(crate) defaults: ParameterDefaults,
}

/// Instantánea serializable del estado del pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInfo {
    pub branch: String,
    pub inputs: ArtifactSet,
    pub steps: Vec<StepInfo>,
    pub output: ArtifactSet,
}

impl<S> Pipeline<S>
    where S: TraceStore
{
    /// Construye el pipeline sobre `branch` (por defecto `"branch 1"`).
    ///
    /// Falla con `InvalidInputMismatch` si la traza ya registra una entrada
    /// distinta de la escaneada.
    pub fn new<I>(input: &I, store: S, branch: Option<&str>) -> Result<Self, CoreEngineError>
        where I: InputSource + ?Sized
    {
        Self::builder(store).branch(branch.unwrap_or(DEFAULT_BRANCH)).open(input)
    }

    #[inline]
    pub fn builder(store: S) -> PipelineBuilder<S> {
        PipelineBuilder::new(store)
    }

    pub(crate) fn load(store: S,
                       branch: String,
                       defaults: ParameterDefaults,
                       inputs: ArtifactSet)
                       -> Result<Self, CoreEngineError> {
        validate_branch_name(&branch)?;
        let document = store.read_trace()?;
        ensure_same_input(&document, &inputs)?;
        let steps = match document.branch(&branch) {
            Some(trace) => replay(trace)?,
            None => Vec::new(),
        };
        debug!("pipeline on branch '{}' replayed {} recorded steps", branch, steps.len());
        let completed = steps.iter().map(|s| s.name().to_string()).collect();
        Ok(Self { store,
                  inputs,
                  branch,
                  steps,
                  completed,
                  defaults })
    }

    /// Ejecuta `body` como step `name`, salvo que ya esté completado en esta
    /// instancia (en cuyo caso no hace nada).
    pub fn step<F>(&mut self, name: &str, body: F) -> Result<&mut Self, CoreEngineError>
        where F: FnOnce(&StepContext<'_>) -> StepResult
    {
        self.step_with(name, body, Map::new())
    }

    /// Como `step`, con parámetros explícitos que se aplican encima de los
    /// defaults configurados para `name`.
    pub fn step_with<F>(&mut self, name: &str, body: F, overrides: Map<String, Value>) -> Result<&mut Self, CoreEngineError>
        where F: FnOnce(&StepContext<'_>) -> StepResult
    {
        if self.completed.contains(name) {
            debug!("step '{}' already completed on branch '{}', skipping", name, self.branch);
            return Ok(self);
        }

        let mut document = self.store.read_trace()?;
        let index = document.branch_len(&self.branch) + 1;
        let folder = step_folder(self.store.root_dir(), &self.branch, index, name);
        fs::create_dir_all(&folder).map_err(|e| CoreEngineError::io(&folder, e))?;

        let parameters = self.defaults.resolve(name, &overrides);
        let step = {
            let resolver = ArtifactResolver::new(&self.inputs, &self.steps);
            let ctx = StepContext::new(name, resolver, &parameters, &folder);
            Step::execute(&ctx, body)?
        };

        let appended = document.append(&self.branch, step.to_record());
        self.store.write_trace(&document)?;
        info!("branch '{}' step {} '{}' completed ({} output keys)",
              self.branch,
              appended,
              name,
              step.output().len());

        self.steps.push(step);
        self.completed.insert(name.to_string());
        Ok(self)
    }

    /// Salida del último step, o la entrada si aún no hay steps.
    pub fn output(&self) -> &ArtifactSet {
        self.steps.last().map_or(&self.inputs, Step::output)
    }

    /// Registros persistidos de la rama actual, en orden.
    pub fn trace(&self) -> Result<BranchTrace, CoreEngineError> {
        Ok(self.store.read_trace()?.branch(&self.branch).cloned().unwrap_or_default())
    }

    /// Ramas presentes en la traza persistida.
    pub fn branches(&self) -> Result<Vec<String>, CoreEngineError> {
        Ok(self.store.read_trace()?.branch_names().map(str::to_string).collect())
    }

    /// Fingerprint estable de la traza de la rama actual.
    pub fn fingerprint(&self) -> Result<String, CoreEngineError> {
        let trace = serde_json::to_value(self.trace()?).map_err(|e| CoreEngineError::Store(e.to_string()))?;
        Ok(hash_value(&json!({
            "engine_version": ENGINE_VERSION,
            "branch": self.branch,
            "trace": trace,
        })))
    }

    pub fn info(&self) -> PipelineInfo {
        PipelineInfo { branch: self.branch.clone(),
                       inputs: self.inputs.clone(),
                       steps: self.steps.iter().map(|s| s.info().clone()).collect(),
                       output: self.output().clone() }
    }

    /// Artifacts más recientes bajo `key` según el historial actual.
    pub fn resolve(&self, key: &str) -> Result<&[Artifact], CoreEngineError> {
        ArtifactResolver::new(&self.inputs, &self.steps).resolve(key)
    }

    pub fn inputs(&self) -> &ArtifactSet {
        &self.inputs
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn branch_name(&self) -> &str {
        &self.branch
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }
}

pub(crate) fn validate_branch_name(name: &str) -> Result<(), CoreEngineError> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(CoreEngineError::InvalidBranchName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn replay(trace: &BranchTrace) -> Result<Vec<Step>, CoreEngineError> {
    trace.iter().map(Step::from_record).collect()
}

/// La primera entrada de cada rama es la entrada del pipeline con la que se
/// creó la traza; debe coincidir con la recién escaneada.
fn ensure_same_input(document: &TraceDocument, inputs: &ArtifactSet) -> Result<(), CoreEngineError> {
    let scanned = inputs.flatten();
    for (branch, trace) in document.branches() {
        if let Some(first) = trace.get(1) {
            if first.input != scanned {
                return Err(CoreEngineError::InvalidInputMismatch { branch: branch.to_string(),
                                                                   recorded: first.input.iter().map(ToString::to_string).collect(),
                                                                   scanned: scanned.iter().map(ToString::to_string).collect() });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts;
    use crate::trace::InMemoryTraceStore;
    use std::cell::Cell;

    fn store() -> (tempfile::TempDir, InMemoryTraceStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = InMemoryTraceStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn empty_pipeline_returns_input_as_output() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let pipeline = Pipeline::new(&inputs, store, None).unwrap();
        assert_eq!(pipeline.output(), &inputs);
        assert_eq!(pipeline.branch_name(), DEFAULT_BRANCH);
        assert!(pipeline.trace().unwrap().is_empty());
    }

    #[test]
    fn chained_steps_consume_previous_outputs() {
        let (dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut pipeline = Pipeline::new(&inputs, store.clone(), None).unwrap();

        pipeline.step("PP", |ctx| {
                    let videos = ctx.lookup("videos")?;
                    Ok(ArtifactSet::new().with("videos", videos.iter().map(|v| format!("{v}-PP"))))
                })
                .unwrap()
                .step("BP", |ctx| {
                    let videos = ctx.lookup("videos")?;
                    Ok(ArtifactSet::new().with("videos", videos.iter().map(|v| format!("{v}-BP"))))
                })
                .unwrap();

        assert_eq!(pipeline.output(), &artifacts! { "videos" => ["a.isxd-PP-BP"] });
        assert_eq!(store.writes(), 2);
        assert!(dir.path().join("branch 1 - step 1 - PP").is_dir());
        assert!(dir.path().join("branch 1 - step 2 - BP").is_dir());
    }

    #[test]
    fn completed_step_is_skipped_without_io() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut pipeline = Pipeline::new(&inputs, store.clone(), None).unwrap();
        let calls = Cell::new(0);

        for _ in 0..3 {
            pipeline.step("S1", |_| {
                        calls.set(calls.get() + 1);
                        Ok(artifacts! { "videos" => ["a-S1.isxd"] })
                    })
                    .unwrap();
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(store.writes(), 1);
        let reads_after = store.reads();
        pipeline.step("S1", |_| unreachable!("skipped")).unwrap();
        assert_eq!(store.reads(), reads_after, "skip must not read the trace");
    }

    #[test]
    fn failed_step_persists_nothing_and_can_be_retried() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut pipeline = Pipeline::new(&inputs, store.clone(), None).unwrap();

        let err = pipeline.step("S1", |_| Err("boom".into())).unwrap_err();
        assert!(matches!(err, CoreEngineError::StepFailed { .. }));
        assert_eq!(store.writes(), 0);
        assert!(!pipeline.is_completed("S1"));

        pipeline.step("S1", |_| Ok(artifacts! { "videos" => ["ok.isxd"] })).unwrap();
        assert_eq!(pipeline.trace().unwrap().len(), 1);
    }

    #[test]
    fn unresolved_key_fails_the_step() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut pipeline = Pipeline::new(&inputs, store.clone(), None).unwrap();
        let err = pipeline.step("ED", |ctx| {
                              ctx.lookup("cellsets")?;
                              Ok(ArtifactSet::new())
                          })
                          .unwrap_err();
        assert!(matches!(err, CoreEngineError::UnresolvedKey(ref k) if k == "cellsets"));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn parameters_come_from_defaults_and_overrides() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let defaults = ParameterDefaults::from_json_str(r#"{"ED": {"threshold": 5, "unit": "sd"}}"#).unwrap();
        let mut pipeline = Pipeline::builder(store).defaults(defaults).open(&inputs).unwrap();

        let mut overrides = Map::new();
        overrides.insert("threshold".into(), json!(3));
        pipeline.step_with("ED",
                           |ctx| {
                               assert_eq!(ctx.param_as::<u32>("threshold").unwrap(), Some(3));
                               Ok(ArtifactSet::new())
                           },
                           overrides)
                .unwrap();

        let trace = pipeline.trace().unwrap();
        assert_eq!(Value::Object(trace.get(1).unwrap().parameters.clone()), json!({"threshold": 3, "unit": "sd"}));
    }

    #[test]
    fn rejects_empty_branch_name() {
        let (_dir, store) = store();
        let err = Pipeline::new(&ArtifactSet::new(), store, Some(" ")).unwrap_err();
        assert!(matches!(err, CoreEngineError::InvalidBranchName(_)));
    }

    #[test]
    fn fingerprint_changes_only_when_trace_changes() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut pipeline = Pipeline::new(&inputs, store, None).unwrap();
        let empty = pipeline.fingerprint().unwrap();
        pipeline.step("S1", |_| Ok(artifacts! { "videos" => ["x"] })).unwrap();
        let one = pipeline.fingerprint().unwrap();
        pipeline.step("S1", |_| Ok(artifacts! { "videos" => ["y"] })).unwrap();
        assert_ne!(empty, one);
        assert_eq!(one, pipeline.fingerprint().unwrap());
    }

    #[test]
    fn info_reports_branch_steps_and_output() {
        let (_dir, store) = store();
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut pipeline = Pipeline::new(&inputs, store.clone(), Some("branch 2")).unwrap();
        pipeline.step("PP", |_| Ok(artifacts! { "videos" => ["a-PP.isxd"] })).unwrap();

        let info = pipeline.info();
        assert_eq!(info.branch, "branch 2");
        assert_eq!(info.inputs, inputs);
        assert_eq!(info.steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["PP"]);
        assert_eq!(info.steps[0].input, inputs);
        assert_eq!(info.output, artifacts! { "videos" => ["a-PP.isxd"] });

        let resumed = Pipeline::new(&inputs, store, Some("branch 2")).unwrap();
        assert!(matches!(resumed.steps()[0], Step::Recorded(_)));
        assert_eq!(resumed.info(), info);
        assert_eq!(serde_json::to_value(resumed.info()).unwrap()["branch"], "branch 2");
    }
}
