//! Branch manager: bifurca la traza de un pipeline en un linaje nuevo.
//!
//! La rama nueva recibe una copia por valor de los registros de la rama
//! origen; a partir de ahí ambas evolucionan de forma independiente.
//!
//! Re-bifurcar hacia un nombre que ya tiene registros:
//! - si la rama origen es prefijo de la destino, la destino se reanuda tal
//!   cual (es lo que ocurre al volver a ejecutar un script que bifurca);
//! - si no, falla con `BranchAlreadyDiverged` y no se escribe nada.

use log::{debug, info};

use crate::engine::core::{replay, validate_branch_name};
use crate::engine::Pipeline;
use crate::errors::CoreEngineError;
use crate::trace::TraceStore;

impl<S> Pipeline<S>
    where S: TraceStore + Clone
{
    /// Nuevo pipeline sobre `new_name`, con la misma entrada, el mismo store y
    /// los mismos defaults que `self`.
    pub fn branch(&self, new_name: &str) -> Result<Pipeline<S>, CoreEngineError> {
        validate_branch_name(new_name)?;
        let mut document = self.store.read_trace()?;
        let source = document.branch(&self.branch).cloned().unwrap_or_default();

        let existing = document.branch(new_name).filter(|t| !t.is_empty()).cloned();
        let steps = match existing {
            Some(existing) => {
                if !existing.starts_with(&source) {
                    return Err(CoreEngineError::BranchAlreadyDiverged(new_name.to_string()));
                }
                debug!("branch '{}' already extends '{}', resuming it ({} steps)",
                       new_name,
                       self.branch,
                       existing.len());
                replay(&existing)?
            }
            None => {
                if !source.is_empty() {
                    let copied = source.len();
                    document.set_branch(new_name, source);
                    self.store.write_trace(&document)?;
                    info!("forked branch '{}' into '{}' at step {}", self.branch, new_name, copied);
                }
                self.steps.clone()
            }
        };

        let completed = steps.iter().map(|s| s.name().to_string()).collect();
        Ok(Pipeline { store: self.store.clone(),
                      inputs: self.inputs.clone(),
                      branch: new_name.to_string(),
                      steps,
                      completed,
                      defaults: self.defaults.clone() })
    }
}

#[cfg(test)]
mod tests {
    use crate::artifacts;
    use crate::engine::Pipeline;
    use crate::errors::CoreEngineError;
    use crate::model::ArtifactSet;
    use crate::trace::InMemoryTraceStore;

    fn three_step_main(store: &InMemoryTraceStore) -> Pipeline<InMemoryTraceStore> {
        let inputs = artifacts! { "videos" => ["a.isxd"] };
        let mut main = Pipeline::new(&inputs, store.clone(), Some("main")).unwrap();
        for name in ["S1", "S2", "S3"] {
            main.step(name, |_| Ok(ArtifactSet::new().with("videos", [format!("a-{name}.isxd")])))
                .unwrap();
        }
        main
    }

    #[test]
    fn fork_copies_entries_and_stays_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryTraceStore::new(dir.path());
        let main = three_step_main(&store);

        let mut alt = main.branch("alt").unwrap();
        let doc = store.snapshot();
        assert_eq!(doc.branch("alt"), doc.branch("main"));
        assert_eq!(alt.steps().len(), 3);

        alt.step("S4", |_| Ok(artifacts! { "videos" => ["a-S4.isxd"] })).unwrap();
        let doc = store.snapshot();
        assert_eq!(doc.branch_len("main"), 3);
        assert_eq!(doc.branch_len("alt"), 4);
        assert!(dir.path().join("alt - step 4 - S4").is_dir());
    }

    #[test]
    fn forked_branch_skips_steps_already_in_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryTraceStore::new(dir.path());
        let main = three_step_main(&store);

        let mut alt = main.branch("alt").unwrap();
        alt.step("S2", |_| unreachable!("copied from main")).unwrap();
        assert_eq!(store.snapshot().branch_len("alt"), 3);
    }

    #[test]
    fn fork_of_empty_branch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryTraceStore::new(dir.path());
        let main = Pipeline::new(&artifacts! { "videos" => ["a.isxd"] }, store.clone(), None).unwrap();

        let alt = main.branch("alt").unwrap();
        assert_eq!(store.writes(), 0);
        assert!(alt.steps().is_empty());
        assert!(store.snapshot().branch("alt").is_none());
    }

    #[test]
    fn refork_resumes_a_branch_that_extends_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryTraceStore::new(dir.path());
        let main = three_step_main(&store);
        let mut alt = main.branch("alt").unwrap();
        alt.step("S4", |_| Ok(artifacts! { "videos" => ["a-S4.isxd"] })).unwrap();

        let writes = store.writes();
        let again = main.branch("alt").unwrap();
        assert_eq!(store.writes(), writes);
        assert_eq!(again.steps().len(), 4);
        assert!(again.is_completed("S4"));
    }

    #[test]
    fn refork_onto_diverged_branch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryTraceStore::new(dir.path());
        let mut main = three_step_main(&store);
        let _alt = main.branch("alt").unwrap();
        main.step("S5", |_| Ok(artifacts! { "videos" => ["a-S5.isxd"] })).unwrap();

        let err = main.branch("alt").unwrap_err();
        assert!(matches!(err, CoreEngineError::BranchAlreadyDiverged(ref b) if b == "alt"));
        assert_eq!(store.snapshot().branch_len("alt"), 3);
    }
}
