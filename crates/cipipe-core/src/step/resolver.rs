//! Resolución de artifacts por clave simbólica.
//!
//! Busca de más reciente a más antiguo: el primer step cuya salida contenga
//! la clave gana (los productores anteriores quedan ocultos, no se mezclan).
//! Si ningún step la produjo se recurre a la entrada del pipeline.
use crate::errors::CoreEngineError;
use crate::model::{Artifact, ArtifactSet};

use super::Step;

#[derive(Debug, Clone, Copy)]
pub struct ArtifactResolver<'a> {
    inputs: &'a ArtifactSet,
    steps: &'a [Step],
}

impl<'a> ArtifactResolver<'a> {
    /// `steps` en orden de ejecución (el más reciente al final).
    pub fn new(inputs: &'a ArtifactSet, steps: &'a [Step]) -> Self {
        Self { inputs, steps }
    }

    pub fn resolve(&self, key: &str) -> Result<&'a [Artifact], CoreEngineError> {
        self.steps
            .iter()
            .rev()
            .find_map(|step| step.output().get(key))
            .or_else(|| self.inputs.get(key))
            .ok_or_else(|| CoreEngineError::UnresolvedKey(key.to_string()))
    }

    /// Nombre del step que aporta `key`; `None` si viene de la entrada o no
    /// existe.
    pub fn producer(&self, key: &str) -> Option<&'a str> {
        self.steps
            .iter()
            .rev()
            .find(|step| step.output().contains_key(key))
            .map(Step::name)
    }

    /// Set completo visible: entrada con cada salida aplicada encima en orden.
    pub fn visible(&self) -> ArtifactSet {
        let mut visible = self.inputs.clone();
        for step in self.steps {
            visible.overlay(step.output());
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts;
    use crate::step::StepInfo;
    use serde_json::Map;

    fn executed(name: &str, output: ArtifactSet) -> Step {
        Step::Executed(StepInfo { name: name.into(),
                                  input: ArtifactSet::new(),
                                  output,
                                  parameters: Map::new() })
    }

    #[test]
    fn newest_producer_shadows_older_ones() {
        let inputs = artifacts! { "videos" => ["raw.isxd"] };
        let steps = vec![executed("A", artifacts! { "videos" => ["a.isxd"] }),
                         executed("B", artifacts! { "videos" => ["b.isxd"] }),
                         executed("C", artifacts! { "cellsets" => ["c.isxd"] })];
        let resolver = ArtifactResolver::new(&inputs, &steps);

        assert_eq!(resolver.resolve("videos").unwrap(), &[Artifact::from("b.isxd")]);
        assert_eq!(resolver.producer("videos"), Some("B"));
        assert_eq!(resolver.resolve("cellsets").unwrap(), &[Artifact::from("c.isxd")]);
    }

    #[test]
    fn falls_back_to_pipeline_input() {
        let inputs = artifacts! { "videos" => ["raw.isxd"] };
        let steps = vec![executed("A", artifacts! { "cellsets" => ["c.isxd"] })];
        let resolver = ArtifactResolver::new(&inputs, &steps);

        assert_eq!(resolver.resolve("videos").unwrap(), &[Artifact::from("raw.isxd")]);
        assert_eq!(resolver.producer("videos"), None);
        assert!(matches!(resolver.resolve("events"), Err(CoreEngineError::UnresolvedKey(ref k)) if k == "events"));
    }

    #[test]
    fn empty_sequence_still_counts_as_produced() {
        let inputs = artifacts! { "videos" => ["raw.isxd"] };
        let steps = vec![executed("A", artifacts! { "videos" => [] })];
        assert!(ArtifactResolver::new(&inputs, &steps).resolve("videos").unwrap().is_empty());
    }

    #[test]
    fn visible_set_overlays_outputs_in_order() {
        let inputs = artifacts! { "videos" => ["raw.isxd"] };
        let steps = vec![executed("A", artifacts! { "videos" => ["a.isxd"], "cellsets" => ["c1"] }),
                         executed("B", artifacts! { "cellsets" => ["c2"] })];
        let visible = ArtifactResolver::new(&inputs, &steps).visible();
        assert_eq!(visible, artifacts! { "videos" => ["a.isxd"], "cellsets" => ["c2"] });
    }
}
