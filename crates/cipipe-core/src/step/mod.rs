//! Steps: unidad ejecutada (o reproducida desde la traza).
//!
//! Un step se modela como unión etiquetada:
//! - `Step::Executed`: el cuerpo se invocó en esta instancia.
//! - `Step::Recorded`: se reconstruyó desde un `StepRecord` persistido; su
//!   cuerpo no se vuelve a ejecutar y input/output se toman tal cual.

mod context;
mod resolver;

pub use context::{StepContext, StepResult};
pub use resolver::ArtifactResolver;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::CoreEngineError;
use crate::model::ArtifactSet;
use crate::trace::StepRecord;

/// Datos observables de un step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    pub name: String,
    pub input: ArtifactSet,
    pub output: ArtifactSet,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Recorded(StepInfo),
    Executed(StepInfo),
}

impl Step {
    /// Ejecuta `body` con el contexto dado. El input capturado es el set
    /// completo visible para el resolver en este momento.
    pub fn execute<F>(ctx: &StepContext<'_>, body: F) -> Result<Step, CoreEngineError>
        where F: FnOnce(&StepContext<'_>) -> StepResult
    {
        let input = ctx.visible();
        let output = body(ctx).map_err(|e| CoreEngineError::from_step_body(ctx.step_name(), e))?;
        Ok(Step::Executed(StepInfo { name: ctx.step_name().to_string(),
                                     input,
                                     output,
                                     parameters: ctx.parameters().clone() }))
    }

    /// Replay: reconstruye el step sin invocar ninguna función.
    pub fn from_record(record: &StepRecord) -> Result<Step, CoreEngineError> {
        Ok(Step::Recorded(StepInfo { name: record.algorithm.clone(),
                                     input: record.input_set()?,
                                     output: record.output_set()?,
                                     parameters: record.parameters.clone() }))
    }

    pub fn info(&self) -> &StepInfo {
        match self {
            Step::Recorded(info) | Step::Executed(info) => info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn input(&self) -> &ArtifactSet {
        &self.info().input
    }

    pub fn output(&self) -> &ArtifactSet {
        &self.info().output
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, Step::Recorded(_))
    }

    pub fn to_record(&self) -> StepRecord {
        let info = self.info();
        StepRecord::new(info.name.clone(), &info.input, &info.output, info.parameters.clone())
    }
}
