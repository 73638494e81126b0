//! Builder para `Pipeline`.
//!
//! `Pipeline::new` cubre el caso común (store + rama opcional). El builder
//! añade la fuente de defaults de parámetros, que se carga una vez y queda
//! fija para la instancia.
//!
//! ```ignore
//! let mut pipeline = Pipeline::builder(store)
//!     .branch("alt")
//!     .defaults(defaults)
//!     .open(&DirectoryInput::new("videos"))?;
//! ```

use crate::constants::DEFAULT_BRANCH;
use crate::engine::Pipeline;
use crate::errors::CoreEngineError;
use crate::injection::ParameterDefaults;
use crate::model::InputSource;
use crate::trace::TraceStore;

#[derive(Debug)]
pub struct PipelineBuilder<S: TraceStore> {
    store: S,
    branch: String,
    defaults: ParameterDefaults,
}

impl<S: TraceStore> PipelineBuilder<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store,
               branch: DEFAULT_BRANCH.to_string(),
               defaults: ParameterDefaults::default() }
    }

    /// Rama sobre la que se ejecutan y registran los steps.
    #[inline]
    pub fn branch(mut self, name: impl Into<String>) -> Self {
        self.branch = name.into();
        self
    }

    #[inline]
    pub fn defaults(mut self, defaults: ParameterDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Escanea la entrada, carga la traza y reproduce los steps ya
    /// registrados en la rama.
    pub fn open<I>(self, input: &I) -> Result<Pipeline<S>, CoreEngineError>
        where I: InputSource + ?Sized
    {
        let inputs = input.scan()?;
        Pipeline::load(self.store, self.branch, self.defaults, inputs)
    }
}
