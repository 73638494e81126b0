//! Parámetros de steps: defaults de configuración + overrides explícitos.

mod defaults;
mod merge;

pub use defaults::ParameterDefaults;
pub use merge::merge_params;
