//! Engine: `Pipeline`, su builder y el manejo de ramas.

pub mod branch;
pub mod builder;
pub mod core;

pub use builder::PipelineBuilder;
pub use core::{Pipeline, PipelineInfo};
