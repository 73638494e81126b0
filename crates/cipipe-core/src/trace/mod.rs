//! Traza persistida y trait `TraceStore`.

mod layouts;
mod store;
mod types;

pub use layouts::{KeyLayouts, RecordKeys};
pub use store::{InMemoryTraceStore, TraceStore};
pub use types::{BranchTrace, StepRecord, TraceDocument};
