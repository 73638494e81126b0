//! Modelos neutrales (Artifact, ArtifactSet, fuentes de entrada).

pub mod artifact;
pub mod input;

pub use artifact::{Artifact, ArtifactSet};
pub use input::{DirectoryInput, InputSource};
