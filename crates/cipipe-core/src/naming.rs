//! Nombres deterministas de carpetas y ficheros de salida.
//!
//! La carpeta de un step depende sólo de la rama, de la posición del step en
//! la traza persistida de esa rama y de su nombre. Dos procesos que reanudan
//! la misma traza calculan la misma carpeta sin coordinarse, y dos ramas
//! nunca colisionan porque el nombre de la rama forma parte de la carpeta.
use std::path::{Path, PathBuf};

use crate::model::Artifact;

/// `"<branch> - step <index> - <step name>"`, con `index` 1-based.
pub fn step_folder_name(branch: &str, index: usize, step_name: &str) -> String {
    format!("{branch} - step {index} - {step_name}")
}

/// Carpeta del step bajo la raíz de salida del pipeline.
pub fn step_folder(root: &Path, branch: &str, index: usize, step_name: &str) -> PathBuf {
    root.join(step_folder_name(branch, index, step_name))
}

/// Ruta de salida derivada de un input: `<dir>/<stem>-<suffix>.<ext>`.
///
/// El stem descarta todas las extensiones (`a.b.isxd` -> `a`). Con sufijo
/// vacío el resultado es `<dir>/<stem>.<ext>`.
pub fn output_file_path(input: &Artifact, output_dir: &Path, suffix: &str, extension: &str) -> Artifact {
    let stem = bare_stem(input);
    let extension = extension.trim_start_matches('.');
    let file_name = if suffix.is_empty() {
        format!("{stem}.{extension}")
    } else {
        format!("{stem}-{suffix}.{extension}")
    };
    Artifact::from(output_dir.join(file_name))
}

/// `output_file_path` aplicado a cada input, conservando el orden.
pub fn output_file_paths(inputs: &[Artifact], output_dir: &Path, suffix: &str, extension: &str) -> Vec<Artifact> {
    inputs.iter()
          .map(|input| output_file_path(input, output_dir, suffix, extension))
          .collect()
}

fn bare_stem(input: &Artifact) -> &str {
    let name = input.file_name().unwrap_or(input.as_str());
    match name.find('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
