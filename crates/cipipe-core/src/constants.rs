//! Constantes del motor core.
//!
//! Agrupa nombres por defecto y claves de artifacts compartidas entre el
//! engine, los adaptadores y la CLI. `ENGINE_VERSION` participa en el
//! fingerprint de la traza: cambiarlo invalida fingerprints previos aunque la
//! traza no cambie.

/// Versión lógica del motor. Entra en `Pipeline::fingerprint`.
pub const ENGINE_VERSION: &str = "P1.0";

/// Rama usada cuando el caller no especifica ninguna.
pub const DEFAULT_BRANCH: &str = "branch 1";

/// Extensión reconocida al escanear el directorio de entrada.
pub const DEFAULT_INPUT_EXTENSION: &str = "isxd";

/// Clave bajo la que se publican los ficheros escaneados de la entrada.
pub const VIDEOS_KEY: &str = "videos";
pub const CELLSETS_KEY: &str = "cellsets";
pub const EVENTS_KEY: &str = "events";

/// Claves usadas al reconstruir registros que no tienen `KeyLayouts`.
pub const LEGACY_INPUT_KEY: &str = "input";
pub const LEGACY_OUTPUT_KEY: &str = "output";
