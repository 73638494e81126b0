use std::path::PathBuf;
use std::process;

use cipipe_adapters::{builtin_defaults, Algorithm, CalciumImagingSteps, LibraryError, RecordingLibrary};
use cipipe_core::{CoreEngineError, DirectoryInput, Pipeline, TraceStore};
use cipipe_persistence::{init_dotenv, load_defaults, JsonFileTraceStore, PersistenceError, PipelineConfig};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Uso:
  cipipe run [--input DIR] [--output DIR] [--branch NAME] [--fork NAME] [--defaults FILE] [--steps a,b,..]
  cipipe trace [--output DIR] [--branch NAME]
  cipipe branches [--output DIR]

Los valores por defecto salen de CIPIPE_* (entorno o .env). `run` usa la
librería de ejecución en seco: registra cada algoritmo y crea ficheros vacíos.";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Core(#[from] CoreEngineError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Library(LibraryError::UnknownAlgorithm(_))
            | CliError::Core(CoreEngineError::ConfigParse(_) | CoreEngineError::InvalidBranchName(_))
            | CliError::Persistence(PersistenceError::ConfigParse { .. } | PersistenceError::InvalidConfig(_)) => 3,
            CliError::Core(CoreEngineError::InvalidInputMismatch { .. }
                           | CoreEngineError::BranchAlreadyDiverged(_)
                           | CoreEngineError::CorruptTrace(_))
            | CliError::Persistence(PersistenceError::CorruptTrace { .. }) => 4,
            _ => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Run {
        fork: Option<String>,
        steps: Vec<Algorithm>,
    },
    Trace {
        only_branch: bool,
    },
    Branches,
}

/// Aplica los flags sobre la configuración de entorno.
fn parse_args(args: &[String], mut config: PipelineConfig) -> Result<(Command, PipelineConfig), CliError> {
    let Some(sub) = args.first() else {
        return Err(CliError::Usage(USAGE.to_string()));
    };
    let mut fork = None;
    let mut steps = Algorithm::ALL.to_vec();
    let mut branch_flag = false;
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1)
                        .cloned()
                        .ok_or_else(|| CliError::Usage(format!("falta el valor de {flag}\n\n{USAGE}")))?;
        match (sub.as_str(), flag) {
            ("run", "--input") => config.input_dir = PathBuf::from(value),
            ("run" | "trace" | "branches", "--output") => config.output_dir = PathBuf::from(value),
            ("run" | "trace", "--branch") => {
                config.branch = value;
                branch_flag = true;
            }
            ("run", "--fork") => fork = Some(value),
            ("run", "--defaults") => config.defaults_file = Some(PathBuf::from(value)),
            ("run", "--steps") => {
                steps = value.split(',')
                             .filter(|s| !s.trim().is_empty())
                             .map(str::parse)
                             .collect::<Result<Vec<Algorithm>, _>>()?;
            }
            _ => return Err(CliError::Usage(format!("flag desconocido para {sub}: {flag}\n\n{USAGE}"))),
        }
        i += 2;
    }
    let command = match sub.as_str() {
        "run" => Command::Run { fork, steps },
        "trace" => Command::Trace { only_branch: branch_flag },
        "branches" => Command::Branches,
        other => return Err(CliError::Usage(format!("comando desconocido: {other}\n\n{USAGE}"))),
    };
    Ok((command, config))
}

fn run(config: &PipelineConfig, fork: Option<&str>, steps: &[Algorithm]) -> Result<(), CliError> {
    config.validate()?;
    let store = JsonFileTraceStore::open(config.trace_path())?;
    let mut defaults = builtin_defaults();
    if let Some(path) = &config.defaults_file {
        defaults = defaults.merged(&load_defaults(path)?);
    }
    let input = DirectoryInput::new(&config.input_dir).with_extension(&config.input_extension);
    let mut pipeline = Pipeline::builder(store).branch(&config.branch)
                                               .defaults(defaults)
                                               .open(&input)?;
    if let Some(name) = fork {
        pipeline = pipeline.branch(name)?;
    }
    info!("branch '{}': {} inputs, {} recorded steps",
          pipeline.branch_name(),
          pipeline.inputs().flatten().len(),
          pipeline.steps().len());

    let library = RecordingLibrary::new();
    for algorithm in steps {
        pipeline.algorithm_step(*algorithm, &library)?;
    }
    debug!("library calls this run: {}", library.operations().len());

    for (n, step) in pipeline.steps().iter().enumerate() {
        let state = if step.is_recorded() { "recorded" } else { "executed" };
        println!("{:>3}. {} [{}]", n + 1, step.name(), state);
        for (key, artifacts) in step.output().iter() {
            println!("       {key}: {} files", artifacts.len());
        }
    }
    println!("fingerprint: {}", pipeline.fingerprint()?);
    Ok(())
}

fn trace(config: &PipelineConfig, only_branch: bool) -> Result<(), CliError> {
    let store = JsonFileTraceStore::open(config.trace_path())?;
    let document = store.read_trace()?;
    let value = if only_branch {
        let branch = document.branch(&config.branch).cloned().unwrap_or_default();
        serde_json::to_string_pretty(&branch)
    } else {
        serde_json::to_string_pretty(&document)
    };
    let text = value.map_err(|e| PersistenceError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn branches(config: &PipelineConfig) -> Result<(), CliError> {
    let store = JsonFileTraceStore::open(config.trace_path())?;
    let document = store.read_trace()?;
    for (name, trace) in document.branches() {
        println!("{name}\t{} steps", trace.len());
    }
    Ok(())
}

fn main() {
    // Cargar .env si existe antes de leer RUST_LOG y CIPIPE_*
    init_dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env())
                             .with_writer(std::io::stderr)
                             .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_args(&args, PipelineConfig::from_env()).and_then(|(command, config)| match command {
                                                                   Command::Run { fork, steps } => {
                                                                       run(&config, fork.as_deref(), &steps)
                                                                   }
                                                                   Command::Trace { only_branch } => {
                                                                       trace(&config, only_branch)
                                                                   }
                                                                   Command::Branches => branches(&config),
                                                               });
    if let Err(e) = result {
        eprintln!("[cipipe] {e}");
        process::exit(e.exit_code());
    }
}
