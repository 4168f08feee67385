use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use bre_core::typ::check_program;
use bre_core::{NativeRegistry, Program, ProgramSource, Runtime, RuntimeConfig, Type, Val};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;


const LOG_ENV: &str = "BRE_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "bre", author, version, about = "CLI for BRE", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load, check and invoke a function; results are printed as a JSON array.
    Run {
        /// Program file (`.json`, `.yaml` or `.yml`)
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
        /// Function to invoke
        #[arg(short = 'f', long = "function", default_value = "main")]
        function: String,
        /// Arguments as JSON values, converted to the declared parameter types
        #[arg(value_name = "ARG_JSON")]
        args: Vec<String>,
        /// Runtime configuration (TOML, `[runtime]` table)
        #[arg(long, value_name = "FILE", value_parser = parse_sanitized_path)]
        config: Option<PathBuf>,
    },
    /// Load a program and run the null-safety checker without executing it.
    Check {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
    /// List registered native units with their signatures.
    Natives,
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

/// `BRE_LOG` wins over `RUST_LOG`; an invalid filter falls back to the default.
fn init_logging() {
    let filter = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|expr| EnvFilter::try_new(expr).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn load_program(path: &Path, natives: &NativeRegistry) -> anyhow::Result<Program> {
    let source = ProgramSource::from_path(path)?;
    Program::load(source, natives).with_context(|| format!("failed to load {}", path.display()))
}

/// Converts CLI arguments to values of the callee's parameter types. Unknown
/// callees get untyped values; the invocation reports the missing name.
fn convert_args(program: &Program, function: &str, raw: &[String]) -> anyhow::Result<Vec<Val>> {
    let types: Vec<Type> = program
        .lookup(function)
        .map(|unit| unit.sig().param_types())
        .unwrap_or_default();

    raw.iter()
        .enumerate()
        .map(|(i, arg)| {
            let json: serde_json::Value =
                serde_json::from_str(arg).with_context(|| format!("argument {i} is not valid JSON: {arg}"))?;
            program.value_from_json(&json, types.get(i).unwrap_or(&Type::Any))
        })
        .collect()
}

fn run(file: &Path, function: &str, args: &[String], config: Option<&Path>) -> anyhow::Result<String> {
    let config = match config {
        Some(path) => RuntimeConfig::from_path(path)?,
        None => RuntimeConfig::default(),
    };
    debug!(?config, "runtime config");

    let program = load_program(file, bre_stdlib::default_registry()?)?;
    let args = convert_args(&program, function, args)?;
    let runtime = Runtime::new(program, config)?;
    let results = runtime.invoke(function, args)?;
    Ok(serde_json::to_string(&results)?)
}

/// Diagnostics of `file`, one per line; empty when the program is clean.
fn check(file: &Path) -> anyhow::Result<Vec<String>> {
    let program = match load_program(file, bre_stdlib::default_registry()?) {
        Ok(program) => program,
        Err(err) => {
            if let Some(errors) = err.downcast_ref::<bre_core::typ::SemanticErrors>() {
                return Ok(errors.errors().iter().map(ToString::to_string).collect());
            }
            return Err(err);
        }
    };
    match check_program(&program) {
        Ok(()) => Ok(Vec::new()),
        Err(errors) => Ok(errors.errors().iter().map(ToString::to_string).collect()),
    }
}

fn natives() -> anyhow::Result<Vec<String>> {
    let registry = bre_stdlib::default_registry()?;
    Ok(registry
        .units()
        .into_iter()
        .map(|unit| {
            if unit.is_type_mapper() {
                format!("{} [type mapper]", unit.sig)
            } else {
                unit.sig.to_string()
            }
        })
        .collect())
}

fn execute(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Run {
            file,
            function,
            args,
            config,
        } => {
            let out = run(&file, &function, &args, config.as_deref())?;
            println!("{out}");
        }
        Commands::Check { file } => {
            let diagnostics = check(&file)?;
            if !diagnostics.is_empty() {
                for d in &diagnostics {
                    eprintln!("error: {d}");
                }
                return Ok(ExitCode::FAILURE);
            }
            println!("{}: ok", file.display());
        }
        Commands::Natives => {
            for line in natives()? {
                println!("{line}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_logging();
    let CliArgs { command } = CliArgs::parse();

    match execute(command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
