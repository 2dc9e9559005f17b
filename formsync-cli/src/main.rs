use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use formsync::{
    DocumentFormat, EnvEntry, InputScript, replay, validate_env_entries,
    io::{OutputDestination, OutputOptions, emit, load_document, parse_document_any},
};

const LOG_ENV: &str = "FORMSYNC_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "formsync",
    version,
    about = "Replay form-input sessions through the debounced validation pipeline"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); FORMSYNC_LOG overrides
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a scripted session and print the resulting form state
    Replay {
        /// Script file (json/yaml/toml) or "-" for stdin
        #[arg(value_name = "SCRIPT")]
        script: String,

        /// Options document overriding the script's own `options`
        #[arg(long = "options", value_name = "PATH")]
        options: Option<PathBuf>,

        /// Output destinations ("-" writes to stdout)
        #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
        outputs: Vec<String>,

        /// Emit compact output rather than pretty formatting
        #[arg(long = "no-pretty")]
        no_pretty: bool,

        /// Exit with an error when the last submit was blocked
        #[arg(long = "strict")]
        strict: bool,
    },
    /// Check a list of environment variables for duplicate names
    CheckEnvs {
        /// File holding an array of {name, value, type} entries, or "-"
        #[arg(value_name = "FILE")]
        file: String,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Replay {
            script,
            options,
            outputs,
            no_pretty,
            strict,
        } => run_replay(&script, options.as_deref(), &outputs, !no_pretty, strict),
        Command::CheckEnvs { file } => run_check_envs(&file),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_replay(
    source: &str,
    options: Option<&Path>,
    outputs: &[String],
    pretty: bool,
    strict: bool,
) -> Result<()> {
    let mut document = load_source(source, "script")?;
    if let Some(path) = options {
        let overrides = load_document(path).map_err(|err| eyre!("{err:#}"))?;
        match document.as_object_mut() {
            Some(map) => {
                map.insert("options".to_string(), overrides);
            }
            None => return Err(eyre!("script must be a mapping at the top level")),
        }
    }
    let script = InputScript::from_value(document).map_err(|err| eyre!("{err:#}"))?;
    debug!(form = %script.form, events = script.events.len(), "loaded script");
    let report = replay(&script).map_err(|err| eyre!("{err:#}"))?;

    let output = build_output_options(outputs, pretty)?;
    emit(&report, &output).map_err(|err| eyre!("{err:#}"))?;
    info!(commits = report.commits.len(), issues = report.errors.len(), "replay finished");

    if strict && report.submits.last().is_some_and(|outcome| !outcome.is_valid()) {
        return Err(eyre!(
            "submit blocked: {} issue(s)",
            report.errors.len()
        ));
    }
    Ok(())
}

fn run_check_envs(source: &str) -> Result<()> {
    let document = load_source(source, "env list")?;
    let entries: Vec<EnvEntry> =
        serde_json::from_value(document).wrap_err("expected an array of env entries")?;
    match validate_env_entries(Some(entries.as_slice())) {
        Some(message) => Err(eyre!(message)),
        None => {
            println!("{} env entries OK", entries.len());
            Ok(())
        }
    }
}

fn load_source(source: &str, label: &str) -> Result<Value> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .wrap_err("failed to read from stdin")?;
        return parse_document_any(&buffer, DocumentFormat::Json)
            .map_err(|err| eyre!("failed to parse {label} from stdin: {err:#}"));
    }
    let path = Path::new(source);
    if !path.exists() {
        return Err(eyre!("{label} file {} does not exist", path.display()));
    }
    load_document(path).map_err(|err| eyre!("{err:#}"))
}

fn build_output_options(outputs: &[String], pretty: bool) -> Result<OutputOptions> {
    let mut destinations = Vec::new();
    let mut format = None;
    for raw in outputs {
        if raw.trim().is_empty() {
            return Err(eyre!("output destination cannot be empty"));
        }
        if raw == "-" {
            destinations.push(OutputDestination::Stdout);
            continue;
        }
        let path = PathBuf::from(raw);
        let detected = DocumentFormat::from_path(&path).ok_or_else(|| {
            eyre!(
                "cannot infer format from output file {}; use .json/.yaml/.toml",
                path.display()
            )
        })?;
        if let Some(existing) = format
            && existing != detected
        {
            return Err(eyre!(
                "output file {} uses {detected} but other destinations use {existing}; align extensions",
                path.display()
            ));
        }
        format = Some(detected);
        destinations.push(OutputDestination::File(path));
    }
    if destinations.is_empty() {
        destinations.push(OutputDestination::Stdout);
    }
    Ok(OutputOptions::new(format.unwrap_or_default())
        .with_pretty(pretty)
        .with_destinations(destinations))
}
