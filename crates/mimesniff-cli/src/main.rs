//! mimesniff CLI - detect MIME types from file names and content

mod cli;
mod logging;
mod output;
mod walk;

use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use mimesniff_core::{ContentAcquisitionError, ContentSource, Detector, DetectorConfig, RuleDatabase};
use rayon::prelude::*;
use tracing::debug;

use cli::{Cli, OutputFormat};
use output::Report;
use walk::Input;

/// Environment variable naming a config file.
const CONFIG_ENV: &str = "MIMESNIFF_CONFIG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.no_color || !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let database = RuleDatabase::try_builtin().context("Built-in rule tables are invalid")?;
    debug!(
        globs = database.glob_count(),
        magic = database.magic_count(),
        max_read_bytes = config.max_read_bytes,
        "rule database ready"
    );
    let detector = Detector::with_config(database, config);

    let inputs = walk::collect_inputs(&cli.paths, cli.recursive);
    let reports: Vec<Report> = inputs
        .par_iter()
        .map(|input| classify(&detector, input, cli))
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => output::print_text(&reports, &mut out, &mut io::stderr().lock())?,
        OutputFormat::Json => output::print_json(&reports, &mut out)?,
    }

    if reports.iter().any(Report::is_error) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Resolve the config: `--config`, then `$MIMESNIFF_CONFIG`, then
/// `<config_dir>/mimesniff/config.toml` when it exists.
fn load_config(explicit: Option<&Path>) -> Result<DetectorConfig> {
    let path = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });
    if let Some(path) = path {
        return DetectorConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    match dirs::config_dir().map(|dir| dir.join("mimesniff").join("config.toml")) {
        Some(path) if path.is_file() => DetectorConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        _ => Ok(DetectorConfig::default()),
    }
}

fn classify(detector: &Detector, input: &Input, cli: &Cli) -> Report {
    let display = input.display_path();
    if let Input::Invalid { reason, .. } = input {
        return Report::failed(display, reason.clone());
    }
    let name = input.glob_name(cli.as_name.as_deref());

    if cli.name_only {
        return Report::detected(display, &detector.explain(&name, None), cli.explain);
    }

    match read_content(detector, input, &display) {
        Ok(bytes) => Report::detected(display, &detector.explain(&name, Some(&bytes)), cli.explain),
        Err(e) => Report::failed(display, format!("{e}: {}", e.cause())),
    }
}

fn read_content(
    detector: &Detector,
    input: &Input,
    name: &str,
) -> Result<Vec<u8>, ContentAcquisitionError> {
    let limit = detector.read_limit();
    let source = match input {
        Input::Stdin => ContentSource::from_reader(io::stdin().lock()),
        Input::File(path) => {
            let file = File::open(path).map_err(|e| ContentAcquisitionError::new(name, e))?;
            ContentSource::from_reader(file)
        }
        Input::Invalid { reason, .. } => {
            return Err(ContentAcquisitionError::new(name, reason.clone()));
        }
    };
    source.acquire(name, limit).map(|bytes| bytes.into_owned())
}
