mod cli;
mod clock;
mod pathutil;
mod platform;
mod repl;

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use cli::Cli;
use clock::ChronoClock;
use color_eyre::eyre::{eyre, Result};
use fpx_core::diag::{DiagLevel, Diagnostics};
use fpx_core::{Config, Driver, PpError};
use pathutil::StdPathResolver;

/// Adapts `fpx_core::diag::Diagnostics` onto `tracing`, the only point
/// where the core engine's diagnostics reach a logging framework.
struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, level: DiagLevel, message: &str) {
        match level {
            DiagLevel::Warning => tracing::warn!("{message}"),
            DiagLevel::Error => tracing::error!("{message}"),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbose.tracing_level_filter())
        .without_time()
        .with_writer(io::stderr)
        .init();

    let cfg = build_config(&cli);
    let diag = TracingDiagnostics;
    let clock = ChronoClock;
    let paths = StdPathResolver;

    match &cli.input {
        Some(input_path) => run_file(&cli, &cfg, &diag, &clock, &paths, input_path),
        None if io::stdin().is_terminal() => {
            repl::run(cfg, &diag, &clock, &paths).map_err(|e| eyre!("repl I/O error: {e}"))
        }
        None => run_stream(&cli, &cfg, &diag, &clock, &paths, io::stdin(), "<stdin>"),
    }
}

fn build_config(cli: &Cli) -> Config {
    let mut predefined = cli.define.clone();
    predefined.extend(platform::platform_macros());
    Config {
        predefined,
        undef: cli.undef.clone(),
        include_dirs: cli.include_dirs.clone(),
        expand_macros: cli.expand_macros,
        exclude_comments: cli.strip_comments,
        implicit_continuation: false,
        line_break: cli.line_break,
        extra_macros: cli.extra_macros,
        max_recursion: Config::default().max_recursion,
        verbose: cli.verbose.log_level().is_some(),
    }
}

fn run_file(
    cli: &Cli,
    cfg: &Config,
    diag: &dyn Diagnostics,
    clock: &ChronoClock,
    paths: &StdPathResolver,
    input_path: &PathBuf,
) -> Result<()> {
    let file = File::open(input_path).map_err(|e| eyre!("could not open '{}': {e}", input_path.display()))?;
    let file_name = input_path.to_string_lossy().to_string();
    run_stream(cli, cfg, diag, clock, paths, file, &file_name)
}

fn run_stream(
    cli: &Cli,
    cfg: &Config,
    diag: &dyn Diagnostics,
    clock: &ChronoClock,
    paths: &StdPathResolver,
    input: impl io::Read,
    file_name: &str,
) -> Result<()> {
    let mut driver = Driver::new(cfg.clone(), diag, clock, paths);
    let mut buffer = Vec::new();

    match driver.run(input, file_name, &mut buffer, &mut io::stdout()) {
        Ok(()) => {
            write_output(&cli.output, &buffer)?;
            Ok(())
        }
        Err(PpError::Fatal(msg)) => Err(eyre!("{msg}")),
        Err(PpError::Io(e)) => Err(eyre!("I/O error while preprocessing '{file_name}': {e}")),
    }
}

fn write_output(output: &Option<PathBuf>, buffer: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            File::create(path)
                .map_err(|e| eyre!("could not create '{}': {e}", path.display()))?
                .write_all(buffer)?;
        }
        None => io::stdout().write_all(buffer)?,
    }
    Ok(())
}
