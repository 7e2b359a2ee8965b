//! op2 command line interface
//!
//! Usage:
//!   op2 file1 file2 ... [dir1 dir2 ...]
//!
//! Existing regular files are translated in order; existing directories are
//! searched for kernel declarations. Exit status is 1 for usage errors and
//! rejected annotations, 2 when a kernel declaration cannot be found.
//!
//! Examples:
//!   op2 airfoil.cpp                     # rewrite to airfoil_op.cpp
//!   OP_AUTO_SOA=1 op2 src/main.cpp src/   # SOA layout, kernels under src/

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::{debug, error, info};
use op2_translator::{TranslatorConfig, utils::errors::TranslatorError};
use std::path::PathBuf;
use std::process::ExitCode;

/// op2 - OP2 source-to-source translator
#[derive(Parser, Debug)]
#[command(name = "op2")]
#[command(version)]
#[command(about = "Translate OP2 parallel-loop annotations", long_about = None)]
struct Cli {
    /// Input files followed by kernel declaration search directories
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Directory generated backend files are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Skip the JSON kernel manifest
    #[arg(long)]
    no_manifest: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(&err));
        }
    };

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    if cli.paths.is_empty() {
        let _ = Cli::command().print_help();
        return ExitCode::from(1);
    }

    match translate(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<TranslatorError>()
                .map(TranslatorError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

/// Exit status for a command line that failed to parse.
///
/// `--help` and `--version` succeed; every usage error exits 1 so status 2
/// stays reserved for unresolved kernel declarations.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn translate(cli: &Cli) -> Result<()> {
    info!("op2-translator v{}", op2_translator::VERSION);

    let config = TranslatorConfig::from_paths(&cli.paths)
        .with_env()
        .output_dir(&cli.output_dir)
        .manifest(!cli.no_manifest);
    debug!("Translator config: {:?}", config);

    let translator = op2_translator::run(config)?;
    info!(
        "translated {} file(s): {} kernel(s), {} constant(s), {} set(s)",
        translator.files().len(),
        translator.kernels().len(),
        translator.constants().len(),
        translator.sets().len()
    );
    Ok(())
}
