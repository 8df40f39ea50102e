#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use genefuse_core::ErrorCode;
use genefuse_core::config::load_config;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "gf",
    author,
    version,
    about = "gf: fuse gene rankings and evaluate them against held-out disease genes",
    long_about = None
)]
struct Cli {
    /// Config file (default: ./genefuse.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format (default: pretty on a terminal, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (alias for --format json).
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Fuse two methods' rankings for every case",
        long_about = "Fuse the primary and secondary rankings of every case found in a seed directory \
                      and write the consensus rankings to an output directory.",
        after_help = "EXAMPLES:\n    # Equal weights, additive scores\n    gf combine --seeds seeds/ --primary rwr/ --secondary dsd/ --output combo/\n\n    # Favor the primary method and multiply weighted ranks\n    gf combine --seeds seeds/ --primary rwr/ --secondary dsd/ --output combo/ --bias 70 --multiply\n\n    # Run without a thread pool\n    gf combine --seeds seeds/ --primary rwr/ --secondary dsd/ --output combo/ --serial"
    )]
    Combine(cmd::combine::CombineArgs),

    #[command(
        about = "Measure how well rankings place held-out genes",
        long_about = "Rank each case's held-out gene in its ranking and report percentile statistics, \
                      histograms, rank-threshold curves and AUC.",
        after_help = "EXAMPLES:\n    # Summary statistics, seeds excluded from rankings\n    gf evaluate seeds/ --rankings combo/\n\n    # Several report sections\n    gf evaluate seeds/ --rankings combo/ --report simple --report auc\n\n    # Emit machine-readable output\n    gf evaluate seeds/ --rankings combo/ --format json"
    )]
    Evaluate(cmd::evaluate::EvaluateArgs),

    #[command(
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    gf completions bash\n\n    # Generate zsh completions\n    gf completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GENEFUSE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "genefuse=debug,gf=debug,info"
        } else {
            "genefuse=info,gf=info,warn"
        })
    });

    let format = env::var("GENEFUSE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let cwd = env::current_dir()?;
    let config = load_config(cli.config.as_deref(), &cwd).map_err(ConfigError)?;
    debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Combine(args) => cmd::combine::run_combine(args, &config, output),
        Commands::Evaluate(args) => cmd::evaluate::run_evaluate(args, &config, output),
        Commands::Completions(_) => Ok(()),
    }
}

/// Marks a config-loading failure so it renders with its own code.
#[derive(Debug)]
struct ConfigError(anyhow::Error);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for ConfigError {}

fn cli_error(err: &anyhow::Error) -> CliError {
    if err.downcast_ref::<ConfigError>().is_some() {
        CliError::with_code(format!("{err:#}"), ErrorCode::ConfigUnreadable)
    } else {
        CliError::from(err)
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();

    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(output, &cli_error(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
