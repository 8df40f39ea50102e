use anyhow::{Context, Result};
use clap::Args;
use genefuse_core::Error;
use genefuse_core::config::ProjectConfig;
use genefuse_core::distribute::{PooledDistributor, SerialDistributor};
use genefuse_core::fusion::{CombineMode, FusionConfig};
use genefuse_core::pipeline::{CombineOutcome, run_combine as run_batch};
use genefuse_core::store::SeedDirectory;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use crate::output::{OutputMode, pretty_kv, pretty_section, render};

/// Arguments for `gf combine`.
#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Seed directory listing the cases to fuse.
    #[arg(long, value_name = "DIR")]
    pub seeds: PathBuf,

    /// Seed directory holding the primary method's rankings.
    #[arg(long, value_name = "DIR")]
    pub primary: PathBuf,

    /// Seed directory holding the secondary method's rankings.
    #[arg(long, value_name = "DIR")]
    pub secondary: PathBuf,

    /// Directory that receives `<group>/seed<N>_rank.txt` for each fused case.
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    /// Weight of the primary ranking, 0-100 (secondary gets the rest).
    #[arg(long, value_name = "N")]
    pub bias: Option<u8>,

    /// Add weighted ranks (the default unless the config file says otherwise).
    #[arg(long, overrides_with = "multiply")]
    pub add: bool,

    /// Multiply weighted ranks instead of adding them.
    #[arg(long, overrides_with = "add")]
    pub multiply: bool,

    /// Worker threads (0 = one per core).
    #[arg(long, value_name = "N", conflicts_with = "serial")]
    pub threads: Option<usize>,

    /// Fuse cases one at a time on the main thread.
    #[arg(long)]
    pub serial: bool,
}

#[derive(Debug, Serialize)]
struct CombineReport {
    seeds: PathBuf,
    output: PathBuf,
    combine: CombineMode,
    bias_primary: u8,
    bias_secondary: u8,
    serial: bool,
    #[serde(flatten)]
    outcome: CombineOutcome,
}

/// Flags override the config file; the config file overrides defaults.
fn fusion_config(args: &CombineArgs, config: &ProjectConfig) -> Result<FusionConfig, Error> {
    let combine = if args.add {
        CombineMode::Add
    } else if args.multiply {
        CombineMode::Multiply
    } else {
        config.fusion.combine()
    };
    let bias = args.bias.unwrap_or_else(|| config.fusion.bias_primary());
    FusionConfig::new(combine, bias).map_err(Error::from)
}

/// Fuse every case under `--seeds` and print a summary.
///
/// # Errors
///
/// Fails on an invalid bias, an unreadable seed directory or a worker pool
/// that cannot start. Individual case failures are logged and counted.
pub fn run_combine(args: &CombineArgs, config: &ProjectConfig, mode: OutputMode) -> Result<()> {
    let fusion = fusion_config(args, config)?;
    let seeds = SeedDirectory::new(&args.seeds);
    let primary = SeedDirectory::new(&args.primary);
    let secondary = SeedDirectory::new(&args.secondary);
    let sink = SeedDirectory::new(&args.output);

    let cases = seeds
        .discover_cases()
        .map_err(Error::from)
        .with_context(|| format!("Failed to list cases in {}", args.seeds.display()))?;
    info!(cases = cases.len(), seeds = %args.seeds.display(), "cases discovered");

    let serial = args.serial || (config.workers.serial && args.threads.is_none());
    let outcome = if serial {
        run_batch(&SerialDistributor, &cases, &primary, &secondary, &sink, fusion)
    } else {
        let threads = args.threads.unwrap_or(config.workers.threads);
        let pool = PooledDistributor::new(threads).map_err(Error::from)?;
        run_batch(&pool, &cases, &primary, &secondary, &sink, fusion)
    };

    let report = CombineReport {
        seeds: args.seeds.clone(),
        output: args.output.clone(),
        combine: fusion.combine(),
        bias_primary: fusion.bias_primary(),
        bias_secondary: fusion.bias_secondary(),
        serial,
        outcome,
    };

    render(mode, &report, |r, w| {
        if mode.is_pretty() {
            write_pretty(r, w)
        } else {
            write_text(r, w)
        }
    })
}

fn write_pretty(r: &CombineReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Combine")?;
    pretty_kv(w, "Output", r.output.display().to_string())?;
    pretty_kv(
        w,
        "Method",
        format!("{} ({}/{})", r.combine, r.bias_primary, r.bias_secondary),
    )?;
    pretty_kv(w, "Cases", r.outcome.cases.to_string())?;
    pretty_kv(w, "Fused", r.outcome.fused.to_string())?;
    pretty_kv(w, "Failed", r.outcome.failed.to_string())?;
    pretty_kv(w, "Elapsed", format!("{:.2}s", r.outcome.elapsed.as_secs_f64()))
}

fn write_text(r: &CombineReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "cases\t{}", r.outcome.cases)?;
    writeln!(w, "fused\t{}", r.outcome.fused)?;
    writeln!(w, "failed\t{}", r.outcome.failed)?;
    writeln!(w, "elapsed_ms\t{}", r.outcome.elapsed.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use genefuse_core::ErrorCode;

    fn args() -> CombineArgs {
        CombineArgs {
            seeds: PathBuf::from("s"),
            primary: PathBuf::from("p"),
            secondary: PathBuf::from("q"),
            output: PathBuf::from("o"),
            bias: None,
            add: false,
            multiply: false,
            threads: None,
            serial: false,
        }
    }

    #[test]
    fn config_values_apply_without_flags() {
        let mut config = ProjectConfig::default();
        config.fusion = FusionConfig::new(CombineMode::Multiply, 70).expect("valid");
        let fusion = fusion_config(&args(), &config).expect("valid");
        assert_eq!(fusion.combine(), CombineMode::Multiply);
        assert_eq!(fusion.bias_primary(), 70);
    }

    #[test]
    fn flags_override_config() {
        let mut a = args();
        a.bias = Some(25);
        a.multiply = true;
        let fusion = fusion_config(&a, &ProjectConfig::default()).expect("valid");
        assert_eq!(fusion.combine(), CombineMode::Multiply);
        assert_eq!(fusion.bias_secondary(), 75);
    }

    #[test]
    fn add_flag_overrides_multiply_in_config() {
        let mut config = ProjectConfig::default();
        config.fusion = FusionConfig::new(CombineMode::Multiply, 40).expect("valid");
        let mut a = args();
        a.add = true;
        let fusion = fusion_config(&a, &config).expect("valid");
        assert_eq!(fusion.combine(), CombineMode::Add);
        assert_eq!(fusion.bias_primary(), 40);
    }

    #[test]
    fn bias_above_100_is_rejected() {
        let mut a = args();
        a.bias = Some(150);
        let err = fusion_config(&a, &ProjectConfig::default()).expect_err("invalid");
        assert_eq!(err.code(), ErrorCode::InvalidBias);
    }
}
