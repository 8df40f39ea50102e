use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use genefuse_core::Error;
use genefuse_core::config::ProjectConfig;
use genefuse_core::eval::{EvalError, PerformanceEvaluator, percentile_bucket};
use genefuse_core::pipeline::{EvaluationRun, evaluate_cases};
use genefuse_core::store::SeedDirectory;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::output::{OutputMode, pretty_kv, pretty_section, render};

/// Report sections `gf evaluate` can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Means, top-k percentages, mean of group averages and AUC.
    Summary,
    /// Every case, grouped by disease.
    Detailed,
    /// Every case as one tab-separated row.
    Simple,
    /// Whole-percent percentile of every case, one per line.
    Percents,
    /// Number of cases per whole-percent percentile.
    Histogram,
    /// Number of groups per whole-percent spread of their percentiles.
    RangeHistogram,
    /// Groups stratified by case count.
    Sizes,
    /// Case count of every group.
    GroupSizes,
    /// Each group's average percentile minus the mean of group averages.
    GroupDeviation,
    /// Percentage of cases at or above each rank threshold.
    Roc,
    /// Area under the rank-threshold curve.
    Auc,
}

impl ReportKind {
    fn key(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Detailed => "detailed",
            Self::Simple => "simple",
            Self::Percents => "percents",
            Self::Histogram => "histogram",
            Self::RangeHistogram => "range_histogram",
            Self::Sizes => "sizes",
            Self::GroupSizes => "group_sizes",
            Self::GroupDeviation => "group_deviation",
            Self::Roc => "roc",
            Self::Auc => "auc",
        }
    }
}

/// Arguments for `gf evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Seed directory with `<group>_seed<N>.txt` and `<group>_test_gene<N>.txt`.
    #[arg(value_name = "SEEDS_DIR")]
    pub seeds: PathBuf,

    /// Directory holding `<group>/seed<N>_rank.txt` (defaults to SEEDS_DIR).
    #[arg(long, value_name = "DIR")]
    pub rankings: Option<PathBuf>,

    /// Remove seed genes from each ranking before measuring.
    #[arg(long, overrides_with = "keep_seeds")]
    pub exclude_seeds: bool,

    /// Measure against the unfiltered ranking.
    #[arg(long, overrides_with = "exclude_seeds")]
    pub keep_seeds: bool,

    /// Report section to print; repeat for several (default: summary).
    #[arg(long = "report", value_enum, value_name = "KIND")]
    pub reports: Vec<ReportKind>,

    /// Number of points on the rank-threshold curve.
    #[arg(long, value_name = "N")]
    pub max_threshold: Option<usize>,
}

impl EvaluateArgs {
    fn exclude_seeds(&self, config: &ProjectConfig) -> bool {
        if self.keep_seeds {
            false
        } else {
            self.exclude_seeds || config.evaluation.exclude_seeds
        }
    }

    fn reports(&self) -> Vec<ReportKind> {
        if self.reports.is_empty() {
            vec![ReportKind::Summary]
        } else {
            self.reports.clone()
        }
    }
}

#[derive(Debug, Serialize)]
struct Skipped {
    case: String,
    error_code: &'static str,
    message: String,
}

/// Evaluate every case under the seed directory and print the requested
/// report sections.
///
/// # Errors
///
/// Fails when the seed directory cannot be listed, when no case could be
/// evaluated, or when `--max-threshold` is below 2 for curve reports.
pub fn run_evaluate(args: &EvaluateArgs, config: &ProjectConfig, mode: OutputMode) -> Result<()> {
    let seeds = SeedDirectory::new(&args.seeds);
    let rankings = SeedDirectory::new(args.rankings.as_ref().unwrap_or(&args.seeds));
    let exclude_seeds = args.exclude_seeds(config);
    let max_threshold = args.max_threshold.unwrap_or(config.evaluation.max_threshold);

    let cases = seeds
        .discover_cases()
        .map_err(Error::from)
        .with_context(|| format!("Failed to list cases in {}", args.seeds.display()))?;

    let run = evaluate_cases(&cases, &rankings, &seeds, exclude_seeds);
    if run.evaluator.is_empty() {
        return Err(Error::from(EvalError::NoData))
            .with_context(|| format!("No case under {} could be evaluated", args.seeds.display()));
    }

    let reports = args.reports();
    let document = json_document(&run, &reports, max_threshold)?;

    render(mode, &document, |_, w| {
        for kind in &reports {
            if mode.is_pretty() {
                pretty_section(w, &format!("Report: {}", kind.key()))?;
            }
            write_text(*kind, &run.evaluator, max_threshold, w)?;
            if mode.is_pretty() {
                writeln!(w)?;
            }
        }
        if mode.is_pretty() && !run.failures.is_empty() {
            pretty_kv(w, "Skipped cases", run.failures.len().to_string())?;
        }
        Ok(())
    })
}

/// JSON view: one key per requested report plus the skipped cases.
fn json_document(
    run: &EvaluationRun,
    reports: &[ReportKind],
    max_threshold: usize,
) -> Result<Value> {
    let eval = &run.evaluator;
    let mut doc = Map::new();
    for kind in reports {
        let value = match kind {
            ReportKind::Summary => {
                serde_json::to_value(eval.summary(max_threshold).map_err(Error::from)?)?
            }
            ReportKind::Detailed | ReportKind::Simple => {
                serde_json::to_value(eval.results().collect::<Vec<_>>())?
            }
            ReportKind::Percents => json!(eval
                .results()
                .map(|r| percentile_bucket(r.percentile))
                .collect::<Vec<_>>()),
            ReportKind::Histogram => json!(eval.percentile_histogram()),
            ReportKind::RangeHistogram => json!(eval.group_range_histogram()),
            ReportKind::Sizes => serde_json::to_value(eval.size_strata())?,
            ReportKind::GroupSizes => Value::Object(
                eval.group_sizes()
                    .into_iter()
                    .map(|(group, size)| (group, json!(size)))
                    .collect(),
            ),
            ReportKind::GroupDeviation => Value::Object(
                eval.group_deviations()
                    .map_err(Error::from)?
                    .into_iter()
                    .map(|(group, deviation)| (group, json!(deviation)))
                    .collect(),
            ),
            ReportKind::Roc => json!(eval.roc_curve(max_threshold).map_err(Error::from)?),
            ReportKind::Auc => json!(curve_auc(eval, max_threshold)?),
        };
        doc.insert(kind.key().to_string(), value);
    }

    let skipped: Vec<Skipped> = run
        .failures
        .iter()
        .map(|f| Skipped {
            case: f.case.to_string(),
            error_code: f.error.code().code(),
            message: f.error.to_string(),
        })
        .collect();
    doc.insert("skipped".to_string(), serde_json::to_value(skipped)?);
    Ok(Value::Object(doc))
}

fn curve_auc(eval: &PerformanceEvaluator, max_threshold: usize) -> Result<f64, Error> {
    let curve = eval.roc_curve(max_threshold)?;
    Ok(genefuse_core::eval::area_under_curve(&curve)?)
}

/// Tab-separated text for one report section.
fn write_text(
    kind: ReportKind,
    eval: &PerformanceEvaluator,
    max_threshold: usize,
    w: &mut dyn Write,
) -> io::Result<()> {
    match kind {
        ReportKind::Summary => {
            // Validated when the JSON document was built.
            let Ok(s) = eval.summary(max_threshold) else {
                return Ok(());
            };
            writeln!(w, "cases\t{}", s.cases)?;
            writeln!(w, "groups\t{}", s.groups)?;
            writeln!(w, "mean_rank\t{}", s.mean_rank)?;
            writeln!(w, "mean_out_of\t{}", s.mean_out_of)?;
            writeln!(w, "mean_percentile\t{}", s.mean_percentile)?;
            writeln!(w, "top_0.5_percent\t{}", s.top_half_percent)?;
            writeln!(w, "top_1_percent\t{}", s.top_one_percent)?;
            writeln!(w, "top_5_percent\t{}", s.top_five_percent)?;
            writeln!(w, "mean_of_group_averages\t{}", s.mean_of_group_averages)?;
            writeln!(w, "auc\t{}", s.auc)?;
        }
        ReportKind::Detailed => {
            for (group, items) in eval.results_by_group() {
                writeln!(w, "{group}:")?;
                for r in items.values() {
                    writeln!(
                        w,
                        "  {}\trank {} of {}\t{:.2}%",
                        r.query_item, r.rank, r.out_of, r.percentile
                    )?;
                }
            }
        }
        ReportKind::Simple => {
            writeln!(w, "Disease\tGene\tRank\tOut of\tPercentage")?;
            for r in eval.results() {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    r.group, r.query_item, r.rank, r.out_of, r.percentile
                )?;
            }
        }
        ReportKind::Percents => {
            for r in eval.results() {
                writeln!(w, "{}", percentile_bucket(r.percentile))?;
            }
        }
        ReportKind::Histogram => {
            writeln!(w, "Percentage\tFrequency")?;
            for (bucket, count) in eval.percentile_histogram().iter().enumerate() {
                writeln!(w, "{bucket}\t{count}")?;
            }
        }
        ReportKind::RangeHistogram => {
            writeln!(w, "Percentage Range\tFrequency")?;
            for (bucket, count) in eval.group_range_histogram().iter().enumerate() {
                writeln!(w, "{bucket}\t{count}")?;
            }
        }
        ReportKind::Sizes => {
            writeln!(w, "Size of Disease\tAverage Percentile\tNumber Disease\tNumber Genes")?;
            for s in eval.size_strata() {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    s.group_size,
                    percentile_bucket(s.mean_percentile),
                    s.groups,
                    s.cases
                )?;
            }
        }
        ReportKind::GroupSizes => {
            for (group, size) in eval.group_sizes() {
                writeln!(w, "{group}\t{size}")?;
            }
        }
        ReportKind::GroupDeviation => {
            for (group, deviation) in eval.group_deviations().unwrap_or_default() {
                writeln!(w, "{group}\t{deviation}")?;
            }
        }
        ReportKind::Roc => {
            writeln!(w, "Rank Threshold\tPercentage Above Rank Threshold")?;
            for (threshold, pct) in eval
                .roc_curve(max_threshold)
                .unwrap_or_default()
                .iter()
                .enumerate()
            {
                writeln!(w, "{threshold}\t{pct}")?;
            }
        }
        ReportKind::Auc => {
            if let Ok(auc) = curve_auc(eval, max_threshold) {
                writeln!(w, "{auc}")?;
            }
        }
    }
    Ok(())
}
