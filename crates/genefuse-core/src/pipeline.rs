//! Batch drivers: fuse every case of a seed layout, or evaluate every case.
//!
//! Per-case failures are logged with the case identifier and counted; they
//! never abort the batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::distribute::WorkDistributor;
use crate::error::Error;
use crate::eval::{PerformanceEvaluator, TestCase};
use crate::fusion::{FusionConfig, fuse};
use crate::ranking::CaseIdentifier;
use crate::store::{GroundTruthSource, RankingSource, ResultSink, SourceError};

/// Fuse the primary and secondary rankings of one case and store the result.
///
/// Returns the number of fused items.
///
/// # Errors
///
/// Returns [`Error::Source`] when an input cannot be loaded or the output
/// cannot be written, and [`Error::Fusion`] when the rankings disagree on
/// their items.
pub fn combine_case<P, S, K>(
    case: &CaseIdentifier,
    primary: &P,
    secondary: &S,
    sink: &K,
    config: FusionConfig,
) -> Result<usize, Error>
where
    P: RankingSource + ?Sized,
    S: RankingSource + ?Sized,
    K: ResultSink + ?Sized,
{
    let first = primary.load_ranking(case)?;
    let second = secondary.load_ranking(case)?;
    let fused = fuse(&first, &second, config)?;
    sink.store_ranking(case, &fused)?;
    Ok(fused.len())
}

/// Counts from a [`run_combine`] batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CombineOutcome {
    pub cases: usize,
    pub fused: usize,
    pub failed: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Fuse every case through `distributor`.
#[must_use]
pub fn run_combine<D, P, S, K>(
    distributor: &D,
    cases: &[CaseIdentifier],
    primary: &P,
    secondary: &S,
    sink: &K,
    config: FusionConfig,
) -> CombineOutcome
where
    D: WorkDistributor,
    P: RankingSource + Sync + ?Sized,
    S: RankingSource + Sync + ?Sized,
    K: ResultSink + Sync + ?Sized,
{
    let start = Instant::now();
    let fused = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    info!(
        cases = cases.len(),
        combine = %config.combine(),
        bias_primary = config.bias_primary(),
        "combine started"
    );

    distributor.distribute(cases, |case| {
        match combine_case(case, primary, secondary, sink, config) {
            Ok(_) => {
                fused.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                failed.fetch_add(1, Ordering::Relaxed);
                error!(case = %case, code = %err.code(), "fusion failed: {err}");
            }
        }
    });

    let outcome = CombineOutcome {
        cases: cases.len(),
        fused: fused.into_inner(),
        failed: failed.into_inner(),
        elapsed: start.elapsed(),
    };
    info!(
        fused = outcome.fused,
        failed = outcome.failed,
        elapsed_ms = outcome.elapsed.as_millis(),
        "combine finished"
    );
    outcome
}

/// Load the ranking, query item and seeds for one case.
///
/// # Errors
///
/// Returns the first [`SourceError`] hit.
pub fn load_case<R, G>(
    case: &CaseIdentifier,
    rankings: &R,
    truth: &G,
) -> Result<TestCase, SourceError>
where
    R: RankingSource + ?Sized,
    G: GroundTruthSource + ?Sized,
{
    Ok(TestCase {
        id: case.clone(),
        ranking: rankings.load_ranking(case)?,
        query_item: truth.load_query_item(case)?,
        excluded_items: truth.load_excluded_items(case)?,
    })
}

/// A case that could not be evaluated.
#[derive(Debug)]
pub struct CaseFailure {
    pub case: CaseIdentifier,
    pub error: Error,
}

/// Result of [`evaluate_cases`].
#[derive(Debug)]
pub struct EvaluationRun {
    pub evaluator: PerformanceEvaluator,
    pub failures: Vec<CaseFailure>,
    pub elapsed: Duration,
}

/// Cases loaded in parallel before they are added to the evaluator.
pub const DEFAULT_EVAL_CHUNK: usize = 256;

/// Load cases in parallel chunks of [`DEFAULT_EVAL_CHUNK`], then add them in
/// `cases` order.
///
/// Sequential accumulation keeps the evaluator and any reports deterministic.
#[must_use]
pub fn evaluate_cases<R, G>(
    cases: &[CaseIdentifier],
    rankings: &R,
    truth: &G,
    exclude_seeds: bool,
) -> EvaluationRun
where
    R: RankingSource + Sync + ?Sized,
    G: GroundTruthSource + Sync + ?Sized,
{
    evaluate_cases_chunked(cases, rankings, truth, exclude_seeds, DEFAULT_EVAL_CHUNK)
}

/// [`evaluate_cases`] with an explicit chunk size.
///
/// At most `chunk_size` rankings are held in memory at once; each chunk is
/// dropped once its cases are recorded. A `chunk_size` of 0 is treated as 1.
#[must_use]
pub fn evaluate_cases_chunked<R, G>(
    cases: &[CaseIdentifier],
    rankings: &R,
    truth: &G,
    exclude_seeds: bool,
    chunk_size: usize,
) -> EvaluationRun
where
    R: RankingSource + Sync + ?Sized,
    G: GroundTruthSource + Sync + ?Sized,
{
    let start = Instant::now();
    info!(cases = cases.len(), exclude_seeds, chunk_size, "evaluation started");

    let mut evaluator = PerformanceEvaluator::new();
    let mut failures = Vec::new();
    for chunk in cases.chunks(chunk_size.max(1)) {
        let loaded: Vec<Result<TestCase, SourceError>> = chunk
            .par_iter()
            .map(|case| load_case(case, rankings, truth))
            .collect();

        for (case, test) in chunk.iter().zip(loaded) {
            let outcome = test.map_err(Error::from).and_then(|test| {
                evaluator
                    .add_case(&test, exclude_seeds)
                    .map_err(Error::from)
            });
            if let Err(err) = outcome {
                warn!(case = %case, code = %err.code(), "skipping case: {err}");
                failures.push(CaseFailure {
                    case: case.clone(),
                    error: err,
                });
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        evaluated = evaluator.case_count(),
        skipped = failures.len(),
        elapsed_ms = elapsed.as_millis(),
        "evaluation finished"
    );
    EvaluationRun {
        evaluator,
        failures,
        elapsed,
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}
