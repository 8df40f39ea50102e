//! Derived views over a [`PerformanceEvaluator`]: histograms, size strata and
//! the serialisable [`Summary`].
//!
//! Nothing here mutates the evaluator; each view recomputes from the stored
//! results, so views are cheap to add and never drift from the aggregates.

use std::collections::BTreeMap;

use serde::Serialize;

use super::evaluator::PerformanceEvaluator;
use super::stats::Threshold;
use super::EvalError;

/// Number of buckets in the percentile histograms (0 through 100 inclusive).
pub const HISTOGRAM_BUCKETS: usize = 101;

/// Cases from groups of one particular size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeStratum {
    /// Number of cases each group in the stratum holds.
    pub group_size: usize,
    pub mean_percentile: f64,
    pub groups: usize,
    pub cases: usize,
}

/// Scalar statistics for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub cases: usize,
    pub groups: usize,
    pub mean_rank: f64,
    pub mean_out_of: f64,
    pub mean_percentile: f64,
    /// Percentage of cases below 0.5%, 1% and 5% of their ranking.
    pub top_half_percent: f64,
    pub top_one_percent: f64,
    pub top_five_percent: f64,
    pub mean_of_group_averages: f64,
    pub auc: f64,
    pub max_threshold: usize,
}

/// Whole-percent bucket for a percentile: rounded to two decimals, then
/// truncated, and clamped to `0..=100`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile_bucket(percentile: f64) -> usize {
    let rounded = (percentile * 100.0).round() / 100.0;
    (rounded.trunc().max(0.0) as usize).min(HISTOGRAM_BUCKETS - 1)
}

impl PerformanceEvaluator {
    /// Count of cases per whole-percent bucket.
    #[must_use]
    pub fn percentile_histogram(&self) -> Vec<usize> {
        let mut buckets = vec![0; HISTOGRAM_BUCKETS];
        for result in self.results() {
            buckets[percentile_bucket(result.percentile)] += 1;
        }
        buckets
    }

    /// Count of groups per bucket of `max - min` percentile within the group.
    #[must_use]
    pub fn group_range_histogram(&self) -> Vec<usize> {
        let mut buckets = vec![0; HISTOGRAM_BUCKETS];
        for items in self.results_by_group().values() {
            let (min, max) = items.values().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(min, max), r| (min.min(r.percentile), max.max(r.percentile)),
            );
            if min.is_finite() {
                buckets[percentile_bucket(max - min)] += 1;
            }
        }
        buckets
    }

    /// Groups stratified by how many cases they hold, smallest first.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_strata(&self) -> Vec<SizeStratum> {
        let mut by_size: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for items in self.results_by_group().values() {
            let entry = by_size.entry(items.len()).or_default();
            entry.0 += items.values().map(|r| r.percentile).sum::<f64>();
            entry.1 += 1;
        }

        by_size
            .into_iter()
            .map(|(group_size, (percentile_sum, groups))| {
                let cases = group_size * groups;
                SizeStratum {
                    group_size,
                    mean_percentile: percentile_sum / cases as f64,
                    groups,
                    cases,
                }
            })
            .collect()
    }

    /// `(group, cases)` pairs in group order.
    #[must_use]
    pub fn group_sizes(&self) -> Vec<(String, usize)> {
        self.results_by_group()
            .iter()
            .map(|(group, items)| (group.clone(), items.len()))
            .collect()
    }

    /// Each group's average percentile minus the mean of group averages.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    pub fn group_deviations(&self) -> Result<Vec<(String, f64)>, EvalError> {
        let overall = self.mean_of_group_averages()?;
        self.groups()
            .map(|group| Ok((group.to_string(), self.group_average(group)? - overall)))
            .collect()
    }

    /// Collect the scalar statistics, using a curve of `max_threshold` points
    /// for the AUC.
    ///
    /// # Errors
    ///
    /// - [`EvalError::NoData`] when no case was recorded.
    /// - [`EvalError::EmptyCurve`] when `max_threshold < 2`.
    pub fn summary(&self, max_threshold: usize) -> Result<Summary, EvalError> {
        let pct = |t| self.fraction_below_threshold(t).map(|f| f * 100.0);
        Ok(Summary {
            cases: self.case_count(),
            groups: self.results_by_group().len(),
            mean_rank: self.mean_rank()?,
            mean_out_of: self.mean_out_of()?,
            mean_percentile: self.mean_percentile()?,
            top_half_percent: pct(Threshold::HalfPercent)?,
            top_one_percent: pct(Threshold::OnePercent)?,
            top_five_percent: pct(Threshold::FivePercent)?,
            mean_of_group_averages: self.mean_of_group_averages()?,
            auc: super::area_under_curve(&self.roc_curve(max_threshold)?)?,
            max_threshold,
        })
    }
}
