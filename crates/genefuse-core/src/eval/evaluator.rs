//! The stateful evaluator: records cases, answers summary statistics.

use std::collections::BTreeMap;

use tracing::trace;

use super::stats::{AggregateStats, Threshold};
use super::{CaseResult, EvalError, TestCase};

/// Default number of points on the recall-at-k curve.
pub const DEFAULT_MAX_THRESHOLD: usize = 500;

/// Accumulates [`CaseResult`]s keyed by `(group, query item)`.
///
/// `add_case` takes `&mut self`: one evaluator is owned by one thread. Workers
/// that evaluate in parallel each build their own and combine them with
/// [`PerformanceEvaluator::merge`].
#[derive(Debug, Clone, Default)]
pub struct PerformanceEvaluator {
    results: BTreeMap<String, BTreeMap<String, CaseResult>>,
    stats: AggregateStats,
}

impl PerformanceEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one case and fold it into the running statistics.
    ///
    /// With `exclude_seeds`, every excluded item is removed from the ranking
    /// first, which moves later items up.
    ///
    /// # Errors
    ///
    /// - [`EvalError::QueryItemNotFound`] when the query item is not in the
    ///   (filtered) ranking, including when it is itself an excluded seed.
    /// - [`EvalError::DuplicateCase`] when the group already holds a result for
    ///   this query item.
    ///
    /// A failed case leaves the evaluator unchanged.
    pub fn add_case(
        &mut self,
        case: &TestCase,
        exclude_seeds: bool,
    ) -> Result<CaseResult, EvalError> {
        let filtered;
        let ranking = if exclude_seeds && !case.excluded_items.is_empty() {
            filtered = case
                .ranking
                .retain(|item| !case.excluded_items.contains(item));
            &filtered
        } else {
            &case.ranking
        };

        let rank = ranking
            .position_index()
            .rank(&case.query_item)
            .ok_or_else(|| EvalError::QueryItemNotFound {
                case: case.id.clone(),
                item: case.query_item.clone(),
            })?;

        if self
            .results
            .get(&case.id.group)
            .is_some_and(|group| group.contains_key(&case.query_item))
        {
            return Err(EvalError::DuplicateCase {
                group: case.id.group.clone(),
                item: case.query_item.clone(),
            });
        }

        let out_of = ranking.len();
        #[allow(clippy::cast_precision_loss)]
        let percentile = 100.0 * rank as f64 / out_of as f64;
        let result = CaseResult {
            group: case.id.group.clone(),
            query_item: case.query_item.clone(),
            rank,
            out_of,
            percentile,
        };

        trace!(case = %case.id, rank, out_of, percentile, "case evaluated");

        self.stats.record(&result);
        self.results
            .entry(result.group.clone())
            .or_default()
            .insert(result.query_item.clone(), result.clone());

        Ok(result)
    }

    /// Fold a partial evaluator into this one.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::DuplicateCase`] if both hold a result for the same
    /// group and query item; nothing is merged in that case.
    pub fn merge(&mut self, other: Self) -> Result<(), EvalError> {
        for (group, items) in &other.results {
            let Some(existing) = self.results.get(group) else {
                continue;
            };
            if let Some(item) = items.keys().find(|item| existing.contains_key(*item)) {
                return Err(EvalError::DuplicateCase {
                    group: group.clone(),
                    item: item.clone(),
                });
            }
        }

        self.stats.merge(&other.stats);
        for (group, items) in other.results {
            self.results.entry(group).or_default().extend(items);
        }
        Ok(())
    }

    #[must_use]
    pub const fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    #[must_use]
    pub const fn case_count(&self) -> usize {
        self.stats.cases
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Every result in `(group, query item)` order.
    pub fn results(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.values().flat_map(BTreeMap::values)
    }

    /// Results grouped by group name.
    #[must_use]
    pub const fn results_by_group(&self) -> &BTreeMap<String, BTreeMap<String, CaseResult>> {
        &self.results
    }

    /// Distinct group names in order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    #[allow(clippy::cast_precision_loss)]
    fn cases_f64(&self) -> Result<f64, EvalError> {
        if self.stats.cases == 0 {
            return Err(EvalError::NoData);
        }
        Ok(self.stats.cases as f64)
    }

    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_rank(&self) -> Result<f64, EvalError> {
        Ok(self.stats.total_rank as f64 / self.cases_f64()?)
    }

    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_out_of(&self) -> Result<f64, EvalError> {
        Ok(self.stats.total_out_of as f64 / self.cases_f64()?)
    }

    /// Mean percentile over all cases, in `(0, 100]`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    pub fn mean_percentile(&self) -> Result<f64, EvalError> {
        Ok(self.stats.total_fraction / self.cases_f64()? * 100.0)
    }

    /// Share of cases (as a fraction in `[0, 1]`) strictly below `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction_below_threshold(&self, threshold: Threshold) -> Result<f64, EvalError> {
        Ok(self.stats.count_below(threshold) as f64 / self.cases_f64()?)
    }

    /// Mean percentile of one group's cases.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownGroup`] when the group has no cases.
    pub fn group_average(&self, group: &str) -> Result<f64, EvalError> {
        self.stats
            .groups
            .get(group)
            .and_then(super::stats::GroupTally::mean)
            .ok_or_else(|| EvalError::UnknownGroup(group.to_string()))
    }

    /// Mean over groups of each group's mean percentile.
    ///
    /// Every group weighs the same regardless of its size, unlike
    /// [`Self::mean_percentile`] where every case weighs the same.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_of_group_averages(&self) -> Result<f64, EvalError> {
        let averages: Vec<f64> = self
            .stats
            .groups
            .values()
            .filter_map(super::stats::GroupTally::mean)
            .collect();
        if averages.is_empty() {
            return Err(EvalError::NoData);
        }
        Ok(averages.iter().sum::<f64>() / averages.len() as f64)
    }

    /// Percentage in `[0, 100]` of cases whose rank is `<= threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_at_or_above_rank(&self, threshold: usize) -> Result<f64, EvalError> {
        let cases = self.cases_f64()?;
        let hits = self.results().filter(|r| r.rank <= threshold).count();
        Ok(100.0 * hits as f64 / cases)
    }

    /// Recall-at-k curve: entry `t` is [`Self::percent_at_or_above_rank`]`(t)`
    /// for `t` in `0..max_threshold`.
    ///
    /// Entry 0 is always 0 since ranks start at 1.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    #[allow(clippy::cast_precision_loss)]
    pub fn roc_curve(&self, max_threshold: usize) -> Result<Vec<f64>, EvalError> {
        let cases = self.cases_f64()?;

        // Bucket ranks once, then walk the cumulative sum.
        let mut at_rank = vec![0_usize; max_threshold];
        for result in self.results() {
            if let Some(slot) = at_rank.get_mut(result.rank) {
                *slot += 1;
            }
        }

        let mut cumulative = 0_usize;
        Ok(at_rank
            .into_iter()
            .map(|count| {
                cumulative += count;
                100.0 * cumulative as f64 / cases
            })
            .collect())
    }

    /// Area under the default-length recall-at-k curve.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NoData`] when no case was recorded.
    pub fn auc(&self) -> Result<f64, EvalError> {
        area_under_curve(&self.roc_curve(DEFAULT_MAX_THRESHOLD)?)
    }
}

/// Composite trapezoid rule with unit spacing between points.
///
/// `(curve[0] + curve[last]) / 2 + sum(curve[1..last])`. The result is not
/// normalised; divide by `curve.len() - 1` for a mean height.
///
/// # Errors
///
/// Returns [`EvalError::EmptyCurve`] when the curve has fewer than two points.
pub fn area_under_curve(curve: &[f64]) -> Result<f64, EvalError> {
    let [first, inner @ .., last] = curve else {
        return Err(EvalError::EmptyCurve {
            points: curve.len(),
        });
    };
    Ok((first + last) / 2.0 + inner.iter().sum::<f64>())
}
