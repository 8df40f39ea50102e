//! Running sums over evaluated cases.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CaseResult;

/// Top-of-ranking cut-offs tracked for every case.
///
/// Comparisons use the unscaled fraction `rank / out_of`, not the stored
/// percentile: a case counts toward [`Threshold::OnePercent`] when
/// `rank / out_of < 0.01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    HalfPercent,
    OnePercent,
    FivePercent,
}

impl Threshold {
    /// Cut-off on the unscaled fraction.
    #[must_use]
    pub const fn fraction(self) -> f64 {
        match self {
            Self::HalfPercent => 0.005,
            Self::OnePercent => 0.01,
            Self::FivePercent => 0.05,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HalfPercent => f.write_str("0.5%"),
            Self::OnePercent => f.write_str("1%"),
            Self::FivePercent => f.write_str("5%"),
        }
    }
}

/// Per-group percentile sum and case count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTally {
    pub percentile_sum: f64,
    pub cases: usize,
}

impl GroupTally {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        (self.cases > 0).then(|| self.percentile_sum / self.cases as f64)
    }
}

/// Running sums and counts over every recorded [`CaseResult`].
///
/// Partial stats built by separate workers combine with [`AggregateStats::merge`];
/// merging is associative and commutative up to float rounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub cases: usize,
    pub total_rank: u64,
    pub total_out_of: u64,
    /// Sum of unscaled `rank / out_of` fractions.
    pub total_fraction: f64,
    pub below_half_percent: usize,
    pub below_one_percent: usize,
    pub below_five_percent: usize,
    pub groups: BTreeMap<String, GroupTally>,
}

impl AggregateStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one result to every sum and counter it belongs to.
    pub fn record(&mut self, result: &CaseResult) {
        let fraction = result.fraction();

        self.cases += 1;
        self.total_rank += result.rank as u64;
        self.total_out_of += result.out_of as u64;
        self.total_fraction += fraction;

        if fraction < Threshold::HalfPercent.fraction() {
            self.below_half_percent += 1;
        }
        if fraction < Threshold::OnePercent.fraction() {
            self.below_one_percent += 1;
        }
        if fraction < Threshold::FivePercent.fraction() {
            self.below_five_percent += 1;
        }

        let tally = self.groups.entry(result.group.clone()).or_default();
        tally.percentile_sum += result.percentile;
        tally.cases += 1;
    }

    /// Fold another worker's partial stats into this one.
    pub fn merge(&mut self, other: &Self) {
        self.cases += other.cases;
        self.total_rank += other.total_rank;
        self.total_out_of += other.total_out_of;
        self.total_fraction += other.total_fraction;
        self.below_half_percent += other.below_half_percent;
        self.below_one_percent += other.below_one_percent;
        self.below_five_percent += other.below_five_percent;

        for (group, tally) in &other.groups {
            let entry = self.groups.entry(group.clone()).or_default();
            entry.percentile_sum += tally.percentile_sum;
            entry.cases += tally.cases;
        }
    }

    /// Number of cases strictly below `threshold`.
    #[must_use]
    pub const fn count_below(&self, threshold: Threshold) -> usize {
        match threshold {
            Threshold::HalfPercent => self.below_half_percent,
            Threshold::OnePercent => self.below_one_percent,
            Threshold::FivePercent => self.below_five_percent,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cases == 0
    }
}
