//! Ranking performance evaluation against held-out true-positive genes.
//!
//! Each [`TestCase`] pairs a ranking with the gene that should have ranked
//! well. The [`PerformanceEvaluator`] turns cases into [`CaseResult`]s and keeps
//! running [`AggregateStats`] for the summary numbers and report views.

pub mod evaluator;
pub mod report;
pub mod stats;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::ranking::{CaseIdentifier, Ranking};

pub use evaluator::{DEFAULT_MAX_THRESHOLD, PerformanceEvaluator, area_under_curve};
pub use report::{HISTOGRAM_BUCKETS, SizeStratum, Summary, percentile_bucket};
pub use stats::{AggregateStats, Threshold};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// The query item is not in the (possibly seed-filtered) ranking.
    #[error("{case}: query item {item} is not in the ranking")]
    QueryItemNotFound { case: CaseIdentifier, item: String },

    /// A result for this group and query item already exists.
    #[error("group {group} already has a result for {item}")]
    DuplicateCase { group: String, item: String },

    #[error("no cases recorded for group {0}")]
    UnknownGroup(String),

    #[error("no cases recorded")]
    NoData,

    /// Fewer than two points cannot be integrated.
    #[error("curve has {points} point(s); at least 2 are needed")]
    EmptyCurve { points: usize },
}

impl EvalError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::QueryItemNotFound { .. } => ErrorCode::QueryItemNotFound,
            Self::DuplicateCase { .. } => ErrorCode::DuplicateCase,
            Self::UnknownGroup(_) => ErrorCode::UnknownGroup,
            Self::NoData => ErrorCode::NoData,
            Self::EmptyCurve { .. } => ErrorCode::EmptyCurve,
        }
    }
}

/// One evaluation case, consumed by [`PerformanceEvaluator::add_case`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: CaseIdentifier,
    pub ranking: Ranking,
    /// The held-out gene whose rank is measured.
    pub query_item: String,
    /// Seed genes, removed from the ranking when seeds are excluded.
    pub excluded_items: HashSet<String>,
}

/// Outcome of one evaluated case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub group: String,
    pub query_item: String,
    /// 1-based rank of the query item.
    pub rank: usize,
    /// Length of the ranking the rank was taken from.
    pub out_of: usize,
    /// `100 * rank / out_of`; lower is better.
    pub percentile: f64,
}

impl CaseResult {
    /// `rank / out_of` before scaling to a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        self.rank as f64 / self.out_of as f64
    }
}
