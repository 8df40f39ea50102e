//! Weighted rank fusion of two gene rankings.
//!
//! Two rankings over the same gene universe (for example a random-walk
//! ranking and a diffusion-distance ranking of one disease) are merged into a
//! consensus ranking by weighting each gene's rank positions.
//!
//! # Algorithm Overview
//!
//! ```text
//! weight_primary   = rank_primary   * bias_primary
//! weight_secondary = rank_secondary * (100 - bias_primary)
//! score            = weight_primary + weight_secondary   (Add)
//!                  | weight_primary * weight_secondary   (Multiply)
//! ```
//!
//! Ranks are 1-indexed and lower scores are better. Genes with identical
//! scores keep the order they have in the primary ranking, so the primary
//! ranking is the tie-break authority.
//!
//! # Example
//!
//! ```
//! use genefuse_core::fusion::{CombineMode, FusionConfig, fuse};
//! use genefuse_core::ranking::Ranking;
//!
//! let a = Ranking::new(["g1", "g2", "g3"]).unwrap();
//! let b = Ranking::new(["g3", "g1", "g2"]).unwrap();
//! let config = FusionConfig::new(CombineMode::Add, 50).unwrap();
//!
//! let fused = fuse(&a, &b, config).unwrap();
//! assert_eq!(fused.items(), ["g1", "g3", "g2"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ErrorCode;
use crate::ranking::{PositionIndex, Ranking};

/// How the two weighted ranks are combined into one score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Sum the weighted ranks.
    #[default]
    Add,
    /// Multiply the weighted ranks.
    Multiply,
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Multiply => f.write_str("multiply"),
        }
    }
}

/// Which input ranking lacks an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Primary,
    Secondary,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FusionError {
    /// The two rankings are not over the same item set.
    #[error("{item} is missing from the {missing_from} ranking")]
    ItemMismatch { item: String, missing_from: Side },

    /// Primary bias outside `0..=100`.
    #[error("bias {0} is outside 0..=100")]
    InvalidBias(u8),
}

impl FusionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ItemMismatch { .. } => ErrorCode::ItemMismatch,
            Self::InvalidBias(_) => ErrorCode::InvalidBias,
        }
    }
}

/// Immutable parameters of one fusion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFusionConfig")]
pub struct FusionConfig {
    combine: CombineMode,
    bias_primary: u8,
}

#[derive(Deserialize)]
struct RawFusionConfig {
    #[serde(default)]
    combine: CombineMode,
    #[serde(default = "default_bias_primary")]
    bias_primary: u8,
}

impl TryFrom<RawFusionConfig> for FusionConfig {
    type Error = FusionError;

    fn try_from(raw: RawFusionConfig) -> Result<Self, Self::Error> {
        Self::new(raw.combine, raw.bias_primary)
    }
}

impl FusionConfig {
    /// Highest accepted primary bias; also the sum of both biases.
    pub const BIAS_TOTAL: u8 = 100;

    /// # Errors
    ///
    /// Returns [`FusionError::InvalidBias`] when `bias_primary > 100`.
    pub fn new(combine: CombineMode, bias_primary: u8) -> Result<Self, FusionError> {
        if bias_primary > Self::BIAS_TOTAL {
            return Err(FusionError::InvalidBias(bias_primary));
        }
        Ok(Self {
            combine,
            bias_primary,
        })
    }

    #[must_use]
    pub const fn combine(&self) -> CombineMode {
        self.combine
    }

    #[must_use]
    pub const fn bias_primary(&self) -> u8 {
        self.bias_primary
    }

    #[must_use]
    pub const fn bias_secondary(&self) -> u8 {
        Self::BIAS_TOTAL - self.bias_primary
    }

    /// Score of an item ranked `rank_primary` and `rank_secondary` (both 1-based).
    #[must_use]
    pub const fn score(&self, rank_primary: u64, rank_secondary: u64) -> u64 {
        let weight_primary = rank_primary * self.bias_primary as u64;
        let weight_secondary = rank_secondary * self.bias_secondary() as u64;
        match self.combine {
            CombineMode::Add => weight_primary + weight_secondary,
            CombineMode::Multiply => weight_primary * weight_secondary,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            combine: CombineMode::Add,
            bias_primary: default_bias_primary(),
        }
    }
}

const fn default_bias_primary() -> u8 {
    50
}

/// One gene with its fused score and the ranks it was scored from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: String,
    pub score: u64,
    /// 1-based rank in the primary ranking.
    pub rank_primary: usize,
    /// 1-based rank in the secondary ranking.
    pub rank_secondary: usize,
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

/// Fuse two rankings and return every item with its score, best first.
///
/// Ordering is by ascending score, ties broken by primary rank.
///
/// # Errors
///
/// Returns [`FusionError::ItemMismatch`] when an item of either ranking is
/// absent from the other.
pub fn fuse_scored(
    primary: &Ranking,
    secondary: &Ranking,
    config: FusionConfig,
) -> Result<Vec<ScoredItem>, FusionError> {
    let secondary_index = secondary.position_index();
    check_same_universe(primary, secondary, &secondary_index)?;

    let mut scored: Vec<ScoredItem> = Vec::with_capacity(primary.len());
    for (idx, item) in primary.iter().enumerate() {
        let rank_primary = idx + 1;
        let rank_secondary = secondary_index
            .rank(item)
            .ok_or_else(|| FusionError::ItemMismatch {
                item: item.to_string(),
                missing_from: Side::Secondary,
            })?;
        scored.push(ScoredItem {
            item: item.to_string(),
            score: config.score(rank_primary as u64, rank_secondary as u64),
            rank_primary,
            rank_secondary,
        });
    }

    // Primary ranks are unique, so this key is a total order: ties on score
    // fall back to the primary ranking.
    scored.sort_unstable_by_key(|s| (s.score, s.rank_primary));

    debug!(
        items = scored.len(),
        combine = %config.combine(),
        bias_primary = config.bias_primary(),
        "fused rankings"
    );

    Ok(scored)
}

/// Fuse two rankings of the same item set into one ranking.
///
/// # Errors
///
/// Returns [`FusionError::ItemMismatch`] when the rankings disagree on their items.
pub fn fuse(
    primary: &Ranking,
    secondary: &Ranking,
    config: FusionConfig,
) -> Result<Ranking, FusionError> {
    let scored = fuse_scored(primary, secondary, config)?;
    Ok(Ranking::from_distinct(
        scored.into_iter().map(|s| s.item).collect(),
    ))
}

/// Rankings are duplicate-free, so equal lengths plus "every primary item is in
/// the secondary" means equal sets. With unequal lengths, name an item the
/// shorter side lacks.
fn check_same_universe(
    primary: &Ranking,
    secondary: &Ranking,
    secondary_index: &PositionIndex<'_>,
) -> Result<(), FusionError> {
    if let Some(item) = primary.iter().find(|item| !secondary_index.contains(item)) {
        return Err(FusionError::ItemMismatch {
            item: item.to_string(),
            missing_from: Side::Secondary,
        });
    }

    if primary.len() != secondary.len() {
        let primary_index = primary.position_index();
        if let Some(item) = secondary.iter().find(|item| !primary_index.contains(item)) {
            return Err(FusionError::ItemMismatch {
                item: item.to_string(),
                missing_from: Side::Primary,
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(items: &[&str]) -> Ranking {
        Ranking::new(items.iter().copied()).expect("distinct items")
    }

    fn config(combine: CombineMode, bias: u8) -> FusionConfig {
        FusionConfig::new(combine, bias).expect("valid bias")
    }

    // -----------------------------------------------------------------------
    // FusionConfig
    // -----------------------------------------------------------------------

    #[test]
    fn config_defaults_match_equal_weighting() {
        let cfg = FusionConfig::default();
        assert_eq!(cfg.combine(), CombineMode::Add);
        assert_eq!(cfg.bias_primary(), 50);
        assert_eq!(cfg.bias_secondary(), 50);
    }

    #[test]
    fn config_rejects_bias_above_100() {
        assert_eq!(
            FusionConfig::new(CombineMode::Add, 101),
            Err(FusionError::InvalidBias(101))
        );
        assert!(FusionConfig::new(CombineMode::Multiply, 100).is_ok());
        assert!(FusionConfig::new(CombineMode::Multiply, 0).is_ok());
    }

    #[test]
    fn config_deserializes_and_validates() {
        let cfg: FusionConfig =
            toml::from_str("combine = \"multiply\"\nbias_primary = 70").expect("parse");
        assert_eq!(cfg.combine(), CombineMode::Multiply);
        assert_eq!(cfg.bias_secondary(), 30);

        let defaults: FusionConfig = toml::from_str("").expect("parse empty");
        assert_eq!(defaults, FusionConfig::default());

        assert!(toml::from_str::<FusionConfig>("bias_primary = 150").is_err());
    }

    #[test]
    fn score_add_and_multiply() {
        assert_eq!(config(CombineMode::Add, 50).score(1, 2), 150);
        assert_eq!(config(CombineMode::Multiply, 50).score(1, 2), 5_000);
        assert_eq!(config(CombineMode::Add, 80).score(3, 1), 260);
    }

    // -----------------------------------------------------------------------
    // fuse
    // -----------------------------------------------------------------------

    #[test]
    fn worked_example_add_50() {
        let a = ranking(&["g1", "g2", "g3"]);
        let b = ranking(&["g3", "g1", "g2"]);

        let scored = fuse_scored(&a, &b, config(CombineMode::Add, 50)).expect("fuse");
        let order: Vec<_> = scored.iter().map(|s| s.item.as_str()).collect();
        assert_eq!(order, vec!["g1", "g3", "g2"]);

        // g1: 50 + 100, g3: 150 + 50, g2: 100 + 150
        let scores: Vec<_> = scored.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![150, 200, 250]);
        assert_eq!(scored[1].rank_primary, 3);
        assert_eq!(scored[1].rank_secondary, 1);
    }

    #[test]
    fn ties_follow_primary_order() {
        // a: (1,2) -> 150, b: (2,1) -> 150. Tie broken by primary.
        let a = ranking(&["a", "b"]);
        let b = ranking(&["b", "a"]);
        let fused = fuse(&a, &b, config(CombineMode::Add, 50)).expect("fuse");
        assert_eq!(fused.items(), ["a", "b"]);

        let fused_rev = fuse(&b, &a, config(CombineMode::Add, 50)).expect("fuse");
        assert_eq!(fused_rev.items(), ["b", "a"]);
    }

    #[test]
    fn multiply_uses_product_of_weights() {
        // x: (1,3) -> 50*150 = 7500, y: (2,2) -> 100*100 = 10000, z: (3,1) -> 150*50 = 7500
        let a = ranking(&["x", "y", "z"]);
        let b = ranking(&["z", "y", "x"]);
        let fused = fuse(&a, &b, config(CombineMode::Multiply, 50)).expect("fuse");
        assert_eq!(fused.items(), ["x", "z", "y"]);
    }

    #[test]
    fn zero_bias_follows_secondary() {
        let a = ranking(&["a", "b", "c"]);
        let b = ranking(&["c", "a", "b"]);
        let fused = fuse(&a, &b, config(CombineMode::Add, 0)).expect("fuse");
        assert_eq!(fused, b);
    }

    #[test]
    fn full_bias_follows_primary_in_both_modes() {
        let a = ranking(&["a", "b", "c", "d"]);
        let b = ranking(&["d", "c", "b", "a"]);
        assert_eq!(fuse(&a, &b, config(CombineMode::Add, 100)).expect("fuse"), a);
        assert_eq!(
            fuse(&a, &b, config(CombineMode::Multiply, 100)).expect("fuse"),
            a
        );
    }

    #[test]
    fn empty_rankings_fuse_to_empty() {
        let empty = ranking(&[]);
        let fused = fuse(&empty, &empty, FusionConfig::default()).expect("fuse");
        assert!(fused.is_empty());
    }

    #[test]
    fn missing_from_secondary_is_reported() {
        let a = ranking(&["a", "b", "c"]);
        let b = ranking(&["a", "b", "x"]);
        let err = fuse(&a, &b, FusionConfig::default()).expect_err("mismatch");
        assert_eq!(
            err,
            FusionError::ItemMismatch {
                item: "c".into(),
                missing_from: Side::Secondary,
            }
        );
        assert_eq!(err.code(), ErrorCode::ItemMismatch);
    }

    #[test]
    fn missing_from_primary_is_reported() {
        let a = ranking(&["a", "b"]);
        let b = ranking(&["b", "extra", "a"]);
        let err = fuse(&a, &b, FusionConfig::default()).expect_err("mismatch");
        assert_eq!(
            err,
            FusionError::ItemMismatch {
                item: "extra".into(),
                missing_from: Side::Primary,
            }
        );
        assert!(err.to_string().contains("extra"));
        assert!(err.to_string().contains("primary"));
    }
}
