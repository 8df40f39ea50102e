//! Rankings: ordered, duplicate-free lists of gene identifiers, best first.
//!
//! Every rank lookup in the crate goes through a [`PositionIndex`] built once
//! per ranking, so fusion and evaluation stay O(1) per item instead of
//! scanning the list for each gene.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A ranking repeated an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ranking lists {item} more than once (positions {first} and {second})")]
pub struct DuplicateItem {
    pub item: String,
    /// 1-based rank of the first occurrence.
    pub first: usize,
    /// 1-based rank of the repeated occurrence.
    pub second: usize,
}

/// Ordered sequence of distinct item identifiers. Rank is `position + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Ranking {
    items: Vec<String>,
}

impl Ranking {
    /// Build a ranking, rejecting repeated identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateItem`] naming the first identifier that appears twice.
    pub fn new<I, S>(items: I) -> Result<Self, DuplicateItem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if let Some(&first) = seen.get(item.as_str()) {
                return Err(DuplicateItem {
                    item: item.clone(),
                    first: first + 1,
                    second: idx + 1,
                });
            }
            seen.insert(item.as_str(), idx);
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Build the item → position lookup for this ranking.
    #[must_use]
    pub fn position_index(&self) -> PositionIndex<'_> {
        PositionIndex::new(self)
    }

    /// Drop every item for which `keep` returns false, preserving order.
    ///
    /// Later items move up, so their ranks shrink accordingly.
    #[must_use]
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|item| keep(item.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Wrap items already known to be distinct.
    pub(crate) const fn from_distinct(items: Vec<String>) -> Self {
        Self { items }
    }
}

impl TryFrom<Vec<String>> for Ranking {
    type Error = DuplicateItem;

    fn try_from(items: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl From<Ranking> for Vec<String> {
    fn from(ranking: Ranking) -> Self {
        ranking.items
    }
}

/// Item → 0-based position lookup borrowed from a [`Ranking`].
#[derive(Debug, Clone)]
pub struct PositionIndex<'a> {
    positions: HashMap<&'a str, usize>,
}

impl<'a> PositionIndex<'a> {
    #[must_use]
    pub fn new(ranking: &'a Ranking) -> Self {
        let positions = ranking
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.as_str(), idx))
            .collect();
        Self { positions }
    }

    /// 0-based position of `item`, if ranked.
    #[must_use]
    pub fn position(&self, item: &str) -> Option<usize> {
        self.positions.get(item).copied()
    }

    /// 1-based rank of `item`, if ranked.
    #[must_use]
    pub fn rank(&self, item: &str) -> Option<usize> {
        self.position(item).map(|idx| idx + 1)
    }

    #[must_use]
    pub fn contains(&self, item: &str) -> bool {
        self.positions.contains_key(item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Identifies one test case: a group (disease) and the seed number inside it.
///
/// Built by loaders from whatever naming scheme they read; the core never
/// derives it from path strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseIdentifier {
    pub group: String,
    pub index: u32,
}

impl CaseIdentifier {
    pub fn new(group: impl Into<String>, index: u32) -> Self {
        Self {
            group: group.into(),
            index,
        }
    }
}

impl fmt::Display for CaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/seed{}", self.group, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_order() {
        let ranking = Ranking::new(["g1", "g2", "g3"]).expect("distinct");
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking.iter().collect::<Vec<_>>(), vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn new_rejects_duplicates() {
        let err = Ranking::new(["g1", "g2", "g1"]).expect_err("duplicate");
        assert_eq!(err.item, "g1");
        assert_eq!(err.first, 1);
        assert_eq!(err.second, 3);
    }

    #[test]
    fn empty_ranking_is_valid() {
        let ranking = Ranking::new(Vec::<String>::new()).expect("empty");
        assert!(ranking.is_empty());
        assert!(ranking.position_index().is_empty());
    }

    #[test]
    fn position_index_ranks_are_one_based() {
        let ranking = Ranking::new(["a", "b", "c"]).expect("distinct");
        let index = ranking.position_index();
        assert_eq!(index.position("a"), Some(0));
        assert_eq!(index.rank("c"), Some(3));
        assert_eq!(index.rank("z"), None);
        assert!(index.contains("b"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn retain_shifts_later_ranks() {
        let ranking = Ranking::new(["a", "b", "c", "d"]).expect("distinct");
        let filtered = ranking.retain(|item| item != "b");
        assert_eq!(filtered.position_index().rank("c"), Some(2));
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn serde_round_trip_rejects_duplicates() {
        let ranking: Ranking = serde_json::from_str(r#"["x","y"]"#).expect("valid");
        assert_eq!(ranking.len(), 2);
        assert!(serde_json::from_str::<Ranking>(r#"["x","x"]"#).is_err());
        assert_eq!(
            serde_json::to_string(&ranking).expect("serialize"),
            r#"["x","y"]"#
        );
    }

    #[test]
    fn case_identifier_display() {
        let id = CaseIdentifier::new("breast_cancer", 4);
        assert_eq!(id.to_string(), "breast_cancer/seed4");
    }

    #[test]
    fn case_identifiers_sort_by_group_then_index() {
        let mut ids = vec![
            CaseIdentifier::new("b", 1),
            CaseIdentifier::new("a", 10),
            CaseIdentifier::new("a", 2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                CaseIdentifier::new("a", 2),
                CaseIdentifier::new("a", 10),
                CaseIdentifier::new("b", 1),
            ]
        );
    }
}
