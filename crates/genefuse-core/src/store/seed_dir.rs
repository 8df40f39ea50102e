use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{
    GroundTruthSource, RankingSource, ResultSink, SourceError, parse_ranking, read_identifiers,
    write_ranking,
};
use crate::ranking::{CaseIdentifier, Ranking};

/// A seed directory: one subdirectory per group holding, for case `N`,
///
/// ```text
/// <root>/<group>/<group>_seed<N>.txt       seed genes
/// <root>/<group>/<group>_test_gene<N>.txt  held-out gene
/// <root>/<group>/seed<N>_rank.txt          ranking
/// ```
///
/// The same layout serves as ranking source for fusion inputs, ground truth
/// for evaluation, and sink for fused output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedDirectory {
    root: PathBuf,
}

impl SeedDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.root.join(group)
    }

    #[must_use]
    pub fn seed_path(&self, case: &CaseIdentifier) -> PathBuf {
        self.group_dir(&case.group)
            .join(format!("{}_seed{}.txt", case.group, case.index))
    }

    #[must_use]
    pub fn query_path(&self, case: &CaseIdentifier) -> PathBuf {
        self.group_dir(&case.group)
            .join(format!("{}_test_gene{}.txt", case.group, case.index))
    }

    #[must_use]
    pub fn ranking_path(&self, case: &CaseIdentifier) -> PathBuf {
        self.group_dir(&case.group)
            .join(format!("seed{}_rank.txt", case.index))
    }

    /// Every case with a `<group>_seed<N>.txt` file, sorted by group then index.
    ///
    /// Entries that are not directories, and files that do not follow the
    /// naming scheme, are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] when the root or a group directory cannot
    /// be listed.
    pub fn discover_cases(&self) -> Result<Vec<CaseIdentifier>, SourceError> {
        let mut cases = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|err| SourceError::io(&self.root, err))? {
            let entry = entry.map_err(|err| SourceError::io(&self.root, err))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(group) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            let prefix = format!("{group}_seed");
            for file in fs::read_dir(&path).map_err(|err| SourceError::io(&path, err))? {
                let file = file.map_err(|err| SourceError::io(&path, err))?;
                let name = file.file_name();
                let Some(index) = name
                    .to_str()
                    .and_then(|name| name.strip_prefix(&prefix))
                    .and_then(|rest| rest.strip_suffix(".txt"))
                    .and_then(|index| index.parse::<u32>().ok())
                else {
                    continue;
                };
                cases.push(CaseIdentifier::new(group, index));
            }
        }
        cases.sort();
        debug!(root = %self.root.display(), cases = cases.len(), "discovered cases");
        Ok(cases)
    }

    fn open(path: &Path) -> Result<BufReader<File>, SourceError> {
        File::open(path)
            .map(BufReader::new)
            .map_err(|err| SourceError::io(path, err))
    }
}

impl RankingSource for SeedDirectory {
    fn load_ranking(&self, case: &CaseIdentifier) -> Result<Ranking, SourceError> {
        let path = self.ranking_path(case);
        parse_ranking(Self::open(&path)?, &path)
    }
}

impl GroundTruthSource for SeedDirectory {
    fn load_query_item(&self, case: &CaseIdentifier) -> Result<String, SourceError> {
        let path = self.query_path(case);
        read_identifiers(Self::open(&path)?)
            .map_err(|err| SourceError::io(&path, err))?
            .into_iter()
            .next()
            .ok_or(SourceError::Empty { path })
    }

    fn load_excluded_items(&self, case: &CaseIdentifier) -> Result<HashSet<String>, SourceError> {
        let path = self.seed_path(case);
        let ids = read_identifiers(Self::open(&path)?).map_err(|err| SourceError::io(&path, err))?;
        Ok(ids.into_iter().collect())
    }
}

impl ResultSink for SeedDirectory {
    fn store_ranking(&self, case: &CaseIdentifier, ranking: &Ranking) -> Result<(), SourceError> {
        let dir = self.group_dir(&case.group);
        fs::create_dir_all(&dir).map_err(|err| SourceError::io(&dir, err))?;
        let path = self.ranking_path(case);
        let file = File::create(&path).map_err(|err| SourceError::io(&path, err))?;
        write_ranking(BufWriter::new(file), ranking).map_err(|err| SourceError::io(&path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn paths_follow_layout() {
        let dir = SeedDirectory::new("/data");
        let case = CaseIdentifier::new("asthma", 3);
        assert_eq!(dir.seed_path(&case), Path::new("/data/asthma/asthma_seed3.txt"));
        assert_eq!(
            dir.query_path(&case),
            Path::new("/data/asthma/asthma_test_gene3.txt")
        );
        assert_eq!(dir.ranking_path(&case), Path::new("/data/asthma/seed3_rank.txt"));
    }

    #[test]
    fn discover_cases_sorted_and_filtered() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        write(&root.join("b/b_seed1.txt"), "x\n");
        write(&root.join("a/a_seed10.txt"), "x\n");
        write(&root.join("a/a_seed2.txt"), "x\n");
        write(&root.join("a/a_test_gene2.txt"), "x\n");
        write(&root.join("a/seed2_rank.txt"), "x\n");
        write(&root.join("a/notes.txt"), "x\n");
        write(&root.join("stray.txt"), "x\n");

        let cases = SeedDirectory::new(root).discover_cases().expect("discover");
        assert_eq!(
            cases,
            vec![
                CaseIdentifier::new("a", 2),
                CaseIdentifier::new("a", 10),
                CaseIdentifier::new("b", 1),
            ]
        );
    }

    #[test]
    fn discover_missing_root_fails() {
        let tmp = TempDir::new().expect("tmp");
        let err = SeedDirectory::new(tmp.path().join("nope"))
            .discover_cases()
            .expect_err("missing");
        assert!(err.is_not_found());
    }

    #[test]
    fn ground_truth_reads_first_fields() {
        let tmp = TempDir::new().expect("tmp");
        let dir = SeedDirectory::new(tmp.path());
        let case = CaseIdentifier::new("d", 1);
        write(&dir.query_path(&case), "TP53\t1\n");
        write(&dir.seed_path(&case), "BRCA1\tx\nBRCA2\n\n");

        assert_eq!(dir.load_query_item(&case).expect("query"), "TP53");
        let seeds = dir.load_excluded_items(&case).expect("seeds");
        assert_eq!(seeds.len(), 2);
        assert!(seeds.contains("BRCA1"));
    }

    #[test]
    fn empty_query_file_is_malformed() {
        let tmp = TempDir::new().expect("tmp");
        let dir = SeedDirectory::new(tmp.path());
        let case = CaseIdentifier::new("d", 1);
        write(&dir.query_path(&case), "\n");
        assert!(matches!(
            dir.load_query_item(&case),
            Err(SourceError::Empty { .. })
        ));
    }

    #[test]
    fn repeated_gene_in_ranking_reports_duplicate_item() {
        let tmp = TempDir::new().expect("tmp");
        let dir = SeedDirectory::new(tmp.path());
        let case = CaseIdentifier::new("d", 1);
        write(&dir.ranking_path(&case), "a\nb\na\n");

        let err = crate::Error::from(dir.load_ranking(&case).expect_err("duplicate"));
        assert_eq!(err.code(), crate::ErrorCode::DuplicateItem);
        assert_eq!(err.code().code(), "E2002");
    }

    #[test]
    fn store_creates_group_dir() {
        let tmp = TempDir::new().expect("tmp");
        let dir = SeedDirectory::new(tmp.path().join("out"));
        let case = CaseIdentifier::new("fresh", 4);
        let ranking = Ranking::new(["g2", "g1"]).expect("distinct");

        dir.store_ranking(&case, &ranking).expect("store");
        assert_eq!(
            fs::read_to_string(dir.ranking_path(&case)).expect("read"),
            "g2\ng1\n"
        );
        assert_eq!(dir.load_ranking(&case).expect("load"), ranking);
    }
}
