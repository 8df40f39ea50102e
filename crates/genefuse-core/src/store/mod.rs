//! Collaborator seams for loading rankings and ground truth and for persisting
//! fused rankings.
//!
//! The core algorithms never touch the filesystem. Drivers hand them data
//! loaded through these traits; [`SeedDirectory`] is the on-disk
//! implementation.
//!
//! # Line format
//!
//! One identifier per line, best first. Only the first tab-separated field
//! counts, so score columns are ignored. Blank lines are skipped and a trailing
//! `\r` is stripped.

mod seed_dir;

use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;
use crate::ranking::{CaseIdentifier, DuplicateItem, Ranking};

pub use seed_dir::SeedDirectory;

/// Failure to read or write a collaborator file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    DuplicateItem {
        path: PathBuf,
        #[source]
        source: DuplicateItem,
    },

    /// A file that must name at least one identifier names none.
    #[error("{} contains no identifier", path.display())]
    Empty { path: PathBuf },
}

impl SourceError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::SourceReadFailed,
            Self::DuplicateItem { .. } => ErrorCode::DuplicateItem,
            Self::Empty { .. } => ErrorCode::SourceMalformed,
        }
    }

    /// True when the underlying file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Supplies the ranking to fuse or evaluate for a case.
pub trait RankingSource {
    /// # Errors
    ///
    /// Returns [`SourceError`] when the ranking cannot be read or repeats an item.
    fn load_ranking(&self, case: &CaseIdentifier) -> Result<Ranking, SourceError>;
}

/// Supplies the held-out gene and the seed genes of a case.
pub trait GroundTruthSource {
    /// # Errors
    ///
    /// Returns [`SourceError`] when the query item cannot be read.
    fn load_query_item(&self, case: &CaseIdentifier) -> Result<String, SourceError>;

    /// # Errors
    ///
    /// Returns [`SourceError`] when the seed list cannot be read.
    fn load_excluded_items(&self, case: &CaseIdentifier) -> Result<HashSet<String>, SourceError>;
}

/// Persists a fused ranking.
pub trait ResultSink {
    /// # Errors
    ///
    /// Returns [`SourceError`] when the ranking cannot be written.
    fn store_ranking(&self, case: &CaseIdentifier, ranking: &Ranking) -> Result<(), SourceError>;
}

/// Identifier carried by one line, if any.
fn line_identifier(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let id = line.split('\t').next()?.trim();
    (!id.is_empty()).then_some(id)
}

/// Read every identifier in line format, in order.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn read_identifiers<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut ids = Vec::new();
    for line in reader.lines() {
        if let Some(id) = line_identifier(&line?) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Read a ranking in line format from `reader`; `path` labels errors.
///
/// # Errors
///
/// Returns [`SourceError::Io`] on read failure and
/// [`SourceError::DuplicateItem`] when an identifier repeats.
pub fn parse_ranking<R: BufRead>(reader: R, path: &Path) -> Result<Ranking, SourceError> {
    let ids = read_identifiers(reader).map_err(|err| SourceError::io(path, err))?;
    Ranking::new(ids).map_err(|source| SourceError::DuplicateItem {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `ranking` in line format.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_ranking<W: Write>(mut writer: W, ranking: &Ranking) -> io::Result<()> {
    for item in ranking.iter() {
        writeln!(writer, "{item}")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tab_field_is_the_identifier() {
        let input = "YAL001C\t0.93\nYBR002W\t0.41\n";
        let ids = read_identifiers(input.as_bytes()).expect("read");
        assert_eq!(ids, vec!["YAL001C", "YBR002W"]);
    }

    #[test]
    fn blank_lines_and_carriage_returns_are_ignored() {
        let input = "a\r\n\r\n\nb\n  \nc";
        let ids = read_identifiers(input.as_bytes()).expect("read");
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_ranking_reports_duplicates_with_path() {
        let err = parse_ranking("a\nb\na\n".as_bytes(), Path::new("d/seed1_rank.txt"))
            .expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::DuplicateItem);
        assert!(err.to_string().contains("d/seed1_rank.txt"));
        assert!(err.to_string().contains("positions 1 and 3"));
    }

    #[test]
    fn write_then_parse_preserves_order() {
        let ranking = Ranking::new(["g3", "g1", "g2"]).expect("distinct");
        let mut buf = Vec::new();
        write_ranking(&mut buf, &ranking).expect("write");
        assert_eq!(String::from_utf8(buf.clone()).expect("utf8"), "g3\ng1\ng2\n");
        let parsed = parse_ranking(buf.as_slice(), Path::new("mem")).expect("parse");
        assert_eq!(parsed, ranking);
    }

    #[test]
    fn not_found_is_detected() {
        let err = SourceError::io(
            Path::new("missing.txt"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        assert_eq!(err.code(), ErrorCode::SourceReadFailed);
    }
}
