use std::fmt;

use crate::eval::EvalError;
use crate::fusion::FusionError;
use crate::ranking::DuplicateItem;
use crate::store::SourceError;

/// Machine-readable error codes shared by the library and the `gf` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigUnreadable,
    InvalidBias,
    ItemMismatch,
    DuplicateItem,
    QueryItemNotFound,
    DuplicateCase,
    UnknownGroup,
    NoData,
    EmptyCurve,
    SourceReadFailed,
    SourceMalformed,
    WorkerPoolFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigUnreadable => "E1001",
            Self::InvalidBias => "E1002",
            Self::ItemMismatch => "E2001",
            Self::DuplicateItem => "E2002",
            Self::QueryItemNotFound => "E3001",
            Self::DuplicateCase => "E3002",
            Self::UnknownGroup => "E3003",
            Self::NoData => "E4001",
            Self::EmptyCurve => "E4002",
            Self::SourceReadFailed => "E5001",
            Self::SourceMalformed => "E5002",
            Self::WorkerPoolFailed => "E6001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigUnreadable => "Config file could not be read",
            Self::InvalidBias => "Fusion bias out of range",
            Self::ItemMismatch => "Rankings disagree on their items",
            Self::DuplicateItem => "Ranking repeats an item",
            Self::QueryItemNotFound => "Query item missing from ranking",
            Self::DuplicateCase => "Case recorded twice",
            Self::UnknownGroup => "Unknown group",
            Self::NoData => "No cases recorded",
            Self::EmptyCurve => "Curve has too few points",
            Self::SourceReadFailed => "Input file could not be read",
            Self::SourceMalformed => "Input file is malformed",
            Self::WorkerPoolFailed => "Worker pool could not be started",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigUnreadable => Some("Fix syntax in genefuse.toml and retry."),
            Self::InvalidBias => Some("Use a primary bias between 0 and 100."),
            Self::ItemMismatch => {
                Some("Both rankings of a case must be computed over the same gene universe.")
            }
            Self::DuplicateItem => Some("Remove the repeated gene from the ranking file."),
            Self::QueryItemNotFound => {
                Some("Check the test gene file, or use --keep-seeds if it is also a seed.")
            }
            Self::DuplicateCase => Some("Each test gene may appear once per disease."),
            Self::UnknownGroup | Self::NoData => None,
            Self::EmptyCurve => Some("Use a max threshold of at least 2."),
            Self::SourceReadFailed => Some("Check that the seed directory layout is complete."),
            Self::SourceMalformed => {
                Some("Files hold one gene per line, extra columns tab-separated.")
            }
            Self::WorkerPoolFailed => Some("Lower --threads or run with --serial."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Any error raised by the genefuse library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    Ranking(#[from] DuplicateItem),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Fusion(err) => err.code(),
            Self::Ranking(_) => ErrorCode::DuplicateItem,
            Self::Eval(err) => err.code(),
            Self::Source(err) => err.code(),
            Self::WorkerPool(_) => ErrorCode::WorkerPoolFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 12] = [
        ErrorCode::ConfigUnreadable,
        ErrorCode::InvalidBias,
        ErrorCode::ItemMismatch,
        ErrorCode::DuplicateItem,
        ErrorCode::QueryItemNotFound,
        ErrorCode::DuplicateCase,
        ErrorCode::UnknownGroup,
        ErrorCode::NoData,
        ErrorCode::EmptyCurve,
        ErrorCode::SourceReadFailed,
        ErrorCode::SourceMalformed,
        ErrorCode::WorkerPoolFailed,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::EmptyCurve.to_string(), "E4002");
    }
}
