use thiserror::Error;

pub type SegResult<T> = std::result::Result<T, SegError>;

/// Everything the build/solve entry points can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegError {
    /// The request itself is inconsistent. Raised before any arc is built.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The caller broke a contract of the graph or solver API.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The constraints admit no surface; the cut left column `column` of
    /// surface `surface` without a level.
    #[error("surface {surface} is infeasible: column {column:?} has no level")]
    Infeasible { surface: usize, column: [usize; 2] },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("volume extent must be non-zero, got {w}x{h}x{d}")]
    EmptyExtent { w: usize, h: usize, d: usize },

    #[error("request has neither surfaces nor regions")]
    NothingToSolve,

    #[error("{what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("{what} index {index} out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    #[error("invalid surface relation ({k0}, {k1}, {r0}, {r1}): {reason}")]
    InvalidRelation {
        k0: usize,
        k1: usize,
        r0: i32,
        r1: i32,
        reason: &'static str,
    },

    #[error("surfaces {k0} and {k1} must share a scan direction to be related")]
    RelationDirectionMismatch { k0: usize, k1: usize },

    #[error("margin propagation did not converge after {passes} passes (cyclic relations)")]
    MarginsDiverged { passes: usize },

    #[error("surface {surface} has an empty feasible range [{lo}, {hi}]")]
    EmptyMargin { surface: usize, lo: i32, hi: i32 },

    #[error("surface {surface}: {reason}")]
    BadSurface { surface: usize, reason: String },

    #[error("region {region}: {reason}")]
    BadRegion { region: usize, reason: String },
}
