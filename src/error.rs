//! Error types for trace consumption and graph construction.
//!
//! The builder assumes a well-formed trace from a trusted instrumentor.
//! Every error here is fatal: once a record fails to parse or an internal
//! invariant breaks, the accumulated liveness state is unusable and the
//! build aborts. A trace truncated by early EOF is *not* an error; the
//! builder emits whatever graph has accumulated.

use thiserror::Error;

/// Fatal error raised while building a dependence graph from a trace.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The underlying trace stream failed.
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record did not match the expected field layout.
    #[error("trace corrupt at line {line}: {reason}")]
    TraceCorrupt {
        /// 1-based physical line number in the trace stream.
        line: u64,
        /// What failed to parse.
        reason: String,
    },

    /// A record was well-formed but violated a builder invariant
    /// (e.g. a result record naming a non-register destination, or a
    /// forward record outside a call/DMA/trig instruction).
    #[error("invariant violated at line {line}: {reason}")]
    InvariantViolation {
        /// 1-based physical line number in the trace stream.
        line: u64,
        /// Which invariant broke.
        reason: String,
    },

    /// A floating-point value carried a size other than 4 or 8 bytes.
    #[error("unsupported floating-point size: {size} bytes")]
    UnsupportedFpSize {
        /// The offending size in bytes.
        size: u32,
    },
}

impl BuildError {
    /// Shorthand for a corrupt-record error.
    pub(crate) fn corrupt(line: u64, reason: impl Into<String>) -> Self {
        Self::TraceCorrupt {
            line,
            reason: reason.into(),
        }
    }

    /// Shorthand for an invariant-violation error.
    pub(crate) fn invariant(line: u64, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            line,
            reason: reason.into(),
        }
    }
}
