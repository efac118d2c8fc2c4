//! Error types for the contango workspace.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the contango workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Unrecognized header, version, record size or record content.
    #[error("Format error: {0}")]
    Format(String),

    /// The source ended in the middle of a record.
    #[error("Truncated record after {records_decoded} records ({trailing_bytes} trailing bytes)")]
    TruncatedRecord {
        /// Records decoded successfully before the partial tail.
        records_decoded: u64,
        /// Bytes of the incomplete record.
        trailing_bytes: usize,
    },

    /// Timestamp went backwards within a single source.
    #[error("Out-of-order record {index}: timestamp {current} precedes {previous}")]
    OutOfOrder {
        /// Zero-based record index within the source.
        index: u64,
        /// Highest timestamp seen so far (raw microseconds).
        previous: i64,
        /// Offending timestamp (raw microseconds).
        current: i64,
    },

    /// No roll boundary could be determined for a contract pair.
    #[error("Missing roll date between {front} and {back}: {reason}")]
    MissingRollDate {
        front: String,
        back: String,
        reason: String,
    },

    /// Two contracts do not overlap around the roll boundary.
    #[error("Contracts {front} and {back} do not overlap around boundary {boundary}")]
    Overlap {
        front: String,
        back: String,
        /// Boundary timestamp (raw microseconds).
        boundary: i64,
    },

    /// Profile eviction referenced volume that was never added.
    #[error("Window underflow at price tick {price_tick}: bucket holds {held}, eviction needs {evicted}")]
    WindowUnderflow {
        price_tick: i64,
        held: u64,
        evicted: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or inconsistent input).
    #[error("Data error: {0}")]
    Data(String),

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The run was cancelled cooperatively.
    #[error("Cancelled")]
    Cancelled,

    /// Store adapter failure.
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Create a missing roll date error.
    pub fn missing_roll_date(
        front: impl Into<String>,
        back: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MissingRollDate {
            front: front.into(),
            back: back.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a fault in the data or in internal state.
    ///
    /// Every fault ends the stream it was raised on. `Cancelled` is the only
    /// non-fault outcome.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Cancelled)
    }

    /// Whether records decoded before this error are still valid.
    pub fn salvages_partial(&self) -> bool {
        matches!(
            self,
            Error::TruncatedRecord { .. } | Error::OutOfOrder { .. } | Error::Io(_)
        )
    }
}
