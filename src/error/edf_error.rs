use std::fmt;

/// The error kinds a caller of this crate must be able to distinguish.
///
/// Local recovery (over-long string truncation on assignment, out-of-range
/// raw samples being passed through the linear map on read) never surfaces
/// here; everything below is fatal to the read or write call it occurred in.
#[derive(Debug)]
pub enum EdfError {
    /// A fixed-width ASCII header field or a TAL byte sequence did not
    /// parse. `field` names the logical field (e.g. `"physical_minimum"`),
    /// `offset` is the byte offset in the stream where the field started.
    Format {
        field: &'static str,
        offset: u64,
        reason: String,
    },

    /// A data-record's recorded start time was earlier than the time
    /// expected from the previous record, which can never happen in a
    /// well-formed file.
    Order { record_index: usize },

    /// A data-record was non-contiguous with the previous one in a file
    /// whose declared type does not allow gaps (plain EDF or EDF+C).
    Contiguity {
        record_index: usize,
        gap_seconds: f64,
    },

    /// An annotation's encoded byte size exceeds its signal's per-record
    /// budget (`2 * samples_per_record` bytes).
    Capacity {
        signal: String,
        size: usize,
        budget: usize,
    },

    /// A standard signal finished draining its samples before all pending
    /// annotations for the same record could be written.
    Overflow,

    /// `append`/merge was attempted between files whose headers are not
    /// `is_compatible_with` one another.
    IncompatibleHeader,

    /// The underlying byte stream failed.
    Io(std::io::Error),
}

impl fmt::Display for EdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdfError::Format {
                field,
                offset,
                reason,
            } => write!(
                f,
                "malformed field `{field}` at byte offset {offset}: {reason}"
            ),
            EdfError::Order { record_index } => write!(
                f,
                "data-record {record_index} starts earlier than the previous record"
            ),
            EdfError::Contiguity {
                record_index,
                gap_seconds,
            } => write!(
                f,
                "data-record {record_index} is non-contiguous (gap of {gap_seconds}s) in a file type that requires contiguity"
            ),
            EdfError::Capacity {
                signal,
                size,
                budget,
            } => write!(
                f,
                "annotation on signal `{signal}` needs {size} bytes but only {budget} are budgeted per record"
            ),
            EdfError::Overflow => {
                write!(f, "annotations remain after all standard signals drained")
            }
            EdfError::IncompatibleHeader => {
                write!(f, "headers are not compatible for append/merge")
            }
            EdfError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for EdfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EdfError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EdfError {
    fn from(err: std::io::Error) -> Self {
        EdfError::Io(err)
    }
}

impl EdfError {
    pub(crate) fn format(field: &'static str, offset: u64, reason: impl Into<String>) -> Self {
        EdfError::Format {
            field,
            offset,
            reason: reason.into(),
        }
    }
}
