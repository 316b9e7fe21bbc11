//! Error types for the verification harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, XcorrError>;

/// Errors that can occur while driving the accelerator.
///
/// Only [`XcorrError::ResourceUnavailable`] is unconditionally fatal; the
/// protocol-level kinds (`PollTimeout`, `Desync`) are non-fatal under the
/// default lenient fault policy and merely logged and counted.
#[derive(Debug, Error)]
pub enum XcorrError {
    /// A memory-mapped region could not be set up.
    #[error("Cannot map {path}: {reason}")]
    ResourceUnavailable {
        /// Device path that failed to map (usually /dev/mem).
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// A polled condition never came true within the attempt budget.
    #[error("{condition} not satisfied after {budget} attempts (last observed {observed})")]
    PollTimeout {
        /// Human-readable condition name.
        condition: &'static str,
        /// Attempt budget that was exhausted.
        budget: u32,
        /// Last value observed while polling.
        observed: u32,
    },

    /// The device's response word count does not match the protocol's.
    #[error("response desync: expected {expected} words, device has {available}")]
    Desync {
        /// Word count the protocol expected to drain.
        expected: u32,
        /// Word count the device actually reported.
        available: u32,
    },

    /// A payload vector length is not a multiple of the 4-lane word width.
    #[error("{vector} length {len} is not a multiple of 4")]
    UnalignedPayload {
        /// Which vector violated the precondition ("A" or "V").
        vector: &'static str,
        /// Offending element count.
        len: usize,
    },

    /// Reference data could not be read or parsed.
    #[error("reference data error: {reason}")]
    ReferenceData {
        /// Reason for failure.
        reason: String,
    },

    /// I/O error during file access.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl XcorrError {
    /// Create a resource-unavailable error.
    pub fn resource_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a reference-data error.
    pub fn reference_data(reason: impl Into<String>) -> Self {
        Self::ReferenceData {
            reason: reason.into(),
        }
    }

    /// Whether this error is tolerable under the lenient fault policy.
    ///
    /// Timeouts and desyncs are observational under lenient mode; everything
    /// else aborts the session regardless of policy.
    pub const fn is_protocol_fault(&self) -> bool {
        matches!(self, Self::PollTimeout { .. } | Self::Desync { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_faults_are_classified() {
        let timeout = XcorrError::PollTimeout {
            condition: "rx occupancy",
            budget: 10,
            observed: 0,
        };
        let desync = XcorrError::Desync {
            expected: 4,
            available: 2,
        };
        let fatal = XcorrError::resource_unavailable("/dev/mem", "permission denied");

        assert!(timeout.is_protocol_fault());
        assert!(desync.is_protocol_fault());
        assert!(!fatal.is_protocol_fault());
    }
}
