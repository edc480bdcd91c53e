use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

/// Reasons a save state could not be applied.
///
/// Every variant names the section that was being walked so the failure can
/// be surfaced to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The marker after `section` did not hold the expected cookie; the buffer
    /// and the walk are out of step from this point on.
    #[error("save state is out of sync after \"{section}\"; aborting load")]
    Desync { section: String },

    /// A subsystem refused the data it was handed (e.g. a RAM size mismatch).
    #[error("\"{section}\" rejected the saved state")]
    SubsystemFailed { section: String },

    /// The input ended before `section` was complete.
    #[error("save state ended early in \"{section}\" (offset {offset}, input is {len} bytes)")]
    Truncated { section: String, offset: usize, len: usize },
}
