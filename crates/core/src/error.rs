use thiserror::Error;

/// Every failure the bridge reports to its caller.
///
/// Input validation and lifecycle errors are raised before any kernel entry
/// point runs. Kernel-reported outcomes such as infeasibility are not errors;
/// they surface through the solve status.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error("invalid matrix shape: {0}")]
    InvalidMatrixShape(String),
    #[error("empty {0} buffer for a matrix with nonzero entries")]
    EmptyMatrixBuffer(&'static str),
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("lower bound exceeds upper bound at row {index}")]
    InvalidBounds { index: usize },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("workspace has no problem data bound")]
    NotConfigured,
    #[error("workspace is already configured")]
    AlreadyConfigured,
    #[error("no solution available before solve")]
    NoSolutionAvailable,
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
    /// The kernel rejected setup or a matrix/settings update, e.g. a failed
    /// factorisation.
    #[error("kernel failure: {0}")]
    Kernel(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn shape(what: &'static str, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            found,
        }
    }

    /// True for errors raised by caller misuse of the workspace state machine.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured | Self::AlreadyConfigured | Self::NoSolutionAvailable
        )
    }
}
