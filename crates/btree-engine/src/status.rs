//! Status returned by behavior nodes.

use std::fmt;

/// The reason a node failed.
///
/// `Childless` and `GuardFailed` are structural: they come from the engine,
/// not from leaf logic. `Custom` carries user-defined codes.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Generic failure.
    #[default]
    Error,
    /// A branch was entered without children.
    Childless,
    /// The node's guard did not succeed, so it never entered.
    GuardFailed,
    /// Application-defined failure code.
    Custom(u16),
}

/// The state of a node's current (or last) run.
///
/// A node starts as `New`, becomes `Running` on enter and ends in one of the
/// terminal states: `Success`, `Failure(_)` or `Cancelled`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// Never entered since construction or the last reset.
    #[default]
    New,
    /// Entered and not yet completed.
    Running,
    /// Completed successfully.
    Success,
    /// Stopped by a cancellation request.
    Cancelled,
    /// Completed with a failure.
    Failure(FailureKind),
}

impl Status {
    /// Generic failure.
    pub const ERROR: Status = Status::Failure(FailureKind::Error);
    /// Failure of a branch entered without children.
    pub const CHILDLESS: Status = Status::Failure(FailureKind::Childless);
    /// Failure of a node whose guard blocked it.
    pub const GUARD_FAILED: Status = Status::Failure(FailureKind::GuardFailed);

    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` for `Success`, `Failure(_)` and `Cancelled`.
    #[inline]
    pub fn is_completed(self) -> bool {
        matches!(
            self,
            Status::Success | Status::Cancelled | Status::Failure(_)
        )
    }

    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure(_))
    }

    #[inline]
    pub fn is_cancelled(self) -> bool {
        matches!(self, Status::Cancelled)
    }

    /// Converts any status into a failure.
    ///
    /// A status that already carries a failure reason keeps it; everything
    /// else becomes `Failure(default)`.
    #[inline]
    pub fn to_failure(self, default: FailureKind) -> Status {
        match self {
            Status::Failure(kind) => Status::Failure(kind),
            _ => Status::Failure(default),
        }
    }

    /// Swaps success and failure. Other states are returned unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::ERROR,
            Status::Failure(_) => Status::Success,
            other => other,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::New => f.write_str("new"),
            Status::Running => f.write_str("running"),
            Status::Success => f.write_str("success"),
            Status::Cancelled => f.write_str("cancelled"),
            Status::Failure(kind) => write!(f, "failure({kind})"),
        }
    }
}
