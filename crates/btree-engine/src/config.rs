use crate::FailureKind;

/// Runtime-tunable behavior of a [`BehaviorTree`](crate::BehaviorTree).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TreeConfig {
    /// Re-enter a completed tree on the next tick instead of reporting the
    /// final status again.
    pub auto_restart: bool,
    /// Failure reason used by force-failure decorators that have no reason
    /// of their own and whose child outcome carries none.
    pub default_failure: FailureKind,
}

impl TreeConfig {
    pub const DEFAULT_AUTO_RESTART: bool = true;
    pub const DEFAULT_FAILURE: FailureKind = FailureKind::Error;

    pub fn new() -> Self {
        Self {
            auto_restart: Self::DEFAULT_AUTO_RESTART,
            default_failure: Self::DEFAULT_FAILURE,
        }
    }

    pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }

    pub fn with_default_failure(mut self, default_failure: FailureKind) -> Self {
        self.default_failure = default_failure;
        self
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}
