//! Decorator behavior nodes.
//!
//! Decorators wrap a single child and re-interpret its result or its running
//! state. They take part in inlining like a branch of width one: while the
//! child runs, the decorator's parent may tick the child (or the child's own
//! inline target) directly.
//!
//! This module provides [`ForceSuccess`], [`ForceFailure`], [`ForceRunning`]
//! and [`Inverter`] (NOT logic). Looping lives in [`crate::looping`].

use std::any::Any;

use crate::error::Result;
use crate::{Behavior, FailureKind, Status, TickContext};

/// Steps the decorated child through the decorator's inline cache.
///
/// Returns `None` when the decorator has no child.
pub fn step_child<C>(cx: &mut TickContext<'_, C>) -> Result<Option<Status>> {
    if cx.child_count() == 0 {
        return Ok(None);
    }
    cx.run_child(0).map(Some)
}

/// Always returns `Success` once its child completes.
///
/// # Semantics
///
/// - If the child returns `Success`, returns `Success`
/// - If the child fails, **still returns `Success`**
/// - A cancelled child cancels the decorator
/// - Without a child, succeeds immediately
///
/// This is useful for:
/// - Optional behaviors that shouldn't cause a sequence to fail
/// - Logging/debugging nodes that observe state without affecting control flow
#[derive(Debug, Default)]
pub struct ForceSuccess;

impl ForceSuccess {
    pub fn new() -> Self {
        Self
    }
}

impl<C> Behavior<C> for ForceSuccess {
    fn name(&self) -> &'static str {
        "force_success"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn max_children(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        Ok(match step_child(cx)? {
            None => Status::Success,
            Some(Status::Running) => Status::Running,
            Some(Status::Cancelled) => Status::Cancelled,
            Some(_) => Status::Success,
        })
    }
}

/// Always fails once its child completes.
///
/// A failing child keeps its own failure reason. A succeeding child (or a
/// missing one) yields the decorator's configured reason, falling back to
/// [`TreeConfig::default_failure`](crate::TreeConfig::default_failure).
/// A cancelled child cancels the decorator.
#[derive(Debug, Default)]
pub struct ForceFailure {
    reason: Option<FailureKind>,
}

impl ForceFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reason(reason: FailureKind) -> Self {
        Self {
            reason: Some(reason),
        }
    }

    pub fn reason(&self) -> Option<FailureKind> {
        self.reason
    }
}

impl<C> Behavior<C> for ForceFailure {
    fn name(&self) -> &'static str {
        "force_failure"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn max_children(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        let reason = self.reason.unwrap_or(cx.config().default_failure);
        Ok(match step_child(cx)? {
            None => Status::Failure(reason),
            Some(Status::Running) => Status::Running,
            Some(Status::Cancelled) => Status::Cancelled,
            Some(status) => status.to_failure(reason),
        })
    }
}

/// Keeps reporting `Running` after its child completes.
///
/// The child runs at most once per run of the decorator. Only cancellation
/// ends the decorator: either its own token or a cancelled child. Without a
/// child the decorator simply idles.
#[derive(Debug, Default)]
pub struct ForceRunning {
    started: bool,
}

impl ForceRunning {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> Behavior<C> for ForceRunning {
    fn name(&self) -> &'static str {
        "force_running"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn max_children(&self) -> Option<usize> {
        Some(1)
    }

    fn before_enter(&mut self) {
        self.started = false;
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        if cx.child_count() == 0 {
            return Ok(Status::Running);
        }
        // A completion not yet read here still goes through `run_child`.
        if cx.child_startable(0)? {
            if self.started {
                return Ok(Status::Running);
            }
            self.started = true;
        }
        let status = cx.run_child(0)?;
        Ok(if status.is_cancelled() {
            Status::Cancelled
        } else {
            Status::Running
        })
    }
}

/// Inverts the result of its child.
///
/// # Semantics
///
/// - If the child returns `Success`, the inverter fails with a generic failure
/// - If the child fails, the inverter returns `Success`
/// - Cancellation passes through unchanged
///
/// This is analogous to a logical NOT (!) operation.
#[derive(Debug, Default)]
pub struct Inverter;

impl Inverter {
    pub fn new() -> Self {
        Self
    }
}

impl<C> Behavior<C> for Inverter {
    fn name(&self) -> &'static str {
        "inverter"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn max_children(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        Ok(step_child(cx)?.map_or(Status::CHILDLESS, Status::invert))
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}
