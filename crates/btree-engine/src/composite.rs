//! Branches that run at most one child at a time.
//!
//! [`SingleRunningBranch`] holds the shared tick loop: start or resume the
//! current child, and when it completes let the concrete branch decide
//! between a final status and moving on to the next child within the same
//! tick. [`Selector`] (OR logic) and [`Sequence`] (AND logic) are built on it.

use std::any::Any;

use crate::error::{Result, TreeError};
use crate::{Behavior, Status, TaskId, TaskTree, TickContext};

/// Per-run bookkeeping of a single-running-child branch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleRunning {
    running_index: Option<usize>,
    running_child: Option<TaskId>,
    child_count: usize,
}

impl SingleRunning {
    /// Clears per-run state; call from `before_enter`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drops the running-child reference; call from `exit`. The index is
    /// kept so it can still be queried after the run.
    pub fn release(&mut self) {
        self.running_child = None;
    }

    /// Index of the last child that was started in this run.
    pub fn running_index(&self) -> Option<usize> {
        self.running_index
    }

    /// The child currently awaiting completion.
    pub fn running_child(&self) -> Option<TaskId> {
        self.running_child
    }

    /// Number of children started so far in this run.
    pub fn completed_count(&self) -> usize {
        self.running_index.map_or(0, |index| index + 1)
    }

    pub fn is_all_child_completed(&self) -> bool {
        self.completed_count() >= self.child_count
    }

    /// Number of children that succeeded in the branch's current or last run.
    pub fn succeeded_count<C>(&self, tree: &TaskTree<C>, branch: TaskId) -> usize {
        tree.children(branch)
            .iter()
            .take(self.completed_count())
            .filter(|&&child| tree.status(child).is_success())
            .count()
    }

    fn current(&self) -> Option<usize> {
        self.running_child.and(self.running_index)
    }
}

/// Template for branches whose children run one after another.
pub trait SingleRunningBranch<C> {
    fn state(&self) -> &SingleRunning;

    fn state_mut(&mut self) -> &mut SingleRunning;

    /// Interprets a child's terminal status.
    ///
    /// Returns the branch's final status, or [`Status::Running`] to continue
    /// with the next child in the same tick.
    fn on_child_completed(
        &mut self,
        cx: &mut TickContext<'_, C>,
        index: usize,
        status: Status,
    ) -> Status;

    /// Advances to the next child.
    ///
    /// Running out of children here means `on_child_completed` asked to
    /// continue past the last child, which is a broken invariant rather
    /// than a task failure.
    fn next_child(&mut self, cx: &TickContext<'_, C>) -> Result<usize> {
        let state = self.state_mut();
        let next = state.running_index.map_or(0, |index| index + 1);
        if next < cx.child_count() {
            state.running_index = Some(next);
            state.running_child = Some(cx.child(next)?);
            Ok(next)
        } else {
            Err(TreeError::ChildrenExhausted {
                task: cx.id(),
                children: cx.child_count(),
                index: state.running_index,
            })
        }
    }

    /// The shared tick loop.
    fn execute_children(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        let generation = cx.generation();
        self.state_mut().child_count = cx.child_count();
        loop {
            let index = match self.state().current() {
                Some(index) => index,
                None => self.next_child(cx)?,
            };
            let status = cx.run_child(index)?;
            if let Some(status) = cx.checkpoint(generation)? {
                return Ok(status);
            }
            if status.is_running() {
                return Ok(Status::Running);
            }

            self.state_mut().running_child = None;
            let result = self.on_child_completed(cx, index, status);
            if !result.is_running() {
                return Ok(result);
            }
            // A continuation decided against an older run is dropped.
            if let Some(status) = cx.checkpoint(generation)? {
                return Ok(status);
            }
        }
    }
}

/// Executes children in order until one succeeds.
///
/// # Semantics
///
/// - A child returning `Success` ends the selector with `Success`
/// - A failing child moves on to the next child within the same tick
/// - When every child failed, the selector fails with a generic failure
/// - A cancelled child cancels the selector
/// - No children at all is the `Childless` failure
///
/// This is analogous to a short-circuited logical OR (||) operation.
///
/// Evaluated as a guard, the selector only checks its children's guards and
/// succeeds on the first one that passes; no child is started.
#[derive(Debug, Default)]
pub struct Selector {
    state: SingleRunning,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SingleRunning {
        &self.state
    }
}

impl<C> SingleRunningBranch<C> for Selector {
    fn state(&self) -> &SingleRunning {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SingleRunning {
        &mut self.state
    }

    fn on_child_completed(
        &mut self,
        _cx: &mut TickContext<'_, C>,
        _index: usize,
        status: Status,
    ) -> Status {
        if status.is_cancelled() {
            Status::Cancelled
        } else if status.is_success() {
            Status::Success
        } else if self.state.is_all_child_completed() {
            Status::ERROR
        } else {
            Status::Running
        }
    }
}

impl<C> Behavior<C> for Selector {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn before_enter(&mut self) {
        self.state.reset();
    }

    fn enter(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        if cx.child_count() == 0 {
            return Ok(Status::CHILDLESS);
        }
        if cx.is_checking_guard() {
            for index in 0..cx.child_count() {
                if cx.check_child_guard(index)? {
                    return Ok(Status::Success);
                }
            }
            return Ok(Status::ERROR);
        }
        Ok(Status::Running)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        self.execute_children(cx)
    }

    fn exit(&mut self, _cx: &mut TickContext<'_, C>) {
        self.state.release();
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

/// Executes children in order until one fails.
///
/// # Semantics
///
/// - A failing child ends the sequence with that child's failure
/// - A child returning `Success` moves on to the next child within the same tick
/// - When every child succeeded, the sequence returns `Success`
/// - A cancelled child cancels the sequence
/// - No children at all is the `Childless` failure
///
/// This is analogous to a short-circuited logical AND (&&) operation.
///
/// Evaluated as a guard, the sequence succeeds only if every child's guard
/// passes; no child is started.
#[derive(Debug, Default)]
pub struct Sequence {
    state: SingleRunning,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SingleRunning {
        &self.state
    }
}

impl<C> SingleRunningBranch<C> for Sequence {
    fn state(&self) -> &SingleRunning {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SingleRunning {
        &mut self.state
    }

    fn on_child_completed(
        &mut self,
        _cx: &mut TickContext<'_, C>,
        _index: usize,
        status: Status,
    ) -> Status {
        if status.is_cancelled() {
            Status::Cancelled
        } else if !status.is_success() {
            status
        } else if self.state.is_all_child_completed() {
            Status::Success
        } else {
            Status::Running
        }
    }
}

impl<C> Behavior<C> for Sequence {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn before_enter(&mut self) {
        self.state.reset();
    }

    fn enter(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        if cx.child_count() == 0 {
            return Ok(Status::CHILDLESS);
        }
        if cx.is_checking_guard() {
            for index in 0..cx.child_count() {
                if !cx.check_child_guard(index)? {
                    return Ok(Status::ERROR);
                }
            }
            return Ok(Status::Success);
        }
        Ok(Status::Running)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        self.execute_children(cx)
    }

    fn exit(&mut self, _cx: &mut TickContext<'_, C>) {
        self.state.release();
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}
