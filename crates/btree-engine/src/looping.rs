//! Loop decorator.
//!
//! [`Loop`] restarts its child within the same tick each time it completes,
//! asking a [`LoopHook`] after every iteration whether to stop. `max_loop`
//! bounds the number of child runs per loop run; zero or a negative value
//! means unbounded.

use std::any::Any;

use crate::error::Result;
use crate::{Behavior, Status, TickContext};

/// Completion policy of a [`Loop`].
pub trait LoopHook: Send {
    /// Interprets one finished iteration. Returning [`Status::Running`]
    /// requests another iteration.
    fn on_iteration(&mut self, status: Status) -> Status;

    /// Final status once `max_loop` iterations ran and the hook still asked
    /// to continue.
    fn on_exhausted(&mut self, last: Status) -> Status {
        last
    }
}

/// Runs the child until the loop budget is spent; reports the last result.
#[derive(Clone, Copy, Debug, Default)]
pub struct Repeat;

impl LoopHook for Repeat {
    fn on_iteration(&mut self, _status: Status) -> Status {
        Status::Running
    }
}

/// Retries the child until it succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct UntilSuccess;

impl LoopHook for UntilSuccess {
    fn on_iteration(&mut self, status: Status) -> Status {
        if status.is_success() {
            Status::Success
        } else {
            Status::Running
        }
    }
}

/// Runs the child until it fails; the failure counts as success of the loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct UntilFailure;

impl LoopHook for UntilFailure {
    fn on_iteration(&mut self, status: Status) -> Status {
        if status.is_failure() {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn on_exhausted(&mut self, _last: Status) -> Status {
        Status::ERROR
    }
}

/// Loop decorator driven by a [`LoopHook`].
#[derive(Debug, Default)]
pub struct Loop<H> {
    hook: H,
    max_loop: i32,
    current_loop: u32,
}

impl<H: LoopHook> Loop<H> {
    pub fn new(hook: H, max_loop: i32) -> Self {
        Self {
            hook,
            max_loop,
            current_loop: 0,
        }
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn max_loop(&self) -> i32 {
        self.max_loop
    }

    /// Iterations started in the current or last run, counting from one.
    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }

    pub fn has_next_loop(&self) -> bool {
        match u32::try_from(self.max_loop) {
            Ok(0) | Err(_) => true,
            Ok(max) => self.current_loop < max,
        }
    }

    /// Unbounded loops may outlive the counter; it stops at `u32::MAX`.
    fn begin_iteration(&mut self) {
        self.current_loop = self.current_loop.saturating_add(1);
    }
}

impl<C, H: LoopHook + 'static> Behavior<C> for Loop<H> {
    fn name(&self) -> &'static str {
        "loop"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn max_children(&self) -> Option<usize> {
        Some(1)
    }

    fn before_enter(&mut self) {
        self.current_loop = 0;
    }

    fn enter(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        if cx.child_count() == 0 {
            return Ok(Status::CHILDLESS);
        }
        Ok(Status::Running)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        let generation = cx.generation();
        loop {
            if cx.child_startable(0)? {
                self.begin_iteration();
            }
            let status = cx.run_child(0)?;
            if let Some(status) = cx.checkpoint(generation)? {
                return Ok(status);
            }
            if status.is_running() {
                return Ok(Status::Running);
            }
            if status.is_cancelled() {
                return Ok(Status::Cancelled);
            }

            let result = self.hook.on_iteration(status);
            if !result.is_running() {
                return Ok(result);
            }
            if !self.has_next_loop() {
                let result = self.hook.on_exhausted(status);
                return Ok(if result.is_running() { status } else { result });
            }
        }
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, BehaviorTree, FailureKind, TaskTree};

    #[derive(Default)]
    struct Counter {
        runs: u32,
    }

    fn counting(tree: &mut TaskTree<Counter>, fail_from: u32) -> crate::TaskId {
        tree.insert(Action::new(move |cx: &mut TickContext<'_, Counter>| {
            let board = cx.blackboard_mut();
            board.runs += 1;
            if board.runs >= fail_from {
                Status::Failure(FailureKind::Custom(2))
            } else {
                Status::Success
            }
        }))
    }

    #[test]
    fn repeat_stops_after_max_loop() {
        let mut tree = TaskTree::new();
        let child = counting(&mut tree, u32::MAX);
        let repeat = tree.repeat(child, 3).unwrap();

        let mut bt = BehaviorTree::new(tree, repeat, Counter::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::Success);
        assert_eq!(bt.blackboard().runs, 3);
        let node = bt.tree().behavior::<Loop<Repeat>>(repeat).unwrap();
        assert_eq!(node.current_loop(), 3);
        assert!(!node.has_next_loop());
    }

    #[test]
    fn until_failure_succeeds_on_first_failure() {
        let mut tree = TaskTree::new();
        let child = counting(&mut tree, 4);
        let looping = tree.loop_with(UntilFailure, child, 0).unwrap();

        let mut bt = BehaviorTree::new(tree, looping, Counter::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::Success);
        assert_eq!(bt.blackboard().runs, 4);
    }

    #[test]
    fn until_failure_fails_when_budget_runs_out() {
        let mut tree = TaskTree::new();
        let child = counting(&mut tree, u32::MAX);
        let looping = tree.loop_with(UntilFailure, child, 2).unwrap();

        let mut bt = BehaviorTree::new(tree, looping, Counter::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::ERROR);
        assert_eq!(bt.blackboard().runs, 2);
    }

    #[test]
    fn until_success_retries_across_ticks() {
        let mut tree = TaskTree::new();
        // Succeeds on its own third execution, one execution per tick.
        let child = tree.insert(Action::new(|cx: &mut TickContext<'_, Counter>| {
            cx.blackboard_mut().runs += 1;
            if cx.run_frames() >= 2 {
                Status::Success
            } else {
                Status::Running
            }
        }));
        let looping = tree.loop_with(UntilSuccess, child, 0).unwrap();

        let mut bt = BehaviorTree::new(tree, looping, Counter::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::Running);
        assert_eq!(bt.tick(2).unwrap(), Status::Running);
        assert_eq!(bt.tick(3).unwrap(), Status::Success);
        assert_eq!(bt.blackboard().runs, 3);
    }

    #[test]
    fn unbounded_counter_saturates() {
        let mut node = Loop::new(Repeat, 0);
        node.current_loop = u32::MAX - 1;
        node.begin_iteration();
        node.begin_iteration();
        assert_eq!(node.current_loop(), u32::MAX);
        assert!(node.has_next_loop());
    }

    #[test]
    fn negative_budget_is_unbounded() {
        let node = Loop::new(Repeat, -1);
        assert!(node.has_next_loop());
    }
}
