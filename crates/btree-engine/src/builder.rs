//! Builder utilities for ergonomic behavior tree construction.
//!
//! Instead of `insert` followed by `attach_all` for every branch, these
//! helpers insert the node and adopt its children in one call:
//!
//! ```
//! use btree_engine::{Action, Status, TaskTree};
//!
//! let mut tree: TaskTree<u32> = TaskTree::new();
//! let work = tree.action(|cx| {
//!     *cx.blackboard_mut() += 1;
//!     Status::Success
//! });
//! let idle = tree.insert(Action::new(|_| Status::Running));
//! let top = tree.selector([work, idle]).unwrap();
//! assert_eq!(tree.children(top), &[work, idle]);
//! ```

use crate::error::Result;
use crate::{
    Action, Behavior, Condition, FailureKind, ForceFailure, ForceRunning, ForceSuccess, Inverter,
    Loop, LoopHook, Repeat, Selector, Sequence, SimpleParallel, Status, Switch, TaskId, TaskTree,
    TickContext,
};

impl<C: 'static> TaskTree<C> {
    /// Inserts `behavior` and attaches `children` to it in order.
    ///
    /// On `Err` no child has been attached; the inserted node stays in the
    /// arena unattached and can be ignored.
    pub fn branch<B>(&mut self, behavior: B, children: impl IntoIterator<Item = TaskId>) -> Result<TaskId>
    where
        B: Behavior<C> + 'static,
    {
        let id = self.insert(behavior);
        self.attach_all(id, children)?;
        Ok(id)
    }

    /// Creates a selector node.
    #[inline]
    pub fn selector(&mut self, children: impl IntoIterator<Item = TaskId>) -> Result<TaskId> {
        self.branch(Selector::new(), children)
    }

    /// Creates a sequence node.
    #[inline]
    pub fn sequence(&mut self, children: impl IntoIterator<Item = TaskId>) -> Result<TaskId> {
        self.branch(Sequence::new(), children)
    }

    /// Creates a guard-scanning switch node.
    #[inline]
    pub fn switch(&mut self, children: impl IntoIterator<Item = TaskId>) -> Result<TaskId> {
        self.branch(Switch::new(), children)
    }

    /// Creates a simple-parallel node; the first child is the primary.
    #[inline]
    pub fn simple_parallel(
        &mut self,
        children: impl IntoIterator<Item = TaskId>,
    ) -> Result<TaskId> {
        self.branch(SimpleParallel::new(), children)
    }

    #[inline]
    pub fn force_success(&mut self, child: TaskId) -> Result<TaskId> {
        self.branch(ForceSuccess::new(), [child])
    }

    #[inline]
    pub fn force_failure(&mut self, child: TaskId) -> Result<TaskId> {
        self.branch(ForceFailure::new(), [child])
    }

    /// Force-failure with a fixed reason.
    #[inline]
    pub fn force_failure_with(&mut self, child: TaskId, reason: FailureKind) -> Result<TaskId> {
        self.branch(ForceFailure::with_reason(reason), [child])
    }

    #[inline]
    pub fn force_running(&mut self, child: TaskId) -> Result<TaskId> {
        self.branch(ForceRunning::new(), [child])
    }

    #[inline]
    pub fn inverter(&mut self, child: TaskId) -> Result<TaskId> {
        self.branch(Inverter::new(), [child])
    }

    /// Repeats `child` `max_loop` times; zero or negative repeats forever.
    #[inline]
    pub fn repeat(&mut self, child: TaskId, max_loop: i32) -> Result<TaskId> {
        self.loop_with(Repeat, child, max_loop)
    }

    pub fn loop_with<H>(&mut self, hook: H, child: TaskId, max_loop: i32) -> Result<TaskId>
    where
        H: LoopHook + 'static,
    {
        self.branch(Loop::new(hook, max_loop), [child])
    }

    /// Inserts a predicate leaf.
    #[inline]
    pub fn condition<F>(&mut self, predicate: F) -> TaskId
    where
        F: FnMut(&C) -> bool + Send + 'static,
    {
        self.insert(Condition::new(predicate))
    }

    /// Inserts a closure leaf.
    #[inline]
    pub fn action<F>(&mut self, step: F) -> TaskId
    where
        F: FnMut(&mut TickContext<'_, C>) -> Status + Send + 'static,
    {
        self.insert(Action::new(step))
    }

    /// Sets `guard` on `node` and returns `node`, for inline use.
    pub fn guarded(&mut self, node: TaskId, guard: TaskId) -> Result<TaskId> {
        self.set_guard(node, guard)?;
        Ok(node)
    }
}
