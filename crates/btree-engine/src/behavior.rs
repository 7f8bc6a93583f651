//! Core behavior trait and the tick context.
//!
//! [`Behavior`] is the lifecycle contract shared by leaves, decorators and
//! branches. Nodes never call each other directly: every start, resume and
//! stop goes through [`TickContext`], which owns the state machine, the
//! run-generation checks, guard evaluation and child inlining.
//!
//! A run of a node looks like:
//!
//! ```text
//! before_enter -> enter -> execute* -> exit
//! ```
//!
//! `enter` may already return a terminal status (e.g. a branch without
//! children). Otherwise `execute` is called in the same tick and then once
//! per tick while the node keeps returning [`Status::Running`]. `exit` runs
//! exactly once when the node reaches a terminal status, including
//! cancellation by an ancestor.

use std::any::Any;

use crate::error::{Result, TreeError};
use crate::inline::InlineHelper;
use crate::tree::{Node, NodeFlags, TaskTree};
use crate::{CancelToken, Status, TaskId, TreeConfig};

/// A behavior tree node that can be ticked against a blackboard `C`.
pub trait Behavior<C>: Send {
    /// Short label used in logs.
    fn name(&self) -> &'static str {
        "task"
    }

    /// Whether parents may skip this node and tick its innermost running
    /// descendant directly. Only nodes with at most one running child may
    /// opt in.
    fn inlinable(&self) -> bool {
        false
    }

    /// Upper bound on children, checked when the tree is built.
    fn max_children(&self) -> Option<usize> {
        None
    }

    /// Resets per-run fields. Called before every (re)entry.
    fn before_enter(&mut self) {}

    /// Called once per run. Returning a terminal status ends the run without
    /// any `execute` call.
    fn enter(&mut self, _cx: &mut TickContext<'_, C>) -> Result<Status> {
        Ok(Status::Running)
    }

    /// Advances the node by one step.
    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status>;

    /// Releases per-run references. Running children have already been
    /// stopped when this is called.
    fn exit(&mut self, _cx: &mut TickContext<'_, C>) {}

    /// Receives an external event. The default forwards it to the node the
    /// inline cache points at, or else to the running child.
    fn on_event(&mut self, cx: &mut TickContext<'_, C>, event: &dyn Any) -> Result<()> {
        cx.forward_event(event)
    }

    /// Exposes the concrete type for [`TaskTree::behavior`].
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// A node's view of the running tree.
///
/// Handed to every [`Behavior`] hook. Besides the blackboard it gives access
/// to the node's children and to the engine operations that start, resume
/// and stop them.
pub struct TickContext<'a, C> {
    tree: &'a mut TaskTree<C>,
    blackboard: &'a mut C,
    config: &'a TreeConfig,
    step: u64,
    id: TaskId,
}

impl<'a, C> TickContext<'a, C> {
    pub(crate) fn new(
        tree: &'a mut TaskTree<C>,
        blackboard: &'a mut C,
        config: &'a TreeConfig,
        step: u64,
        id: TaskId,
    ) -> Self {
        Self {
            tree,
            blackboard,
            config,
            step,
            id,
        }
    }

    fn at(&mut self, id: TaskId) -> TickContext<'_, C> {
        TickContext {
            tree: &mut *self.tree,
            blackboard: &mut *self.blackboard,
            config: self.config,
            step: self.step,
            id,
        }
    }

    // ===== the node itself =====

    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Step number passed to the current `tick`.
    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        self.config
    }

    #[inline]
    pub fn blackboard(&self) -> &C {
        &*self.blackboard
    }

    #[inline]
    pub fn blackboard_mut(&mut self) -> &mut C {
        &mut *self.blackboard
    }

    #[inline]
    pub fn tree(&self) -> &TaskTree<C> {
        &*self.tree
    }

    pub fn status(&self) -> Status {
        self.node().status
    }

    /// Run generation of this node, bumped on every entry.
    pub fn generation(&self) -> u32 {
        self.node().generation
    }

    /// Number of completed `execute` calls in this run.
    pub fn run_frames(&self) -> u32 {
        self.node().run_frames
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.node().token
    }

    /// `true` while the node runs as somebody's guard.
    pub fn is_checking_guard(&self) -> bool {
        self.node().flags.contains(NodeFlags::CHECKING_GUARD)
    }

    /// The node this one currently stands in for, if the chain is intact.
    pub fn inlined(&self) -> Option<TaskId> {
        self.node().inline.running_target(self.tree())
    }

    // ===== children =====

    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    pub fn children(&self) -> &[TaskId] {
        &self.node().children
    }

    pub fn child(&self, index: usize) -> Result<TaskId> {
        let children = &self.node().children;
        children
            .get(index)
            .copied()
            .ok_or(TreeError::ChildIndex {
                task: self.id,
                index,
                children: children.len(),
            })
    }

    pub fn child_status(&self, index: usize) -> Result<Status> {
        Ok(self.tree.node(self.child(index)?).status)
    }

    /// `true` if the next `run_child*` call on this child starts a new run
    /// rather than resuming it or reporting a pending completion.
    pub fn child_startable(&self, index: usize) -> Result<bool> {
        let node = self.tree.node(self.child(index)?);
        Ok(!node.status.is_running() && !node.flags.contains(NodeFlags::UNOBSERVED))
    }

    /// Evaluates the child's guard without starting the child. A child
    /// without a guard is always permitted.
    pub fn check_child_guard(&mut self, index: usize) -> Result<bool> {
        let child = self.child(index)?;
        match self.tree.node(child).guard {
            Some(guard) => {
                let token = self.node().token.clone();
                self.run_guard(guard, token)
            }
            None => Ok(true),
        }
    }

    /// Starts or resumes a child through this node's inline cache.
    ///
    /// Returns the child's status after the step. A terminal status is
    /// reported exactly once; the next call starts the child again.
    pub fn run_child(&mut self, index: usize) -> Result<Status> {
        self.run_through_own_inline(index, true)
    }

    /// Like [`run_child`](Self::run_child) but a fresh start skips the
    /// child's guard, for callers that have already evaluated it.
    pub fn run_child_without_guard(&mut self, index: usize) -> Result<Status> {
        self.run_through_own_inline(index, false)
    }

    /// Starts or resumes a child through a caller-owned inline cache.
    ///
    /// `token` is installed on the child when this call starts it; otherwise
    /// the child shares this node's token.
    pub fn run_child_with(
        &mut self,
        index: usize,
        helper: &mut InlineHelper,
        token: Option<CancelToken>,
    ) -> Result<Status> {
        let child = self.child(index)?;
        self.drive(child, helper, token, true)
    }

    /// Cancels a running child and its running descendants.
    pub fn stop_child(&mut self, index: usize) -> Result<()> {
        let child = self.child(index)?;
        self.stop_task(child)
    }

    /// Cancellation and reentry check for loops that run several children
    /// within one call.
    ///
    /// Returns `Some(status)` when the caller must stop iterating and return
    /// it: either this node's run changed since `generation` was captured,
    /// or cancellation was requested (running children are stopped first).
    pub fn checkpoint(&mut self, generation: u32) -> Result<Option<Status>> {
        if self.is_stale(generation) {
            return Ok(Some(self.status()));
        }
        if self.node().token.is_cancelled() {
            tracing::debug!(task = %self.id, name = self.node().name, "cancellation observed");
            self.stop_running_children()?;
            return Ok(Some(Status::Cancelled));
        }
        Ok(None)
    }

    // ===== events =====

    /// Delivers an event to the node this one stands in for, or else to the
    /// first running child. Dropped when nothing below is running.
    pub fn forward_event(&mut self, event: &dyn Any) -> Result<()> {
        let target = self.inlined().or_else(|| {
            self.node()
                .children
                .iter()
                .copied()
                .find(|&child| self.tree.node(child).status.is_running())
        });
        match target {
            Some(target) => self.dispatch_event_to(target, event),
            None => {
                tracing::trace!(task = %self.id, "event dropped: nothing running below");
                Ok(())
            }
        }
    }

    /// Delivers an event straight to `target`'s `on_event`.
    pub fn dispatch_event_to(&mut self, target: TaskId, event: &dyn Any) -> Result<()> {
        self.with_behavior(target, |behavior, cx| behavior.on_event(cx, event))?
    }

    // ===== engine =====

    /// Enters `id` and runs its first step.
    pub(crate) fn start_task(
        &mut self,
        id: TaskId,
        token: CancelToken,
        check_guard: bool,
    ) -> Result<Status> {
        if self.tree.node(id).status.is_running() {
            self.stop_task(id)?;
        }
        let generation = {
            let node = self.tree.node_mut(id);
            node.token = token;
            node.generation = node.generation.wrapping_add(1);
            node.run_frames = 0;
            node.inline.stop_inline();
            node.flags.remove(NodeFlags::UNOBSERVED);
            node.generation
        };
        for index in 0..self.tree.node(id).children.len() {
            let child = self.tree.node(id).children[index];
            self.tree.node_mut(child).flags.remove(NodeFlags::UNOBSERVED);
        }

        if check_guard && let Some(guard) = self.tree.node(id).guard {
            let token = self.tree.node(id).token.clone();
            if !self.run_guard(guard, token)? {
                let node = self.tree.node_mut(id);
                node.status = Status::GUARD_FAILED;
                node.flags.insert(NodeFlags::UNOBSERVED);
                tracing::trace!(task = %id, name = node.name, "blocked by guard");
                return Ok(Status::GUARD_FAILED);
            }
        }

        self.with_behavior(id, |behavior, cx| cx.enter_and_execute(behavior, generation))?
    }

    /// Runs one step of a running node.
    pub(crate) fn execute_task(&mut self, id: TaskId) -> Result<Status> {
        let generation = self.tree.node(id).generation;
        self.with_behavior(id, |behavior, cx| cx.execute_with(behavior, generation))?
    }

    /// Cancels a running node; its running descendants exit first.
    pub(crate) fn stop_task(&mut self, id: TaskId) -> Result<()> {
        if !self.tree.node(id).status.is_running() {
            return Ok(());
        }
        self.with_behavior(id, |behavior, cx| cx.complete(behavior, Status::Cancelled))?
    }

    fn run_guard(&mut self, guard: TaskId, token: CancelToken) -> Result<bool> {
        self.tree
            .node_mut(guard)
            .flags
            .insert(NodeFlags::CHECKING_GUARD);
        let mut status = self.start_task(guard, token, true);
        if matches!(status, Ok(s) if s.is_running()) {
            tracing::warn!(
                %guard,
                name = self.tree.node(guard).name,
                "guard did not complete synchronously, treating it as blocked"
            );
            status = self.stop_task(guard).map(|()| Status::Cancelled);
        }
        self.tree
            .node_mut(guard)
            .flags
            .remove(NodeFlags::CHECKING_GUARD | NodeFlags::UNOBSERVED);
        Ok(status?.is_success())
    }

    fn run_through_own_inline(&mut self, index: usize, check_guard: bool) -> Result<Status> {
        let child = self.child(index)?;
        let mut helper = self.node().inline;
        let status = self.drive(child, &mut helper, None, check_guard);
        self.node_mut().inline = helper;
        status
    }

    /// One step of `child` on behalf of this node.
    ///
    /// A running child is resumed, jumping straight to the cached innermost
    /// node when there is one. When that node completes, the child itself is
    /// resumed so every node between them observes the completion in order.
    fn drive(
        &mut self,
        child: TaskId,
        helper: &mut InlineHelper,
        token: Option<CancelToken>,
        check_guard: bool,
    ) -> Result<Status> {
        let (status, flags) = {
            let node = self.tree.node(child);
            (node.status, node.flags)
        };
        if status.is_running() {
            match helper.running_target(self.tree()) {
                Some(target) if target != child => {
                    self.execute_task(target)?;
                    if !self.tree.node(target).status.is_running() {
                        helper.stop_inline();
                        if self.tree.node(child).status.is_running() {
                            self.execute_task(child)?;
                        }
                    }
                }
                _ => {
                    self.execute_task(child)?;
                }
            }
        } else if !flags.contains(NodeFlags::UNOBSERVED) {
            let token = token.unwrap_or_else(|| self.node().token.clone());
            self.start_task(child, token, check_guard)?;
        }

        let status = self.tree.node(child).status;
        if status.is_running() {
            helper.inline_child(self.tree(), child);
        } else {
            helper.stop_inline();
            self.tree
                .node_mut(child)
                .flags
                .remove(NodeFlags::UNOBSERVED);
        }
        Ok(status)
    }

    fn enter_and_execute(
        &mut self,
        behavior: &mut dyn Behavior<C>,
        generation: u32,
    ) -> Result<Status> {
        self.node_mut().status = Status::Running;
        behavior.before_enter();
        tracing::trace!(task = %self.id, name = self.node().name, "enter");

        let status = behavior.enter(self)?;
        if status.is_running() && !self.is_stale(generation) {
            return self.execute_with(behavior, generation);
        }
        self.finish(behavior, generation, status)?;
        Ok(self.status())
    }

    fn execute_with(&mut self, behavior: &mut dyn Behavior<C>, generation: u32) -> Result<Status> {
        let status = if self.node().token.is_cancelled() {
            tracing::debug!(task = %self.id, name = self.node().name, "cancellation observed");
            Status::Cancelled
        } else {
            let status = behavior.execute(self)?;
            let node = self.node_mut();
            node.run_frames = node.run_frames.saturating_add(1);
            status
        };
        self.finish(behavior, generation, status)?;
        Ok(self.status())
    }

    /// Applies a status returned by the node's own hook.
    ///
    /// Statuses computed against an older run are discarded, and a pending
    /// cancellation overrides any success or failure.
    fn finish(
        &mut self,
        behavior: &mut dyn Behavior<C>,
        generation: u32,
        status: Status,
    ) -> Result<()> {
        if self.is_stale(generation) || status.is_running() {
            return Ok(());
        }
        let status = match status {
            Status::New => {
                tracing::warn!(task = %self.id, name = self.node().name, "hook returned `New`");
                Status::ERROR
            }
            Status::Cancelled => Status::Cancelled,
            _ if self.node().token.is_cancelled() => Status::Cancelled,
            other => other,
        };
        self.complete(behavior, status)
    }

    fn complete(&mut self, behavior: &mut dyn Behavior<C>, status: Status) -> Result<()> {
        self.stop_running_children()?;
        let id = self.id;
        let node = self.node_mut();
        node.status = status;
        node.flags.insert(NodeFlags::UNOBSERVED);
        node.inline.stop_inline();
        tracing::trace!(task = %id, name = node.name, %status, "exit");
        behavior.exit(self);
        Ok(())
    }

    fn stop_running_children(&mut self) -> Result<()> {
        for index in 0..self.child_count() {
            let child = self.node().children[index];
            if self.tree.node(child).status.is_running() {
                self.stop_task(child)?;
            }
        }
        Ok(())
    }

    /// `true` once the run that captured `generation` is over.
    ///
    /// Reentry is already refused with [`TreeError::Reentrant`], so within
    /// the engine a generation mismatch only shows up when a hook passes an
    /// old value to [`checkpoint`](Self::checkpoint).
    fn is_stale(&self, generation: u32) -> bool {
        let node = self.node();
        node.generation != generation || !node.status.is_running()
    }

    fn with_behavior<R>(
        &mut self,
        id: TaskId,
        f: impl FnOnce(&mut dyn Behavior<C>, &mut TickContext<'_, C>) -> R,
    ) -> Result<R> {
        let mut behavior = self
            .tree
            .node_mut(id)
            .behavior
            .take()
            .ok_or(TreeError::Reentrant(id))?;
        let out = f(behavior.as_mut(), &mut self.at(id));
        self.tree.node_mut(id).behavior = Some(behavior);
        Ok(out)
    }

    #[inline]
    fn node(&self) -> &Node<C> {
        self.tree.node(self.id)
    }

    #[inline]
    fn node_mut(&mut self) -> &mut Node<C> {
        self.tree.node_mut(self.id)
    }
}
