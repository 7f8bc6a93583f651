//! Tree root and driver.
//!
//! [`BehaviorTree`] owns the node arena, the blackboard, the configuration
//! and the cancellation token of the current run. The caller ticks it once
//! per step and may push external events into it in between.

use std::any::Any;

use crate::error::{Result, TreeError};
use crate::{Behavior, CancelToken, Status, TaskId, TaskTree, TickContext, TreeConfig};

/// Hidden root wrapping the user's top node.
///
/// Keeping a dedicated root lets the driver use the same inline path as any
/// other parent: ticks and events jump straight to the innermost running node.
struct Entry;

impl<C> Behavior<C> for Entry {
    fn name(&self) -> &'static str {
        "entry"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn max_children(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        cx.run_child(0)
    }
}

/// A runnable behavior tree.
pub struct BehaviorTree<C> {
    tree: TaskTree<C>,
    root: TaskId,
    top: TaskId,
    blackboard: C,
    config: TreeConfig,
    token: CancelToken,
    step: u64,
}

impl<C> BehaviorTree<C> {
    /// Wraps `top` (which must not have an owner) as the tree's root.
    pub fn new(tree: TaskTree<C>, top: TaskId, blackboard: C) -> Result<Self> {
        Self::with_config(tree, top, blackboard, TreeConfig::default())
    }

    pub fn with_config(
        mut tree: TaskTree<C>,
        top: TaskId,
        blackboard: C,
        config: TreeConfig,
    ) -> Result<Self> {
        if !tree.contains(top) {
            return Err(TreeError::UnknownTask(top));
        }
        if let Some(owner) = tree.parent(top) {
            return Err(TreeError::AlreadyAttached { child: top, owner });
        }
        let root = tree.insert(Entry);
        tree.attach(root, top)?;
        tracing::debug!(%root, %top, nodes = tree.len(), "behavior tree created");

        Ok(Self {
            tree,
            root,
            top,
            blackboard,
            config,
            token: CancelToken::new(),
            step: 0,
        })
    }

    /// Advances the tree by one step and returns the root status.
    ///
    /// A running tree is resumed. A new tree is entered. A completed tree is
    /// entered again when [`TreeConfig::auto_restart`] is set, otherwise the
    /// last status is reported and nothing runs.
    pub fn tick(&mut self, step: u64) -> Result<Status> {
        self.step = step;
        let status = self.tree.status(self.root);
        let restart = !status.is_running() && (status == Status::New || self.config.auto_restart);
        if !status.is_running() && !restart {
            return Ok(status);
        }

        let root = self.root;
        let token = self.token.clone();
        let mut cx = TickContext::new(
            &mut self.tree,
            &mut self.blackboard,
            &self.config,
            step,
            root,
        );
        let status = if status.is_running() {
            cx.execute_task(root)?
        } else {
            tracing::debug!(step, "starting tree run");
            cx.start_task(root, token, true)?
        };

        if status.is_completed() {
            tracing::debug!(step, %status, "tree run completed");
        }
        Ok(status)
    }

    /// Delivers `event` to the innermost running node.
    ///
    /// Nothing is started or stopped. The event is dropped when the tree is
    /// not running.
    pub fn dispatch_event(&mut self, event: &dyn Any) -> Result<()> {
        if !self.tree.status(self.root).is_running() {
            tracing::trace!("event dropped: tree is not running");
            return Ok(());
        }
        let root = self.root;
        let mut cx = TickContext::new(
            &mut self.tree,
            &mut self.blackboard,
            &self.config,
            self.step,
            root,
        );
        cx.dispatch_event_to(root, event)
    }

    /// Requests cancellation of the current run.
    ///
    /// The request is observed at the next checkpoint, at the latest on the
    /// next tick. It stays in effect for later runs until [`reset`](Self::reset).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Stops the current run, if any, and returns the tree to `New` with a
    /// fresh cancellation token.
    pub fn reset(&mut self) -> Result<()> {
        let root = self.root;
        let mut cx = TickContext::new(
            &mut self.tree,
            &mut self.blackboard,
            &self.config,
            self.step,
            root,
        );
        cx.stop_task(root)?;
        self.tree.node_mut(root).status = Status::New;
        self.token = CancelToken::new();
        tracing::debug!("behavior tree reset");
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.tree.status(self.root)
    }

    /// The innermost running node, as seen through the root's inline chain.
    pub fn inlined_task(&self) -> Option<TaskId> {
        self.tree.inlined(self.root)
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.token
    }

    pub fn blackboard(&self) -> &C {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut C {
        &mut self.blackboard
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Step passed to the last `tick`.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    pub fn tree(&self) -> &TaskTree<C> {
        &self.tree
    }

    /// The hidden root node.
    pub fn root(&self) -> TaskId {
        self.root
    }

    /// The user's top node.
    pub fn top(&self) -> TaskId {
        self.top
    }

    pub fn into_blackboard(self) -> C {
        self.blackboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Selector};

    fn counting_leaf(tree: &mut TaskTree<u32>, status: Status) -> TaskId {
        tree.insert(Action::new(move |cx: &mut TickContext<'_, u32>| {
            *cx.blackboard_mut() += 1;
            status
        }))
    }

    #[test]
    fn top_must_be_detached() {
        let mut tree = TaskTree::new();
        let leaf = counting_leaf(&mut tree, Status::Success);
        let parent = tree.selector([leaf]).unwrap();

        assert_eq!(
            BehaviorTree::new(tree, leaf, 0).err(),
            Some(TreeError::AlreadyAttached {
                child: leaf,
                owner: parent
            })
        );
    }

    #[test]
    fn completed_tree_restarts_by_default() {
        let mut tree = TaskTree::new();
        let leaf = counting_leaf(&mut tree, Status::Success);
        let mut bt = BehaviorTree::new(tree, leaf, 0).unwrap();

        assert_eq!(bt.tick(1).unwrap(), Status::Success);
        assert_eq!(bt.tick(2).unwrap(), Status::Success);
        assert_eq!(*bt.blackboard(), 2);
        assert_eq!(bt.tree().generation(bt.root()), 2);
    }

    #[test]
    fn completed_tree_stays_put_without_auto_restart() {
        let mut tree = TaskTree::new();
        let leaf = counting_leaf(&mut tree, Status::ERROR);
        let config = TreeConfig::new().with_auto_restart(false);
        let mut bt = BehaviorTree::with_config(tree, leaf, 0, config).unwrap();

        assert_eq!(bt.tick(1).unwrap(), Status::ERROR);
        assert_eq!(bt.tick(2).unwrap(), Status::ERROR);
        assert_eq!(*bt.blackboard(), 1);
        assert_eq!(bt.current_step(), 2);
    }

    #[test]
    fn reset_stops_the_run() {
        let mut tree = TaskTree::new();
        let leaf = counting_leaf(&mut tree, Status::Running);
        let top = tree.insert(Selector::new());
        tree.attach(top, leaf).unwrap();
        let mut bt = BehaviorTree::new(tree, top, 0).unwrap();

        assert_eq!(bt.tick(1).unwrap(), Status::Running);
        bt.reset().unwrap();
        assert_eq!(bt.status(), Status::New);
        assert_eq!(bt.tree().status(leaf), Status::Cancelled);
        assert_eq!(bt.inlined_task(), None);

        assert_eq!(bt.tick(2).unwrap(), Status::Running);
        assert_eq!(bt.tree().generation(leaf), 2);
        assert_eq!(bt.inlined_task(), Some(leaf));
    }

    #[test]
    fn events_are_dropped_when_idle() {
        let mut tree = TaskTree::new();
        let leaf = counting_leaf(&mut tree, Status::Success);
        let mut bt = BehaviorTree::new(tree, leaf, 0).unwrap();
        assert_eq!(bt.dispatch_event(&"ping"), Ok(()));
    }
}
