//! Branches with several logically active children per tick.

use std::any::Any;

use crate::error::Result;
use crate::{Behavior, CancelToken, InlineHelper, Status, TickContext};

/// Per-child record of a parallel branch.
#[derive(Clone, Debug, Default)]
pub struct ParallelChildHelper {
    /// Inline cache of this child alone.
    pub inline: InlineHelper,
    /// Token installed on the child's current run, linked to the branch's.
    pub token: Option<CancelToken>,
}

impl ParallelChildHelper {
    pub fn reset(&mut self) {
        self.inline.stop_inline();
        self.token = None;
    }
}

/// Shared bookkeeping for parallel branches: one helper per child.
#[derive(Clone, Debug, Default)]
pub struct ParallelChildren {
    helpers: Vec<ParallelChildHelper>,
}

impl ParallelChildren {
    /// Prepares one empty helper per child; call from `enter`.
    pub fn init(&mut self, children: usize) {
        self.helpers.clear();
        self.helpers.resize_with(children, ParallelChildHelper::default);
    }

    pub fn helper(&self, index: usize) -> Option<&ParallelChildHelper> {
        self.helpers.get(index)
    }

    /// Starts or resumes child `index` through its own inline cache.
    ///
    /// A fresh start gets its own token linked to the branch's, so the child
    /// can be cancelled without touching its siblings. The token is released
    /// once the child completes.
    pub fn run_child<C>(&mut self, cx: &mut TickContext<'_, C>, index: usize) -> Result<Status> {
        if index >= self.helpers.len() {
            self.helpers.resize_with(index + 1, ParallelChildHelper::default);
        }
        let token = if cx.child_startable(index)? {
            let token = cx.cancel_token().child();
            self.helpers[index].token = Some(token.clone());
            Some(token)
        } else {
            None
        };
        let helper = &mut self.helpers[index];
        let status = cx.run_child_with(index, &mut helper.inline, token)?;
        if !status.is_running() {
            helper.reset();
        }
        Ok(status)
    }

    /// Releases every helper; call from `exit`.
    pub fn clear(&mut self) {
        self.helpers.iter_mut().for_each(ParallelChildHelper::reset);
    }
}

/// Runs every child each tick; the first child decides the outcome.
///
/// # Semantics
///
/// - Children are stepped left to right within one tick
/// - The branch completes with the primary (first) child's exact status
/// - Secondary children are background work: a completed secondary is
///   started again on the next tick and its result is ignored
/// - Each child runs under its own token derived from the branch's
/// - Events only reach the primary child
/// - No children at all is the `Childless` failure
#[derive(Debug, Default)]
pub struct SimpleParallel {
    children: ParallelChildren,
}

impl SimpleParallel {
    pub const PRIMARY: usize = 0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &ParallelChildren {
        &self.children
    }
}

impl<C> Behavior<C> for SimpleParallel {
    fn name(&self) -> &'static str {
        "simple_parallel"
    }

    fn enter(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        if cx.child_count() == 0 {
            return Ok(Status::CHILDLESS);
        }
        self.children.init(cx.child_count());
        Ok(Status::Running)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        let generation = cx.generation();
        for index in 0..cx.child_count() {
            let status = self.children.run_child(cx, index)?;
            if index == Self::PRIMARY && status.is_completed() {
                return Ok(status);
            }
            if let Some(status) = cx.checkpoint(generation)? {
                return Ok(status);
            }
        }
        Ok(Status::Running)
    }

    fn exit(&mut self, _cx: &mut TickContext<'_, C>) {
        self.children.clear();
    }

    fn on_event(&mut self, cx: &mut TickContext<'_, C>, event: &dyn Any) -> Result<()> {
        let primary = cx.child(Self::PRIMARY)?;
        let target = self
            .children
            .helper(Self::PRIMARY)
            .and_then(|helper| helper.inline.running_target(cx.tree()))
            .or_else(|| cx.tree().status(primary).is_running().then_some(primary));
        match target {
            Some(target) => cx.dispatch_event_to(target, event),
            None => Ok(()),
        }
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, BehaviorTree, TaskTree};

    #[derive(Default)]
    struct Board {
        secondary_runs: u32,
    }

    #[test]
    fn primary_decides_and_secondary_repeats() {
        let mut tree = TaskTree::new();
        let primary = tree.insert(Action::new(|cx: &mut TickContext<'_, Board>| {
            if cx.run_frames() >= 2 {
                Status::Success
            } else {
                Status::Running
            }
        }));
        let secondary = tree.insert(Action::new(|cx: &mut TickContext<'_, Board>| {
            cx.blackboard_mut().secondary_runs += 1;
            Status::Success
        }));
        let parallel = tree.simple_parallel([primary, secondary]).unwrap();

        let mut bt = BehaviorTree::new(tree, parallel, Board::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::Running);
        assert_eq!(bt.tick(2).unwrap(), Status::Running);
        assert_eq!(bt.tick(3).unwrap(), Status::Success);
        // The primary finishes first on the last tick, which ends the branch.
        assert_eq!(bt.blackboard().secondary_runs, 2);
        assert_eq!(bt.tree().generation(secondary), 2);
    }

    #[test]
    fn childless_parallel_fails() {
        let mut tree: TaskTree<Board> = TaskTree::new();
        let parallel = tree.insert(SimpleParallel::new());
        let mut bt = BehaviorTree::new(tree, parallel, Board::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::CHILDLESS);
    }
}
