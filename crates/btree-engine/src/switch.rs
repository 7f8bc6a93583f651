//! Guard-gated single-choice branch.

use std::any::Any;

use crate::error::{Result, TreeError};
use crate::{Behavior, Status, TaskId, TickContext};

/// Custom selection policy for a [`Switch`].
///
/// Receives the switch's children in order and returns the index of the one
/// to run, or `None` when no child applies.
pub trait SwitchHandler<C>: Send {
    fn select(&mut self, children: &[TaskId], blackboard: &C) -> Option<usize>;
}

impl<C, F> SwitchHandler<C> for F
where
    F: FnMut(&[TaskId], &C) -> Option<usize> + Send,
{
    fn select(&mut self, children: &[TaskId], blackboard: &C) -> Option<usize> {
        self(children, blackboard)
    }
}

/// Runs exactly one child: the first whose guard passes.
///
/// Guards are evaluated in child order and evaluation stops at the first
/// success, so later guards are never invoked. The chosen child is started
/// without re-checking its guard and the switch completes with the child's
/// status. When no child qualifies the switch fails with a generic failure.
///
/// A [`SwitchHandler`] replaces the guard scan entirely.
pub struct Switch<C> {
    handler: Option<Box<dyn SwitchHandler<C>>>,
    selected: Option<usize>,
}

impl<C> Switch<C> {
    pub fn new() -> Self {
        Self {
            handler: None,
            selected: None,
        }
    }

    pub fn with_handler<H>(handler: H) -> Self
    where
        H: SwitchHandler<C> + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            selected: None,
        }
    }

    /// Index of the child chosen in the current or last run.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    fn select(&mut self, cx: &mut TickContext<'_, C>) -> Result<Option<usize>> {
        if let Some(handler) = self.handler.as_mut() {
            let index = handler.select(cx.children(), cx.blackboard());
            return match index {
                Some(index) if index >= cx.child_count() => Err(TreeError::ChildIndex {
                    task: cx.id(),
                    index,
                    children: cx.child_count(),
                }),
                other => Ok(other),
            };
        }
        for index in 0..cx.child_count() {
            if cx.check_child_guard(index)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl<C> Default for Switch<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Behavior<C> for Switch<C> {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn inlinable(&self) -> bool {
        true
    }

    fn before_enter(&mut self) {
        self.selected = None;
    }

    fn enter(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        if cx.child_count() == 0 {
            return Ok(Status::CHILDLESS);
        }
        self.selected = self.select(cx)?;
        match self.selected {
            Some(index) => {
                tracing::trace!(task = %cx.id(), index, "switch selected child");
                Ok(Status::Running)
            }
            None => Ok(Status::ERROR),
        }
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        let generation = cx.generation();
        let index = match self.selected {
            Some(index) => index,
            None => match self.select(cx)? {
                Some(index) => {
                    self.selected = Some(index);
                    index
                }
                None => return Ok(Status::ERROR),
            },
        };
        let status = cx.run_child_without_guard(index)?;
        if let Some(status) = cx.checkpoint(generation)? {
            return Ok(status);
        }
        Ok(status)
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, BehaviorTree, Condition, FailureKind, TaskTree};

    #[derive(Default)]
    struct Counters {
        runs: [u32; 3],
        open: [bool; 3],
    }

    fn branch(tree: &mut TaskTree<Counters>, slot: usize) -> TaskId {
        let body = tree.insert(Action::new(move |cx: &mut TickContext<'_, Counters>| {
            cx.blackboard_mut().runs[slot] += 1;
            Status::Failure(FailureKind::Custom(slot as u16))
        }));
        let guard = tree.insert(Condition::new(move |board: &Counters| board.open[slot]));
        tree.set_guard(body, guard).unwrap();
        body
    }

    #[test]
    fn runs_first_permitted_child_only() {
        let mut tree = TaskTree::new();
        let children: Vec<_> = (0..3).map(|slot| branch(&mut tree, slot)).collect();
        let switch = tree.switch(children.clone()).unwrap();

        let board = Counters {
            open: [false, true, true],
            ..Default::default()
        };
        let mut bt = BehaviorTree::new(tree, switch, board).unwrap();

        assert_eq!(bt.tick(1).unwrap(), Status::Failure(FailureKind::Custom(1)));
        assert_eq!(bt.blackboard().runs, [0, 1, 0]);
        assert_eq!(bt.tree().behavior::<Switch<Counters>>(switch).unwrap().selected(), Some(1));
        // Guard of the third child is never consulted.
        assert_eq!(bt.tree().status(bt.tree().guard(children[2]).unwrap()), Status::New);
    }

    #[test]
    fn no_permitted_child_fails() {
        let mut tree = TaskTree::new();
        let children: Vec<_> = (0..2).map(|slot| branch(&mut tree, slot)).collect();
        let switch = tree.switch(children).unwrap();

        let mut bt = BehaviorTree::new(tree, switch, Counters::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::ERROR);
        assert_eq!(bt.blackboard().runs, [0, 0, 0]);
    }

    #[test]
    fn handler_overrides_guards() {
        let mut tree = TaskTree::new();
        let children: Vec<_> = (0..3).map(|slot| branch(&mut tree, slot)).collect();
        let switch = tree.insert(Switch::with_handler(|_: &[TaskId], _: &Counters| Some(2)));
        tree.attach_all(switch, children).unwrap();

        let mut bt = BehaviorTree::new(tree, switch, Counters::default()).unwrap();
        assert_eq!(bt.tick(1).unwrap(), Status::Failure(FailureKind::Custom(2)));
        assert_eq!(bt.blackboard().runs, [0, 0, 1]);
    }

    #[test]
    fn handler_index_out_of_range_is_an_error() {
        let mut tree = TaskTree::new();
        let only = branch(&mut tree, 0);
        let switch = tree.insert(Switch::with_handler(|_: &[TaskId], _: &Counters| Some(4)));
        tree.attach(switch, only).unwrap();

        let mut bt = BehaviorTree::new(tree, switch, Counters::default()).unwrap();
        assert_eq!(
            bt.tick(1),
            Err(TreeError::ChildIndex {
                task: switch,
                index: 4,
                children: 1,
            })
        );
    }
}
