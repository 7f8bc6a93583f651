//! Closure-backed leaves.
//!
//! Domain leaves normally implement [`Behavior`] directly. These two cover
//! the common cases of a pure blackboard check and a one-shot or polled
//! action without a dedicated type.

use crate::error::Result;
use crate::{Behavior, Status, TickContext};

type Predicate<C> = Box<dyn FnMut(&C) -> bool + Send>;
type Step<C> = Box<dyn FnMut(&mut TickContext<'_, C>) -> Status + Send>;

/// Succeeds when the predicate holds, fails otherwise. Completes in the tick
/// it is entered, which makes it the usual guard building block.
pub struct Condition<C> {
    predicate: Predicate<C>,
}

impl<C> Condition<C> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: FnMut(&C) -> bool + Send + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl<C> Behavior<C> for Condition<C> {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn max_children(&self) -> Option<usize> {
        Some(0)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        Ok(if (self.predicate)(cx.blackboard()) {
            Status::Success
        } else {
            Status::ERROR
        })
    }
}

/// Calls the closure once per execute and reports what it returns.
///
/// The closure receives the leaf's own [`TickContext`], so it can read the
/// step, its run frame count and its cancel token besides the blackboard.
pub struct Action<C> {
    step: Step<C>,
}

impl<C> Action<C> {
    pub fn new<F>(step: F) -> Self
    where
        F: FnMut(&mut TickContext<'_, C>) -> Status + Send + 'static,
    {
        Self {
            step: Box::new(step),
        }
    }
}

impl<C> Behavior<C> for Action<C> {
    fn name(&self) -> &'static str {
        "action"
    }

    fn max_children(&self) -> Option<usize> {
        Some(0)
    }

    fn execute(&mut self, cx: &mut TickContext<'_, C>) -> Result<Status> {
        Ok((self.step)(cx))
    }
}
