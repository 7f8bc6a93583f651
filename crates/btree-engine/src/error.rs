//! Structural errors raised by the engine.
//!
//! Task outcomes are never errors: a failing leaf completes with
//! [`Status::Failure`](crate::Status::Failure). These variants signal broken
//! tree invariants and are surfaced to the caller of `tick` or of the
//! building operations.

use thiserror::Error;

use crate::TaskId;

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("task {0} does not belong to this tree")]
    UnknownTask(TaskId),

    #[error("task {child} is already owned by {owner}")]
    AlreadyAttached { child: TaskId, owner: TaskId },

    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: TaskId, child: TaskId },

    #[error("{parent} ({name}) accepts at most {max} children")]
    TooManyChildren {
        parent: TaskId,
        name: &'static str,
        max: usize,
    },

    #[error("{task} has no child left to run (children: {children}, running index: {index:?})")]
    ChildrenExhausted {
        task: TaskId,
        children: usize,
        index: Option<usize>,
    },

    #[error("child index {index} is out of range for {task} ({children} children)")]
    ChildIndex {
        task: TaskId,
        index: usize,
        children: usize,
    },

    #[error("task {0} was re-entered while it was already executing")]
    Reentrant(TaskId),
}
