//! Re-entrant behavior tree runtime.
//!
//! This library provides a tick-driven behavior tree engine where nodes keep
//! running across ticks, completions cascade upward within the tick that
//! produced them, and long chains of single-child nodes collapse into direct
//! references for cheap ticking and event routing.
//!
//! - **Explicit lifecycle**: `before_enter -> enter -> execute* -> exit`, with
//!   `exit` guaranteed once per run, cancellation included
//! - **Arena ownership**: nodes live in a [`TaskTree`] and refer to each other
//!   by [`TaskId`]
//! - **Cooperative cancellation**: a shared [`CancelToken`] observed at
//!   checkpoints; per-child tokens for parallel branches
//! - **Reentry safety**: a per-node run generation discards results computed
//!   for a run that has since been restarted or stopped
//!
//! # Architecture
//!
//! - [`Behavior`]: Lifecycle trait for all nodes
//! - [`TickContext`]: Engine operations available to a node while it runs
//! - [`Status`]: `New`, `Running` or a terminal state with a [`FailureKind`]
//! - Single-running branches: [`Selector`], [`Sequence`], [`Switch`]
//! - Parallel branches: [`SimpleParallel`]
//! - Decorators: [`ForceSuccess`], [`ForceFailure`], [`ForceRunning`],
//!   [`Inverter`], [`Loop`]
//! - Leaves: [`Condition`], [`Action`]
//! - Driver: [`BehaviorTree`]
//!
//! # Example
//!
//! ```
//! use btree_engine::{BehaviorTree, Status, TaskTree};
//!
//! let mut tree: TaskTree<u32> = TaskTree::new();
//! let low = tree.condition(|hp| *hp < 30);
//! let flee = tree.action(|_| Status::Success);
//! let flee = tree.guarded(flee, low).unwrap();
//! let fight = tree.action(|cx| {
//!     *cx.blackboard_mut() -= 10;
//!     Status::Success
//! });
//! let top = tree.selector([flee, fight]).unwrap();
//!
//! let mut bt = BehaviorTree::new(tree, top, 100).unwrap();
//! assert_eq!(bt.tick(1).unwrap(), Status::Success);
//! assert_eq!(*bt.blackboard(), 90);
//! ```

pub mod behavior;
pub mod builder;
pub mod cancel;
pub mod composite;
pub mod config;
pub mod decorator;
pub mod entry;
pub mod error;
pub mod inline;
pub mod leaf;
pub mod looping;
pub mod parallel;
pub mod status;
pub mod switch;
pub mod tree;

// Re-export core types for ergonomic API
pub use behavior::{Behavior, TickContext};
pub use cancel::CancelToken;
pub use composite::{Selector, Sequence, SingleRunning, SingleRunningBranch};
pub use config::TreeConfig;
pub use decorator::{ForceFailure, ForceRunning, ForceSuccess, Inverter};
pub use entry::BehaviorTree;
pub use error::{Result, TreeError};
pub use inline::InlineHelper;
pub use leaf::{Action, Condition};
pub use looping::{Loop, LoopHook, Repeat, UntilFailure, UntilSuccess};
pub use parallel::{ParallelChildHelper, ParallelChildren, SimpleParallel};
pub use status::{FailureKind, Status};
pub use switch::{Switch, SwitchHandler};
pub use tree::{TaskId, TaskTree};
