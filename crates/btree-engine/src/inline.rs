//! Child inlining.
//!
//! A chain of nodes that each have a single running child is pure dispatch
//! overhead once the chain is established. The parent at the top of such a
//! chain keeps an [`InlineHelper`] pointing at the innermost running node and
//! ticks it directly; external events take the same shortcut.
//!
//! The helper is a handle, not ownership: it is cleared as soon as the chain
//! breaks and is re-established after the parent's next step.

use crate::tree::{NodeFlags, TaskTree};
use crate::TaskId;

/// Per-parent record of the node the parent currently stands in for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InlineHelper {
    inlined: Option<TaskId>,
}

impl InlineHelper {
    /// The cached innermost running node, if any.
    #[inline]
    pub fn inlined(&self) -> Option<TaskId> {
        self.inlined
    }

    #[inline]
    pub fn stop_inline(&mut self) {
        self.inlined = None;
    }

    /// Caches the innermost running node reachable from `child`.
    ///
    /// An inlinable child contributes its own cached node when that node is
    /// still running; any other child (leaf, parallel branch) is cached as is.
    pub(crate) fn inline_child<C>(&mut self, tree: &TaskTree<C>, child: TaskId) {
        let node = tree.node(child);
        let target = if node.flags.contains(NodeFlags::INLINABLE) {
            node.inline
                .inlined()
                .filter(|&inner| tree.node(inner).status.is_running())
                .unwrap_or(child)
        } else {
            child
        };
        if self.inlined != Some(target) {
            tracing::trace!(%child, %target, "inline chain established");
        }
        self.inlined = Some(target);
    }

    /// Returns the cached node if it is still running.
    pub(crate) fn running_target<C>(&self, tree: &TaskTree<C>) -> Option<TaskId> {
        self.inlined
            .filter(|&target| tree.node(target).status.is_running())
    }
}
