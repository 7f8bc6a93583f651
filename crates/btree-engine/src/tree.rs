//! Node arena.
//!
//! Every node of a tree lives in one [`TaskTree`]. Parents own their children
//! through the arena and refer to them by [`TaskId`]; the parent link is a
//! plain handle used for ownership checks, never for traversal ownership.

use std::any::Any;
use std::fmt;

use bitflags::bitflags;

use crate::error::{Result, TreeError};
use crate::inline::InlineHelper;
use crate::{Behavior, CancelToken, Status};

/// Handle to a node inside a [`TaskTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct NodeFlags: u8 {
        /// Parents may cache this node's own inline target instead of the node.
        const INLINABLE = 1;
        /// The node is being evaluated as another node's guard.
        const CHECKING_GUARD = 1 << 1;
        /// Completed, but the parent has not looked at the result yet.
        const UNOBSERVED = 1 << 2;
        /// The node is owned as a guard rather than as a child.
        const GUARD = 1 << 3;
    }
}

pub(crate) struct Node<C> {
    /// Taken out while the node's own hooks run.
    pub(crate) behavior: Option<Box<dyn Behavior<C>>>,
    pub(crate) name: &'static str,
    pub(crate) max_children: Option<usize>,
    pub(crate) status: Status,
    pub(crate) guard: Option<TaskId>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) parent: Option<TaskId>,
    pub(crate) generation: u32,
    pub(crate) run_frames: u32,
    pub(crate) token: CancelToken,
    pub(crate) inline: InlineHelper,
    pub(crate) flags: NodeFlags,
}

/// Arena owning every node of one behavior tree.
pub struct TaskTree<C> {
    nodes: Vec<Node<C>>,
}

impl<C> TaskTree<C> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a detached node and returns its handle.
    pub fn insert<B>(&mut self, behavior: B) -> TaskId
    where
        B: Behavior<C> + 'static,
    {
        self.insert_boxed(Box::new(behavior))
    }

    pub fn insert_boxed(&mut self, behavior: Box<dyn Behavior<C>>) -> TaskId {
        let id = TaskId(self.nodes.len());
        let mut flags = NodeFlags::empty();
        if behavior.inlinable() {
            flags |= NodeFlags::INLINABLE;
        }
        self.nodes.push(Node {
            name: behavior.name(),
            max_children: behavior.max_children(),
            behavior: Some(behavior),
            status: Status::New,
            guard: None,
            children: Vec::new(),
            parent: None,
            generation: 0,
            run_frames: 0,
            token: CancelToken::new(),
            inline: InlineHelper::default(),
            flags,
        });
        id
    }

    /// Appends `child` to `parent`'s children.
    ///
    /// Fails if either handle is unknown, if `child` already has an owner,
    /// if `parent` is full, or if the edge would close a cycle.
    pub fn attach(&mut self, parent: TaskId, child: TaskId) -> Result<()> {
        self.check_adoptable(parent, child)?;
        self.check_capacity(parent, 1)?;
        self.link(parent, child);
        Ok(())
    }

    /// Attaches several children in order.
    ///
    /// All or nothing: every child is validated before the first one is
    /// linked, so on `Err` the tree is unchanged.
    pub fn attach_all(
        &mut self,
        parent: TaskId,
        children: impl IntoIterator<Item = TaskId>,
    ) -> Result<()> {
        let children: Vec<TaskId> = children.into_iter().collect();
        for (index, &child) in children.iter().enumerate() {
            self.check_adoptable(parent, child)?;
            if children[..index].contains(&child) {
                return Err(TreeError::AlreadyAttached {
                    child,
                    owner: parent,
                });
            }
        }
        self.check_capacity(parent, children.len())?;
        for child in children {
            self.link(parent, child);
        }
        Ok(())
    }

    fn link(&mut self, parent: TaskId, child: TaskId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn check_capacity(&self, parent: TaskId, extra: usize) -> Result<()> {
        let node = self.node(parent);
        match node.max_children {
            Some(max) if node.children.len() + extra > max => Err(TreeError::TooManyChildren {
                parent,
                name: node.name,
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Makes `guard` the guard of `node`, replacing and detaching any
    /// previous guard.
    pub fn set_guard(&mut self, node: TaskId, guard: TaskId) -> Result<()> {
        self.check_adoptable(node, guard)?;
        if let Some(previous) = self.node_mut(node).guard.take() {
            let old = self.node_mut(previous);
            old.parent = None;
            old.flags.remove(NodeFlags::GUARD);
        }
        let guard_node = self.node_mut(guard);
        guard_node.parent = Some(node);
        guard_node.flags.insert(NodeFlags::GUARD);
        self.node_mut(node).guard = Some(guard);
        Ok(())
    }

    fn check_adoptable(&self, owner: TaskId, child: TaskId) -> Result<()> {
        self.check(owner)?;
        self.check(child)?;
        if let Some(existing) = self.node(child).parent {
            return Err(TreeError::AlreadyAttached {
                child,
                owner: existing,
            });
        }
        // `child` has no owner, so it is a root; the edge closes a cycle only
        // if `owner` sits somewhere below it.
        let mut cursor = Some(owner);
        while let Some(current) = cursor {
            if current == child {
                return Err(TreeError::Cycle {
                    parent: owner,
                    child,
                });
            }
            cursor = self.node(current).parent;
        }
        Ok(())
    }

    fn check(&self, id: TaskId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TreeError::UnknownTask(id))
        }
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        id.0 < self.nodes.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ===== queries =====
    // These index the arena directly and panic on handles from another tree.

    pub fn status(&self, id: TaskId) -> Status {
        self.node(id).status
    }

    pub fn children(&self, id: TaskId) -> &[TaskId] {
        &self.node(id).children
    }

    /// The owning node: the parent for children, the guarded node for guards.
    pub fn parent(&self, id: TaskId) -> Option<TaskId> {
        self.node(id).parent
    }

    pub fn guard(&self, id: TaskId) -> Option<TaskId> {
        self.node(id).guard
    }

    pub fn name(&self, id: TaskId) -> &'static str {
        self.node(id).name
    }

    /// How many times the node has been (re)entered.
    pub fn generation(&self, id: TaskId) -> u32 {
        self.node(id).generation
    }

    /// Number of `execute` calls in the node's current run.
    pub fn run_frames(&self, id: TaskId) -> u32 {
        self.node(id).run_frames
    }

    /// The innermost running node this node currently stands in for.
    pub fn inlined(&self, id: TaskId) -> Option<TaskId> {
        self.node(id).inline.running_target(self)
    }

    /// Downcasts the node's behavior for inspection.
    ///
    /// Returns `None` while the node is executing or when the behavior does
    /// not expose itself through [`Behavior::as_any`].
    pub fn behavior<T: Any>(&self, id: TaskId) -> Option<&T> {
        self.node(id)
            .behavior
            .as_deref()?
            .as_any()?
            .downcast_ref::<T>()
    }

    #[inline]
    pub(crate) fn node(&self, id: TaskId) -> &Node<C> {
        &self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: TaskId) -> &mut Node<C> {
        &mut self.nodes[id.0]
    }
}

impl<C> Default for TaskTree<C> {
    fn default() -> Self {
        Self::new()
    }
}
