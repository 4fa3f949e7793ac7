/// Render-tree bookkeeping for event targeting
///
/// Widgets that need to reason about "where did this event land" register
/// nodes here instead of holding references into the widget tree:
/// - `NodeTree` is an arena of nodes with parent links (containment checks)
/// - `Document` wraps the tree together with document-level listeners
/// - `ListenerGuard` is the scoped handle returned when listening; dropping
///   it deregisters the listener
///
/// Everything here is single-threaded and lives on the UI thread.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

/// Handle to a node in the render tree.
///
/// A handle carries no ownership. It may outlive its node, in which case
/// every lookup treats it as detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Handle to a registered document-level listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Events originating at or below this node never reach the document
    stops_propagation: bool,
}

/// Arena of render nodes with parent links
#[derive(Debug)]
pub struct NodeTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree containing only the root (document) node
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                parent: None,
                children: Vec::new(),
                stops_propagation: false,
            },
        );

        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Append a new child under `parent`.
    /// Returns `None` if the parent is no longer in the tree.
    pub fn append(&mut self, parent: NodeId) -> Option<NodeId> {
        if !self.is_live(parent) {
            return None;
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;

        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                children: Vec::new(),
                stops_propagation: false,
            },
        );
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }

        Some(id)
    }

    /// Mark a node as intercepting events raised inside its subtree
    pub fn set_stops_propagation(&mut self, node: NodeId, stops: bool) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.stops_propagation = stops;
        }
    }

    /// Remove a node and its whole subtree.
    /// Returns the number of nodes removed. The root is never removed.
    pub fn remove(&mut self, node: NodeId) -> usize {
        if node == self.root || !self.is_live(node) {
            return 0;
        }

        // Unlink from the parent first
        if let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != node);
            }
        }

        let mut removed = 0;
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if let Some(entry) = self.nodes.remove(&current) {
                pending.extend(entry.children);
                removed += 1;
            }
        }

        removed
    }

    /// Is `node` equal to `ancestor` or one of its descendants?
    ///
    /// Detached handles on either side are never contained.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_live(ancestor) {
            return false;
        }
        self.ancestors(node).any(|id| id == ancestor)
    }

    /// Walk from `node` up to the root (inclusive on both ends)
    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.is_live(node).then_some(node);
        std::iter::successors(start, move |id| self.nodes.get(id).and_then(|n| n.parent))
    }

    /// First node on the path to the root that intercepts events
    fn interceptor(&self, target: NodeId) -> Option<NodeId> {
        self.ancestors(target)
            .find(|id| self.nodes.get(id).is_some_and(|n| n.stops_propagation))
    }
}

/// Outcome of dispatching an event to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A node on the target's path intercepted the event
    Stopped(NodeId),
    /// The event bubbled up to the document and reached these listeners
    Delivered(Vec<ListenerId>),
}

impl Dispatch {
    /// Did the event reach the given listener?
    pub fn reached(&self, listener: ListenerId) -> bool {
        match self {
            Dispatch::Stopped(_) => false,
            Dispatch::Delivered(listeners) => listeners.contains(&listener),
        }
    }
}

struct DocumentInner {
    tree: NodeTree,
    /// Document-level pointer-down listeners
    listeners: BTreeSet<ListenerId>,
    next_listener: u64,
}

/// Shared handle to the render tree and its document-level listeners.
///
/// Cloning yields another handle to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                tree: NodeTree::new(),
                listeners: BTreeSet::new(),
                next_listener: 0,
            })),
        }
    }

    pub fn root(&self) -> NodeId {
        self.inner.borrow().tree.root()
    }

    pub fn append(&self, parent: NodeId) -> Option<NodeId> {
        self.inner.borrow_mut().tree.append(parent)
    }

    /// Append a node that stops events from bubbling past it
    pub fn append_isolated(&self, parent: NodeId) -> Option<NodeId> {
        let mut inner = self.inner.borrow_mut();
        let node = inner.tree.append(parent)?;
        inner.tree.set_stops_propagation(node, true);
        Some(node)
    }

    pub fn remove(&self, node: NodeId) -> usize {
        self.inner.borrow_mut().tree.remove(node)
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().tree.contains(ancestor, node)
    }

    pub fn node_count(&self) -> usize {
        self.inner.borrow().tree.node_count()
    }

    /// Register a document-level pointer-down listener.
    ///
    /// The listener stays registered for as long as the returned guard lives.
    pub fn listen(&self) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.insert(id);

        ListenerGuard {
            id,
            document: Rc::downgrade(&self.inner),
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Bubble a pointer-down from `target` towards the document.
    ///
    /// Targets that are no longer in the tree bubble straight to the
    /// document, as a detached element would.
    pub fn dispatch(&self, target: NodeId) -> Dispatch {
        let inner = self.inner.borrow();

        if let Some(interceptor) = inner.tree.interceptor(target) {
            return Dispatch::Stopped(interceptor);
        }

        Dispatch::Delivered(inner.listeners.iter().copied().collect())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Scoped registration of a document-level listener.
///
/// Dropping the guard removes the listener. The guard only holds a weak
/// reference, so releasing it after the document is gone does nothing.
pub struct ListenerGuard {
    id: ListenerId,
    document: Weak<RefCell<DocumentInner>>,
}

impl ListenerGuard {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.document.upgrade() {
            inner.borrow_mut().listeners.remove(&self.id);
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerGuard").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_descendants_only() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.append(root).unwrap();
        let a_child = tree.append(a).unwrap();
        let b = tree.append(root).unwrap();

        assert!(tree.contains(a, a));
        assert!(tree.contains(a, a_child));
        assert!(!tree.contains(a, b));
        assert!(!tree.contains(a_child, a));
        assert!(tree.contains(root, b));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.append(root).unwrap();
        let a_child = tree.append(a).unwrap();
        tree.append(a_child).unwrap();

        assert_eq!(tree.remove(a), 3);
        assert_eq!(tree.node_count(), 1);
        assert!(!tree.is_live(a_child));
        assert!(!tree.contains(a, a_child));

        // Root and stale handles are ignored
        assert_eq!(tree.remove(root), 0);
        assert_eq!(tree.remove(a), 0);
        assert!(tree.append(a).is_none());
    }

    #[test]
    fn test_dispatch_stops_at_isolated_node() {
        let document = Document::new();
        let root = document.root();
        let panel = document.append_isolated(root).unwrap();
        let button = document.append(panel).unwrap();
        let outside = document.append(root).unwrap();

        let guard = document.listen();

        assert_eq!(document.dispatch(button), Dispatch::Stopped(panel));
        assert_eq!(document.dispatch(panel), Dispatch::Stopped(panel));
        assert!(document.dispatch(outside).reached(guard.id()));
        assert!(document.dispatch(root).reached(guard.id()));
    }

    #[test]
    fn test_detached_target_reaches_document() {
        let document = Document::new();
        let panel = document.append_isolated(document.root()).unwrap();
        let button = document.append(panel).unwrap();
        let guard = document.listen();

        document.remove(panel);
        assert!(document.dispatch(button).reached(guard.id()));
    }

    #[test]
    fn test_guard_drop_deregisters() {
        let document = Document::new();
        let first = document.listen();
        let second = document.listen();
        assert_eq!(document.listener_count(), 2);

        let first_id = first.id();
        drop(first);
        assert_eq!(document.listener_count(), 1);
        assert!(!document.dispatch(document.root()).reached(first_id));
        assert!(document.dispatch(document.root()).reached(second.id()));
        drop(second);
        assert_eq!(document.listener_count(), 0);
    }

    #[test]
    fn test_guard_outliving_document() {
        let document = Document::new();
        let guard = document.listen();
        drop(document);
        // Must not panic
        drop(guard);
    }
}
