//! Typed, ordered source tree with safe in-place mutation
//!
//! This module contains the node model that the rewrite engine operates on.
//! A [`Tree`] owns every node in an arena and hands out stable [`NodeId`]
//! handles; parent and sibling relationships are derived from each node's
//! position in its parent's ordered child list rather than stored as
//! pointers, so there is nothing to keep consistent besides the child lists
//! themselves.
//!
//! The tree is built once by a host tokenizer, rewritten in place by rule
//! passes, and serialized back to text by concatenating leaf content in
//! document order. Before any rule runs, [`Tree::source`] reproduces the
//! original input exactly.
//!
//! # Example
//!
//! ```rust
//! use srcpolish::tree::{NodeKind, Tree};
//!
//! let mut tree = Tree::new();
//! let root = tree.root();
//! let text = tree.new_leaf(NodeKind::Text, "return;");
//! let newline = tree.new_leaf(NodeKind::Newline, "\n");
//! tree.append_child(root, text).unwrap();
//! tree.append_child(root, newline).unwrap();
//!
//! assert_eq!(tree.source(), "return;\n");
//! assert_eq!(tree.next_sibling(text).unwrap(), Some(newline));
//! ```

use crate::error::{EngineError, Result};

/// Stable handle to a node inside a [`Tree`]
///
/// Ids are arena indices: they stay valid for the lifetime of the tree and
/// are never reused, even after the node they name has been destroyed.
/// Every accessor rejects an id whose node is gone, so holding on to a
/// handle across a mutation is detected rather than silently misbehaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of node kinds the engine understands
///
/// Leaf kinds carry the raw text span they own; composite kinds own no
/// direct text, only children. Delimited constructs keep their delimiters
/// as ordinary leaf children (a `Braces` node's first and last children are
/// the `{` and `}` text leaves), which is what makes leaf concatenation
/// reproduce the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The single tree root
    Root,
    /// Generic text run; also the kind substituted by `replace_with_text`
    Text,
    /// Horizontal whitespace inside a line
    Whitespace,
    /// Leading whitespace at the start of a line
    Indenting,
    /// Line break
    Newline,
    /// `/* ... */` comment
    CComment,
    /// `// ...` comment
    CppComment,
    /// Parenthesized group
    Parenthesis,
    /// Brace-delimited block
    Braces,
    /// Method declaration, e.g. `- (void) foo;`
    MethodDeclaration,
    /// Method implementation, e.g. `- (void) foo { ... }`
    MethodImplementation,
}

impl NodeKind {
    /// True for the whitespace-like kinds: `Whitespace`, `Indenting`, `Newline`
    pub fn is_whitespace(self) -> bool {
        matches!(
            self,
            NodeKind::Whitespace | NodeKind::Indenting | NodeKind::Newline
        )
    }

    /// True for both comment kinds
    pub fn is_comment(self) -> bool {
        matches!(self, NodeKind::CComment | NodeKind::CppComment)
    }

    /// True for kinds that own children instead of direct text
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            NodeKind::Root
                | NodeKind::Parenthesis
                | NodeKind::Braces
                | NodeKind::MethodDeclaration
                | NodeKind::MethodImplementation
        )
    }

    /// Display name used in errors and debug dumps
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Text => "text",
            NodeKind::Whitespace => "whitespace",
            NodeKind::Indenting => "indenting",
            NodeKind::Newline => "newline",
            NodeKind::CComment => "c-comment",
            NodeKind::CppComment => "cpp-comment",
            NodeKind::Parenthesis => "parenthesis",
            NodeKind::Braces => "braces",
            NodeKind::MethodDeclaration => "method-declaration",
            NodeKind::MethodImplementation => "method-implementation",
        }
    }
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    content: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed source tree
///
/// All structural changes go through the mutation methods
/// ([`remove_from_parent`](Tree::remove_from_parent),
/// [`replace_with_text`](Tree::replace_with_text),
/// [`insert_previous_sibling`](Tree::insert_previous_sibling),
/// [`insert_next_sibling`](Tree::insert_next_sibling) and the constructors);
/// each one either completes atomically or rejects the request and leaves
/// the tree untouched. A revision counter increments on every successful
/// structural change, which is how the pipeline detects a fixpoint.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<NodeData>>,
    revision: u64,
}

impl Tree {
    /// Create an empty tree containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData {
                kind: NodeKind::Root,
                content: String::new(),
                parent: None,
                children: Vec::new(),
            })],
            revision: 0,
        }
    }

    /// The root node; always alive, never detachable
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of structural mutations performed so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `id` names a node that still exists
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index())
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes
            .get(id.index())
            .and_then(|slot| slot.as_ref())
            .ok_or(EngineError::NodeDestroyed(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .ok_or(EngineError::NodeDestroyed(id))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(data));
        id
    }

    /// Create a detached leaf node
    ///
    /// The node has no parent until attached with
    /// [`append_child`](Tree::append_child) or one of the sibling
    /// insertions. `kind` must not be a composite kind.
    pub fn new_leaf(&mut self, kind: NodeKind, content: impl Into<String>) -> NodeId {
        debug_assert!(!kind.is_composite(), "leaf constructor used for {kind:?}");
        self.alloc(NodeData {
            kind,
            content: content.into(),
            parent: None,
            children: Vec::new(),
        })
    }

    /// Create a detached composite node with no children yet
    pub fn new_branch(&mut self, kind: NodeKind) -> NodeId {
        debug_assert!(kind.is_composite(), "branch constructor used for {kind:?}");
        self.alloc(NodeData {
            kind,
            content: String::new(),
            parent: None,
            children: Vec::new(),
        })
    }

    // ----- read-only queries -------------------------------------------------

    /// The node's kind tag
    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind)
    }

    /// The raw text span this node directly owns (empty for composites)
    pub fn content(&self, id: NodeId) -> Result<&str> {
        Ok(self.node(id)?.content.as_str())
    }

    /// The parent, or `None` for the root and for detached nodes
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// The node's ordered children
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children.as_slice())
    }

    /// First child in document order, if any
    pub fn first_child(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.children.first().copied())
    }

    /// Last child in document order, if any
    pub fn last_child(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.children.last().copied())
    }

    /// Shortcut for `kind(id)?.is_whitespace()`
    pub fn is_whitespace(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.kind.is_whitespace())
    }

    /// Position of `id` in its parent's child list
    ///
    /// Recomputed on every call; sibling queries are position arithmetic
    /// over this, never stored pointers.
    fn position_in_parent(&self, id: NodeId) -> Result<Option<(NodeId, usize)>> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|&child| child == id)
            .expect("attached node missing from its parent's child list");
        Ok(Some((parent, index)))
    }

    /// The sibling immediately before this node, `None` at the boundary
    pub fn previous_sibling(&self, id: NodeId) -> Result<Option<NodeId>> {
        match self.position_in_parent(id)? {
            Some((parent, index)) if index > 0 => {
                Ok(Some(self.node(parent)?.children[index - 1]))
            }
            _ => Ok(None),
        }
    }

    /// The sibling immediately after this node, `None` at the boundary
    pub fn next_sibling(&self, id: NodeId) -> Result<Option<NodeId>> {
        match self.position_in_parent(id)? {
            Some((parent, index)) => {
                Ok(self.node(parent)?.children.get(index + 1).copied())
            }
            None => Ok(None),
        }
    }

    /// First sibling at or after `next_sibling` whose kind equals `kind`
    ///
    /// Used, for example, to locate the parameter list after a method
    /// selector token. Returns `None` when no such sibling exists before
    /// the parent's last child.
    pub fn find_next_sibling_of_kind(
        &self,
        id: NodeId,
        kind: NodeKind,
    ) -> Result<Option<NodeId>> {
        let mut cursor = self.next_sibling(id)?;
        while let Some(sibling) = cursor {
            if self.kind(sibling)? == kind {
                return Ok(Some(sibling));
            }
            cursor = self.next_sibling(sibling)?;
        }
        Ok(None)
    }

    /// Count of strict ancestors whose kind equals `kind`
    ///
    /// Walks `parent` links up to the root. Used for brace-nesting depth.
    pub fn depth_in_parents_of_kind(&self, id: NodeId, kind: NodeKind) -> Result<usize> {
        let mut depth = 0;
        let mut cursor = self.node(id)?.parent;
        while let Some(ancestor) = cursor {
            let data = self.node(ancestor)?;
            if data.kind == kind {
                depth += 1;
            }
            cursor = data.parent;
        }
        Ok(depth)
    }

    /// The node after `id` in pre-order document order
    ///
    /// First child if any, else next sibling, else the nearest ancestor's
    /// next sibling. `None` once the whole tree has been walked.
    pub fn next_preorder(&self, id: NodeId) -> Result<Option<NodeId>> {
        if let Some(child) = self.first_child(id)? {
            return Ok(Some(child));
        }
        self.next_preorder_after(id)
    }

    /// Like [`next_preorder`](Tree::next_preorder) but skipping the node's
    /// own subtree
    pub fn next_preorder_after(&self, id: NodeId) -> Result<Option<NodeId>> {
        let mut cursor = id;
        loop {
            if let Some(sibling) = self.next_sibling(cursor)? {
                return Ok(Some(sibling));
            }
            match self.node(cursor)?.parent {
                Some(parent) => cursor = parent,
                None => return Ok(None),
            }
        }
    }

    /// Pre-order iterator over `start` and its whole subtree
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: if self.is_alive(start) {
                vec![start]
            } else {
                Vec::new()
            },
        }
    }

    /// Concatenate leaf content in document order
    ///
    /// On a freshly parsed tree this reproduces the original input exactly;
    /// after a pipeline run it is the normalized output the host writes
    /// back out.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for id in self.descendants(self.root()) {
            let data = self.nodes[id.index()].as_ref().expect("live id from iterator");
            if data.children.is_empty() {
                out.push_str(&data.content);
            }
        }
        out
    }

    // ----- mutation ----------------------------------------------------------

    fn ensure_detached(&self, id: NodeId) -> Result<()> {
        let data = self.node(id)?;
        if id == self.root() {
            return Err(EngineError::RootDetach);
        }
        if data.parent.is_some() {
            return Err(EngineError::AlreadyAttached(id));
        }
        Ok(())
    }

    /// Reject attachments that would make `new` its own ancestor
    fn ensure_no_cycle(&self, target: NodeId, new: NodeId) -> Result<()> {
        let mut cursor = Some(target);
        while let Some(ancestor) = cursor {
            if ancestor == new {
                return Err(EngineError::AlreadyAttached(new));
            }
            cursor = self.node(ancestor)?.parent;
        }
        Ok(())
    }

    /// Attach a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.node(parent)?.kind.is_composite() {
            return Err(EngineError::LeafChildren {
                kind: self.node(parent)?.kind.name(),
            });
        }
        self.ensure_detached(child)?;
        self.ensure_no_cycle(parent, child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.revision += 1;
        Ok(())
    }

    /// Detach the node and destroy it along with its subtree
    ///
    /// The former previous and next siblings become adjacent. Errors on the
    /// root and on nodes that are already detached; a rejected call changes
    /// nothing.
    pub fn remove_from_parent(&mut self, id: NodeId) -> Result<()> {
        let Some((parent, index)) = self.position_in_parent(id)? else {
            return Err(if id == self.root() {
                EngineError::RootDetach
            } else {
                EngineError::NodeDetached(id)
            });
        };
        self.node_mut(parent)?.children.remove(index);
        self.destroy_subtree(id);
        self.revision += 1;
        Ok(())
    }

    /// Destroy the node's subtree and substitute a fresh `Text` leaf at the
    /// same position under the same parent
    ///
    /// Passing empty text removes the node outright instead of leaving an
    /// empty leaf in the tree. Returns the id of the substituted leaf, or
    /// `None` in the empty-text case.
    pub fn replace_with_text(
        &mut self,
        id: NodeId,
        text: impl Into<String>,
    ) -> Result<Option<NodeId>> {
        let text = text.into();
        if text.is_empty() {
            self.remove_from_parent(id)?;
            return Ok(None);
        }
        let Some((parent, index)) = self.position_in_parent(id)? else {
            return Err(if id == self.root() {
                EngineError::RootDetach
            } else {
                EngineError::NodeDetached(id)
            });
        };
        let replacement = self.alloc(NodeData {
            kind: NodeKind::Text,
            content: text,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.node_mut(parent)?.children[index] = replacement;
        self.destroy_subtree(id);
        self.revision += 1;
        Ok(Some(replacement))
    }

    /// Insert a detached node immediately after this one, under the same
    /// parent
    pub fn insert_next_sibling(&mut self, id: NodeId, new: NodeId) -> Result<()> {
        self.insert_sibling(id, new, 1)
    }

    /// Insert a detached node immediately before this one, under the same
    /// parent
    pub fn insert_previous_sibling(&mut self, id: NodeId, new: NodeId) -> Result<()> {
        self.insert_sibling(id, new, 0)
    }

    fn insert_sibling(&mut self, id: NodeId, new: NodeId, offset: usize) -> Result<()> {
        let Some((parent, index)) = self.position_in_parent(id)? else {
            return Err(if id == self.root() {
                EngineError::RootDetach
            } else {
                EngineError::NodeDetached(id)
            });
        };
        self.ensure_detached(new)?;
        self.ensure_no_cycle(id, new)?;
        self.node_mut(parent)?.children.insert(index + offset, new);
        self.node_mut(new)?.parent = Some(parent);
        self.revision += 1;
        Ok(())
    }

    /// Tombstone a node and everything below it; ids are never reused
    fn destroy_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes[current.index()].take() {
                stack.extend(data.children);
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator returned by [`Tree::descendants`]
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Ok(children) = self.tree.children(id) {
            self.stack.extend(children.iter().rev().copied());
        }
        Some(id)
    }
}
