//! Rule-dispatch engine
//!
//! A [`Pipeline`] is an ordered list of passes. Each pass binds exactly one
//! [`Rule`] and performs one full pre-order traversal of the tree, invoking
//! the rule on every node whose kind it matches. Passes run strictly in
//! pipeline order; a later pass only ever sees the fully mutated tree
//! produced by the passes before it.
//!
//! Because a rule may remove or replace the node it is invoked on, or
//! remove and insert immediate siblings, the traversal cursor is advanced
//! with a recovery strategy instead of a stored "next" pointer: the cursor
//! captures the node's parent and following siblings before the rule runs,
//! and if the node is gone afterwards it resumes at the first of those
//! siblings still in place, falling back to the parent's continuation. A
//! destroyed node is never revisited and a pre-existing, still reachable
//! node is never skipped.
//!
//! Rules must confine structural changes to the current node and its
//! immediate siblings; inspecting arbitrary ancestors is fine. That is what
//! keeps the recovery strategy sound.
//!
//! # Example
//!
//! ```rust
//! use srcpolish::engine::Pipeline;
//! use srcpolish::rules::FormatConfig;
//! use srcpolish::tree::{NodeKind, Tree};
//!
//! let mut tree = Tree::new();
//! let root = tree.root();
//! let text = tree.new_leaf(NodeKind::Text, "x;");
//! let trailing = tree.new_leaf(NodeKind::Whitespace, "  ");
//! let newline = tree.new_leaf(NodeKind::Newline, "\n");
//! tree.append_child(root, text).unwrap();
//! tree.append_child(root, trailing).unwrap();
//! tree.append_child(root, newline).unwrap();
//!
//! let pipeline = Pipeline::standard(FormatConfig::default());
//! pipeline.run(&mut tree).unwrap();
//! assert_eq!(tree.source(), "x;\n");
//! ```

use tracing::{debug, trace};

use crate::error::Result;
use crate::tree::{NodeId, NodeKind, Tree};

/// One predicate-guarded transformation
///
/// `matches` is a pure predicate over the node kind; `apply` receives the
/// matching node with full read access to its neighborhood and write access
/// through the tree's mutation API.
pub trait Rule {
    /// Short name used in logs and rule errors
    fn name(&self) -> &'static str;

    /// Whether this rule wants to see nodes of `kind`
    fn matches(&self, kind: NodeKind) -> bool;

    /// Transform the matching node in place
    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()>;
}

/// One traversal of the tree bound to a single rule
pub struct Pass {
    rule: Box<dyn Rule>,
}

impl Pass {
    pub fn new(rule: impl Rule + 'static) -> Self {
        Self {
            rule: Box::new(rule),
        }
    }

    pub fn name(&self) -> &'static str {
        self.rule.name()
    }

    /// Run this pass over the whole tree once, returning the number of
    /// mutations it performed
    pub fn run(&self, tree: &mut Tree) -> Result<u64> {
        let start_revision = tree.revision();
        let mut cursor = Some(tree.root());
        while let Some(node) = cursor {
            let kind = tree.kind(node)?;
            if !self.rule.matches(kind) {
                cursor = tree.next_preorder(node)?;
                continue;
            }

            // Capture enough to recover the cursor if the rule destroys the
            // current node. Identities, not indices: the rule may remove a
            // previous sibling and shift every position.
            let parent = tree.parent(node)?;
            let following = match parent {
                Some(p) => {
                    let children = tree.children(p)?;
                    let index = children
                        .iter()
                        .position(|&child| child == node)
                        .expect("visited node missing from its parent");
                    children[index + 1..].to_vec()
                }
                None => Vec::new(),
            };

            trace!(rule = self.name(), ?node, kind = kind.name(), "rule hit");
            self.rule.apply(tree, node)?;

            cursor = if tree.is_alive(node) {
                tree.next_preorder(node)?
            } else {
                resume_after(tree, parent, &following)?
            };
        }
        Ok(tree.revision() - start_revision)
    }
}

/// Continue from the position a destroyed node occupied: its first
/// surviving former sibling, else the parent's continuation
fn resume_after(
    tree: &Tree,
    parent: Option<NodeId>,
    following: &[NodeId],
) -> Result<Option<NodeId>> {
    for &sibling in following {
        if tree.is_alive(sibling) && tree.parent(sibling)? == parent {
            return Ok(Some(sibling));
        }
    }
    match parent {
        Some(p) => tree.next_preorder_after(p),
        None => Ok(None),
    }
}

/// Ordered sequence of passes
///
/// Construct one from an explicit pass list, or use the presets in
/// [`crate::rules`] ([`Pipeline::standard`], [`Pipeline::strip_comments`]).
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    pub fn new(passes: Vec<Pass>) -> Self {
        Self { passes }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Run every pass once, in order
    ///
    /// Returns the total number of mutations. This is the ordering-based
    /// mode: the built-in catalog is sequenced so that a single sweep
    /// reaches its final form, and each individual pass is idempotent.
    pub fn run(&self, tree: &mut Tree) -> Result<u64> {
        let mut total = 0;
        for pass in &self.passes {
            let mutations = pass.run(tree)?;
            debug!(pass = pass.name(), mutations, "pass complete");
            total += mutations;
        }
        Ok(total)
    }

    /// Repeat full sweeps until one performs zero mutations
    ///
    /// Intended for host-supplied rule sets whose convergence is not
    /// ordering-based. Errors with
    /// [`EngineError::FixpointExhausted`](crate::error::EngineError::FixpointExhausted)
    /// when `max_cycles` sweeps still leave the tree changing.
    pub fn run_to_fixpoint(&self, tree: &mut Tree, max_cycles: usize) -> Result<u64> {
        let mut total = 0;
        for cycle in 0..max_cycles {
            let mutations = self.run(tree)?;
            total += mutations;
            if mutations == 0 {
                debug!(cycles = cycle + 1, total, "fixpoint reached");
                return Ok(total);
            }
        }
        Err(crate::error::EngineError::FixpointExhausted { max_cycles })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Records every node it is invoked on and removes every third one.
    struct RemoveEveryThird {
        visited: Rc<RefCell<Vec<String>>>,
    }

    impl Rule for RemoveEveryThird {
        fn name(&self) -> &'static str {
            "remove-every-third"
        }

        fn matches(&self, kind: NodeKind) -> bool {
            kind == NodeKind::Text
        }

        fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
            let mut visited = self.visited.borrow_mut();
            visited.push(tree.content(node)?.to_owned());
            if visited.len() % 3 == 0 {
                tree.remove_from_parent(node)?;
            }
            Ok(())
        }
    }

    /// Strips a whitespace previous sibling, then removes itself: the
    /// worst case for the cursor, since both the node and an earlier
    /// sibling disappear in one invocation.
    struct DropLineBreaks;

    impl Rule for DropLineBreaks {
        fn name(&self) -> &'static str {
            "drop-line-breaks"
        }

        fn matches(&self, kind: NodeKind) -> bool {
            kind == NodeKind::Newline
        }

        fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
            if let Some(prev) = tree.previous_sibling(node)? {
                if tree.is_whitespace(prev)? {
                    tree.remove_from_parent(prev)?;
                }
            }
            tree.remove_from_parent(node)?;
            Ok(())
        }
    }

    fn flat_tree(texts: &[&str]) -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        for text in texts {
            let leaf = tree.new_leaf(NodeKind::Text, *text);
            tree.append_child(root, leaf).unwrap();
        }
        tree
    }

    #[test]
    fn every_node_visited_exactly_once_under_removal() {
        let labels: Vec<String> = (0..10).map(|i| format!("n{i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let mut tree = flat_tree(&refs);

        let visited = Rc::new(RefCell::new(Vec::new()));
        let pass = Pass::new(RemoveEveryThird {
            visited: Rc::clone(&visited),
        });
        pass.run(&mut tree).unwrap();

        // Each pre-existing node is seen exactly once, in document order,
        // regardless of the removals happening under the cursor.
        assert_eq!(*visited.borrow(), labels);
        assert_eq!(tree.source(), "n0n1n3n4n6n7n9");
    }

    #[test]
    fn cursor_survives_removal_of_self_and_previous_sibling() {
        let mut tree = Tree::new();
        let root = tree.root();
        for (kind, text) in [
            (NodeKind::Text, "x;"),
            (NodeKind::Whitespace, " "),
            (NodeKind::Newline, "\n"),
            (NodeKind::Newline, "\n"),
            (NodeKind::Text, "y;"),
            (NodeKind::Newline, "\n"),
        ] {
            let leaf = tree.new_leaf(kind, text);
            tree.append_child(root, leaf).unwrap();
        }

        Pass::new(DropLineBreaks).run(&mut tree).unwrap();
        // Both newlines in the run are visited: removing the first must
        // resume at the second, not skip past it.
        assert_eq!(tree.source(), "x;y;");
    }

    #[test]
    fn traversal_descends_into_composites() {
        let mut tree = Tree::new();
        let root = tree.root();
        let before = tree.new_leaf(NodeKind::Newline, "\n");
        tree.append_child(root, before).unwrap();
        let braces = tree.new_branch(NodeKind::Braces);
        tree.append_child(root, braces).unwrap();
        for (kind, text) in [
            (NodeKind::Text, "{"),
            (NodeKind::Newline, "\n"),
            (NodeKind::Text, "}"),
        ] {
            let leaf = tree.new_leaf(kind, text);
            tree.append_child(braces, leaf).unwrap();
        }

        Pass::new(DropLineBreaks).run(&mut tree).unwrap();
        assert_eq!(tree.source(), "{}");
    }

    #[test]
    fn fixpoint_detects_convergence_and_divergence() {
        // A rule that always mutates never converges.
        struct AlwaysRewrite;
        impl Rule for AlwaysRewrite {
            fn name(&self) -> &'static str {
                "always-rewrite"
            }
            fn matches(&self, kind: NodeKind) -> bool {
                kind == NodeKind::Text
            }
            fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
                let text = tree.content(node)?.to_owned();
                tree.replace_with_text(node, text)?;
                Ok(())
            }
        }

        let mut tree = flat_tree(&["a"]);
        let diverging = Pipeline::new(vec![Pass::new(AlwaysRewrite)]);
        assert!(matches!(
            diverging.run_to_fixpoint(&mut tree, 4),
            Err(crate::error::EngineError::FixpointExhausted { max_cycles: 4 })
        ));

        let mut tree = flat_tree(&["a"]);
        let converging = Pipeline::new(vec![Pass::new(DropLineBreaks)]);
        assert_eq!(converging.run_to_fixpoint(&mut tree, 4).unwrap(), 0);
    }
}
