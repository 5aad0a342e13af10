//! Depth-sensitive indentation normalization
//!
//! Indentation is treated as a derived property of structural nesting
//! rather than text to be copied through: each indentation node is rewritten
//! to spaces, snapped down to a whole number of levels, and then padded up
//! to the depth its position in the brace nesting requires. Existing indent
//! beyond the required minimum is tolerated, so hand-aligned code keeps its
//! extra level while under-indented code is corrected.

use crate::engine::Rule;
use crate::error::Result;
use crate::tree::{NodeId, NodeKind, Tree};

/// Indentation resolver
///
/// For every `Indenting` node:
/// 1. expand tabs to `width` spaces each,
/// 2. truncate to a multiple of `width`,
/// 3. compute the expected depth: the number of `Braces` ancestors, minus
///    one when this node immediately precedes its enclosing block's closing
///    delimiter (closing lines sit one level outside their contents),
/// 4. pad with whole levels until the expected depth is reached — never
///    remove levels beyond the truncation in step 2,
/// 5. rewrite the node only if the result differs from what is there.
pub struct IndentRule {
    width: usize,
}

impl IndentRule {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    /// True when `node` is the last child before the closing delimiter of
    /// its enclosing block (the delimiter being the block's last child)
    fn precedes_closing_delimiter(&self, tree: &Tree, node: NodeId) -> Result<bool> {
        let Some(parent) = tree.parent(node)? else {
            return Ok(false);
        };
        if tree.kind(parent)? != NodeKind::Braces {
            return Ok(false);
        }
        match tree.next_sibling(node)? {
            Some(next) => Ok(Some(next) == tree.last_child(parent)?),
            None => Ok(false),
        }
    }
}

impl Rule for IndentRule {
    fn name(&self) -> &'static str {
        "indentation"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Indenting
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        let level = " ".repeat(self.width);
        let mut indent = tree.content(node)?.replace('\t', &level);

        let extra = indent.len() % self.width;
        if extra > 0 {
            indent.truncate(indent.len() - extra);
        }

        let mut expected = tree.depth_in_parents_of_kind(node, NodeKind::Braces)?;
        if expected > 0 && self.precedes_closing_delimiter(tree, node)? {
            expected -= 1;
        }

        let mut levels = indent.len() / self.width;
        while expected > levels {
            indent.push_str(&level);
            levels += 1;
        }

        if indent != tree.content(node)? {
            tree.replace_with_text(node, indent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Pass;

    /// Builds `depth` nested brace blocks and places `indent` + a statement
    /// line inside the innermost one, returning the tree.
    fn nested_line(depth: usize, indent: &str) -> Tree {
        let mut tree = Tree::new();
        let mut parent = tree.root();
        for _ in 0..depth {
            let braces = tree.new_branch(NodeKind::Braces);
            tree.append_child(parent, braces).unwrap();
            let open = tree.new_leaf(NodeKind::Text, "{");
            tree.append_child(braces, open).unwrap();
            let newline = tree.new_leaf(NodeKind::Newline, "\n");
            tree.append_child(braces, newline).unwrap();
            parent = braces;
        }
        let indenting = tree.new_leaf(NodeKind::Indenting, indent);
        tree.append_child(parent, indenting).unwrap();
        let statement = tree.new_leaf(NodeKind::Text, "x();");
        tree.append_child(parent, statement).unwrap();
        let newline = tree.new_leaf(NodeKind::Newline, "\n");
        tree.append_child(parent, newline).unwrap();
        // Close the blocks innermost-out.
        let mut block = Some(parent);
        while let Some(braces) = block {
            if braces == tree.root() {
                break;
            }
            let close = tree.new_leaf(NodeKind::Text, "}");
            tree.append_child(braces, close).unwrap();
            block = tree.parent(braces).unwrap();
        }
        tree
    }

    fn indented(tree: &Tree) -> String {
        tree.source()
    }

    #[test]
    fn tab_at_depth_two_becomes_eight_spaces() {
        let mut tree = nested_line(2, "\t");
        Pass::new(IndentRule::new(4)).run(&mut tree).unwrap();
        assert_eq!(indented(&tree), "{\n{\n        x();\n}}");
    }

    #[test]
    fn ragged_indent_is_truncated_to_whole_levels() {
        let mut tree = nested_line(1, "      ");
        Pass::new(IndentRule::new(4)).run(&mut tree).unwrap();
        // 6 spaces truncate to 4; depth 1 requires no padding beyond that.
        assert_eq!(indented(&tree), "{\n    x();\n}");
    }

    #[test]
    fn deeper_than_expected_indent_is_kept() {
        let mut tree = nested_line(1, "        ");
        Pass::new(IndentRule::new(4)).run(&mut tree).unwrap();
        // Two full levels at depth 1: tolerated, never padded down.
        assert_eq!(indented(&tree), "{\n        x();\n}");
    }

    #[test]
    fn under_indented_line_is_padded_up() {
        let mut tree = nested_line(3, "  ");
        Pass::new(IndentRule::new(4)).run(&mut tree).unwrap();
        // 2 spaces truncate to 0, then pad to the structural depth of 3.
        assert_eq!(indented(&tree), "{\n{\n{\n            x();\n}}}");
    }

    #[test]
    fn closing_delimiter_line_dedents_one_level() {
        let mut tree = Tree::new();
        let root = tree.root();
        let outer = tree.new_branch(NodeKind::Braces);
        tree.append_child(root, outer).unwrap();
        let inner = tree.new_branch(NodeKind::Braces);
        for (kind, text) in [(NodeKind::Text, "{"), (NodeKind::Newline, "\n")] {
            let leaf = tree.new_leaf(kind, text);
            tree.append_child(outer, leaf).unwrap();
        }
        tree.append_child(outer, inner).unwrap();
        for (kind, text) in [
            (NodeKind::Text, "{"),
            (NodeKind::Newline, "\n"),
            (NodeKind::Indenting, "\t"),
            (NodeKind::Text, "}"),
        ] {
            let leaf = tree.new_leaf(kind, text);
            tree.append_child(inner, leaf).unwrap();
        }
        let close = tree.new_leaf(NodeKind::Text, "}");
        tree.append_child(outer, close).unwrap();

        // The indenting node sits at brace depth 2 but directly precedes
        // the inner block's closing brace: it normalizes to depth 1.
        Pass::new(IndentRule::new(4)).run(&mut tree).unwrap();
        assert_eq!(tree.source(), "{\n{\n    }}");
    }

    #[test]
    fn indent_pass_is_idempotent() {
        let mut tree = nested_line(2, "\t");
        let pass = Pass::new(IndentRule::new(4));
        pass.run(&mut tree).unwrap();
        let settled = tree.source();
        assert_eq!(pass.run(&mut tree).unwrap(), 0);
        assert_eq!(tree.source(), settled);
    }
}
