//! Built-in normalization rules
//!
//! Each rule is one predicate-guarded transformation in the sense of
//! [`crate::engine::Rule`]. The standard catalog mirrors the cleanup
//! behavior of the classic source-polishing pipelines: strip trailing
//! whitespace and collapse blank lines, reflow `//` comments, space out
//! method declarations, and normalize indentation. A second preset removes
//! comments entirely and tidies up what they leave behind.
//!
//! Rules only ever touch the node they are invoked on, its children, and
//! its immediate siblings, which is what the engine's cursor contract
//! requires.

use serde::{Deserialize, Serialize};

use crate::engine::{Pass, Pipeline, Rule};
use crate::error::Result;
use crate::indent::IndentRule;
use crate::tree::{NodeId, NodeKind, Tree};

/// How many consecutive blank lines the newline rule tolerates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlankLinePolicy {
    /// No blank lines: every run of newlines collapses to a single newline
    None,
    /// At most one blank line: runs of three or more newlines collapse to two
    #[default]
    AtMostOne,
}

/// Options for the standard pipeline
///
/// Deserializable so hosts can load it from a config file:
///
/// ```rust
/// use srcpolish::rules::{BlankLinePolicy, FormatConfig};
///
/// let config: FormatConfig =
///     serde_json::from_str(r#"{ "blank-lines": "none", "indent-width": 2 }"#).unwrap();
/// assert_eq!(config.blank_lines, BlankLinePolicy::None);
/// assert_eq!(config.indent_width, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FormatConfig {
    /// Blank-line tolerance for the newline rule
    pub blank_lines: BlankLinePolicy,
    /// Spaces per indentation level for the indentation rule
    pub indent_width: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            blank_lines: BlankLinePolicy::AtMostOne,
            indent_width: 4,
        }
    }
}

/// True for the horizontal whitespace kinds, i.e. excluding newlines
fn is_line_whitespace(tree: &Tree, id: NodeId) -> Result<bool> {
    Ok(matches!(
        tree.kind(id)?,
        NodeKind::Whitespace | NodeKind::Indenting
    ))
}

/// Newline normalization
///
/// Strips horizontal whitespace left dangling at the end of a line, then
/// applies the configured [`BlankLinePolicy`] by removing the newline
/// itself when too many follow in a row.
pub struct NewlineRule {
    policy: BlankLinePolicy,
}

impl NewlineRule {
    pub fn new(policy: BlankLinePolicy) -> Self {
        Self { policy }
    }
}

impl Rule for NewlineRule {
    fn name(&self) -> &'static str {
        "newline"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Newline
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        if let Some(prev) = tree.previous_sibling(node)? {
            if is_line_whitespace(tree, prev)? {
                tree.remove_from_parent(prev)?;
            }
        }

        fn as_newline(tree: &Tree, id: Option<NodeId>) -> Result<Option<NodeId>> {
            match id {
                Some(id) if tree.kind(id)? == NodeKind::Newline => Ok(Some(id)),
                _ => Ok(None),
            }
        }

        let next = as_newline(tree, tree.next_sibling(node)?)?;
        let collapse = match self.policy {
            BlankLinePolicy::None => next.is_some(),
            BlankLinePolicy::AtMostOne => match next {
                Some(next) => as_newline(tree, tree.next_sibling(next)?)?.is_some(),
                None => false,
            },
        };
        if collapse {
            tree.remove_from_parent(node)?;
        }
        Ok(())
    }
}

/// Reflow `//` comments to a canonical shape
///
/// `//   text` becomes `// text` when the comment starts its line (its
/// previous sibling, if any, is an indentation node) and `  // text` when
/// it trails other tokens. A comment with no text after the marker is left
/// alone apart from the whitespace cleanup.
pub struct CommentReflowRule;

impl Rule for CommentReflowRule {
    fn name(&self) -> &'static str {
        "comment-reflow"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        kind == NodeKind::CppComment
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        let content = tree.content(node)?;
        let text = content
            .strip_prefix("//")
            .unwrap_or(content)
            .trim_start_matches(' ')
            .to_owned();

        if let Some(prev) = tree.previous_sibling(node)? {
            if tree.kind(prev)? == NodeKind::Whitespace {
                tree.remove_from_parent(prev)?;
            }
        }

        if text.is_empty() {
            return Ok(());
        }
        let first_on_line = match tree.previous_sibling(node)? {
            Some(prev) => tree.kind(prev)? == NodeKind::Indenting,
            None => true,
        };
        let replacement = if first_on_line {
            format!("// {text}")
        } else {
            format!("  // {text}")
        };
        tree.replace_with_text(node, replacement)?;
        Ok(())
    }
}

/// Token spacing for method declarations and implementations
///
/// Ensures a single space after the leading token (`-`/`+`) and after the
/// return-type parenthesis group, so `-(void)foo` reads `- (void) foo`.
pub struct DeclarationSpacingRule;

impl DeclarationSpacingRule {
    fn ensure_space_after(&self, tree: &mut Tree, anchor: NodeId) -> Result<()> {
        let needs_space = match tree.next_sibling(anchor)? {
            Some(next) => !tree.is_whitespace(next)?,
            None => false,
        };
        if needs_space {
            let space = tree.new_leaf(NodeKind::Whitespace, " ");
            tree.insert_next_sibling(anchor, space)?;
        }
        Ok(())
    }
}

impl Rule for DeclarationSpacingRule {
    fn name(&self) -> &'static str {
        "declaration-spacing"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::MethodDeclaration | NodeKind::MethodImplementation
        )
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        let Some(first) = tree.first_child(node)? else {
            return Ok(());
        };
        self.ensure_space_after(tree, first)?;
        if let Some(parens) = tree.find_next_sibling_of_kind(first, NodeKind::Parenthesis)? {
            self.ensure_space_after(tree, parens)?;
        }
        Ok(())
    }
}

/// Remove every comment node, block and line alike
pub struct StripCommentsRule;

impl Rule for StripCommentsRule {
    fn name(&self) -> &'static str {
        "strip-comments"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        kind.is_comment()
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        tree.remove_from_parent(node)
    }
}

/// Strip horizontal whitespace (including former indenting) at end of lines
pub struct StripTrailingWhitespaceRule;

impl Rule for StripTrailingWhitespaceRule {
    fn name(&self) -> &'static str {
        "strip-trailing-whitespace"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Newline
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        if let Some(prev) = tree.previous_sibling(node)? {
            if is_line_whitespace(tree, prev)? {
                tree.remove_from_parent(prev)?;
            }
        }
        Ok(())
    }
}

/// Concatenate runs of newlines down to a single newline
pub struct CollapseNewlinesRule;

impl Rule for CollapseNewlinesRule {
    fn name(&self) -> &'static str {
        "collapse-newlines"
    }

    fn matches(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Newline
    }

    fn apply(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        if let Some(next) = tree.next_sibling(node)? {
            if tree.kind(next)? == NodeKind::Newline {
                tree.remove_from_parent(node)?;
            }
        }
        Ok(())
    }
}

impl Pipeline {
    /// The standard normalization pipeline
    ///
    /// Pass order matters and is part of the contract: comments are
    /// reflowed before indentation is normalized because a rewritten node
    /// becomes generic text and loses the kind later passes would need.
    pub fn standard(config: FormatConfig) -> Self {
        Pipeline::new(vec![
            Pass::new(NewlineRule::new(config.blank_lines)),
            Pass::new(CommentReflowRule),
            Pass::new(DeclarationSpacingRule),
            Pass::new(IndentRule::new(config.indent_width)),
        ])
    }

    /// Comment removal pipeline: drop comments, then clean up the
    /// whitespace and blank lines they leave behind
    pub fn strip_comments() -> Self {
        Pipeline::new(vec![
            Pass::new(StripCommentsRule),
            Pass::new(StripTrailingWhitespaceRule),
            Pass::new(CollapseNewlinesRule),
        ])
    }
}
