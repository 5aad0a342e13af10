//! # SrcPolish - Experimental Source Tree Rewriting Engine
//!
//! SrcPolish is a tree-rewriting engine for normalizing source code
//! formatting, written in Rust. A host tokenizer parses raw text into a
//! typed, ordered [`tree::Tree`]; an ordered [`engine::Pipeline`] of rule
//! passes then rewrites the tree in place (collapsing whitespace, reflowing
//! comments, spacing out declarations, normalizing indentation depth), and
//! the host serializes the result by concatenating leaf content back into
//! text.
//!
//! ## Status
//!
//! This is an early prototype. The built-in rule catalog covers whitespace
//! and comment normalization plus depth-derived indentation; it carries a
//! small fixed set of node kinds and no language grammar of its own. It
//! should be considered experimental.
//!
//! ## Usage
//!
//! The engine operates on trees the host builds; there is no file or
//! parsing layer in this crate.
//!
//! ```rust
//! use srcpolish::engine::Pipeline;
//! use srcpolish::rules::FormatConfig;
//! use srcpolish::tree::{NodeKind, Tree};
//!
//! let mut tree = Tree::new();
//! let root = tree.root();
//! for (kind, text) in [
//!     (NodeKind::Text, "int x;"),
//!     (NodeKind::Whitespace, "   "),
//!     (NodeKind::CppComment, "//set up"),
//!     (NodeKind::Newline, "\n"),
//!     (NodeKind::Newline, "\n"),
//!     (NodeKind::Newline, "\n"),
//! ] {
//!     let leaf = tree.new_leaf(kind, text);
//!     tree.append_child(root, leaf).unwrap();
//! }
//! // The tree reproduces the input exactly until a rule runs.
//! assert_eq!(tree.source(), "int x;   //set up\n\n\n");
//!
//! let pipeline = Pipeline::standard(FormatConfig::default());
//! pipeline.run(&mut tree).unwrap();
//! assert_eq!(tree.source(), "int x;  // set up\n\n");
//! ```
//!
//! ## Modules
//!
//! - [`tree`] - Node model: navigation queries and safe in-place mutation
//! - [`engine`] - Pass pipeline and the mutation-safe traversal cursor
//! - [`rules`] - Built-in rule catalog and pipeline presets
//! - [`indent`] - Depth-sensitive indentation resolver
//! - [`error`] - Error taxonomy for structural violations
//!
//! ## Limitations
//!
//! - No tokenizer: building the initial tree is the host's job
//! - The node-kind set is closed at build time
//! - Rules must keep mutations within the current node's neighborhood

/// Typed source tree with navigation and mutation APIs
pub mod tree;

/// Rule-dispatch engine and pass pipeline
pub mod engine;

/// Built-in normalization rules and configuration
pub mod rules;

/// Indentation resolver
pub mod indent;

/// Error types
pub mod error;

#[cfg(test)]
mod debug;
