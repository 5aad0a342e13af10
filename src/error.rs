//! Error types for tree mutation and pipeline execution

use thiserror::Error;

use crate::tree::NodeId;

/// Main error type for tree-rewriting operations
///
/// Structural violations are raised at the mutation API boundary and abort
/// the current pass; the tree itself is left in its last consistent state
/// because a rejected mutation performs no partial work.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node id referred to a node that has already been destroyed
    #[error("node {0:?} has been destroyed")]
    NodeDestroyed(NodeId),

    /// `remove_from_parent` or `replace_with_text` was called on the root
    #[error("the root node cannot be detached or replaced")]
    RootDetach,

    /// A sibling operation was attempted on a node with no parent
    #[error("node {0:?} is detached and has no siblings")]
    NodeDetached(NodeId),

    /// An insertion argument was already attached somewhere in the tree
    #[error("node {0:?} is already attached and must be detached first")]
    AlreadyAttached(NodeId),

    /// A child was appended to a node of a leaf kind
    #[error("nodes of kind {kind} cannot have children")]
    LeafChildren { kind: &'static str },

    /// `run_to_fixpoint` exhausted its cycle budget before converging
    #[error("pipeline did not reach a fixpoint within {max_cycles} cycles")]
    FixpointExhausted { max_cycles: usize },

    /// A rule reported a failure of its own
    #[error("rule '{rule}' failed: {message}")]
    Rule { rule: &'static str, message: String },
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;
