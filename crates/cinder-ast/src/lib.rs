//! Syntax-tree model for the Cinder script compiler.
//!
//! The parsed program is stored in a [`NodeArena`]: a flat vector of nodes
//! addressed by [`NodeIndex`], each carrying its kind, source span, and a
//! parent back-reference. The crate provides:
//!
//! - the closed [`NodeKind`] taxonomy with operator enums,
//! - arena construction and the atomic child-replacement procedure,
//! - the non-mutating [`Visit`] and tree-rewriting [`Rewrite`] contracts,
//! - ancestor queries (the basis of control-flow exit resolution),
//! - generic structural serialization for tooling.
//!
//! Trees are built once by the parser (an external collaborator), optionally
//! restructured by rewriting visitors, then consumed read-only by lowering.

pub mod arena;
pub mod base;
pub mod node;
pub mod serialize;
pub mod visit;

pub use arena::NodeArena;
pub use base::{NodeIndex, NodeList};
pub use node::{AssignOp, BinaryOp, CompareOp, IncrDecrOp, Node, NodeKind, UnaryOp};
pub use serialize::to_value;
pub use visit::{Rewrite, Visit, rewrite_tree, walk};
