//! Context-sensitive lowering for the Cinder script compiler.
//!
//! Turns a parsed syntax tree (built by `cinder-ast`) into structured
//! fragments of the executable target representation, ready for the backend
//! emitter. Lowering is a strict post-order walk with an explicit
//! [`LoweringSession`] threaded through every call; the same node lowers
//! differently per [`ExprContext`] (value, assignment target, safe member,
//! raw key).
//!
//! The crate covers:
//!
//! - the fragment model and runtime call shapes ([`ir`]),
//! - scope-chain access/assignment semantics,
//! - control-flow exit resolution across loops, callables, and component
//!   bodies,
//! - loop and switch lowering,
//! - the per-unit entry point with side tables ([`unit`]) and the
//!   process-wide unit cache ([`cache`]).

pub mod cache;
pub mod engine;
pub mod error;
pub mod ir;
pub mod session;
pub mod unit;

mod access;
mod exits;
mod stmts;

pub use cache::UnitCache;
pub use engine::{lower_expr, lower_stmt};
pub use error::{LowerError, LowerErrorKind, LowerResult};
pub use ir::{BodyResultKind, Fragment, RuntimeFn};
pub use session::{ExprContext, ImportDecl, LoweringSession, NestedCallable};
pub use unit::{LoweredUnit, UnitConfig, lower_unit};
