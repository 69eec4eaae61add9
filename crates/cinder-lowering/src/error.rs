//! Lowering failures.
//!
//! Every error is immediate and non-recoverable: the engine never retries or
//! falls back, and a construct it cannot lower fails the whole unit. Errors
//! carry the offending node's span and verbatim source text so the caller of
//! the unit entry point can map them back to the program text.

use cinder_ast::{NodeArena, NodeIndex};
use cinder_common::diagnostics::codes;
use cinder_common::{Diagnostic, Span};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LowerErrorKind {
    /// An operator with no entry in the runtime dispatch table.
    UnknownOperator { operator: String },
    /// break/continue with no enclosing loop, switch, or component body.
    ExitOutsideConstruct { exit: &'static str },
    /// Assignment target of a kind the engine cannot address.
    UnsupportedAssignTarget { kind: &'static str },
    /// Increment/decrement operand with no addressable location.
    BadIncrementOperand { kind: &'static str },
    /// More than one default clause in a switch.
    DuplicateDefaultCase,
    /// A switch member that is neither a case nor a default clause.
    InvalidSwitchMember { kind: &'static str },
    /// A node kind encountered in a position it can never occupy in a
    /// well-formed tree.
    MisplacedNode { kind: &'static str },
}

impl LowerErrorKind {
    pub const fn code(&self) -> u32 {
        match self {
            LowerErrorKind::UnknownOperator { .. } => codes::UNKNOWN_OPERATOR,
            LowerErrorKind::ExitOutsideConstruct { .. } => codes::EXIT_OUTSIDE_CONSTRUCT,
            LowerErrorKind::UnsupportedAssignTarget { .. } => codes::UNSUPPORTED_ASSIGN_TARGET,
            LowerErrorKind::BadIncrementOperand { .. } => codes::BAD_INCREMENT_OPERAND,
            LowerErrorKind::DuplicateDefaultCase => codes::DUPLICATE_DEFAULT_CASE,
            LowerErrorKind::InvalidSwitchMember { .. } => codes::INVALID_SWITCH_MEMBER,
            LowerErrorKind::MisplacedNode { .. } => codes::MISPLACED_NODE,
        }
    }
}

impl fmt::Display for LowerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerErrorKind::UnknownOperator { operator } => {
                write!(f, "operator [{operator}] has no runtime dispatch entry")
            }
            LowerErrorKind::ExitOutsideConstruct { exit } => {
                write!(f, "[{exit}] is not inside a loop or component body")
            }
            LowerErrorKind::UnsupportedAssignTarget { kind } => {
                write!(f, "cannot assign to a [{kind}] expression")
            }
            LowerErrorKind::BadIncrementOperand { kind } => {
                write!(f, "a [{kind}] expression has no addressable location")
            }
            LowerErrorKind::DuplicateDefaultCase => {
                write!(f, "switch has more than one [default] case")
            }
            LowerErrorKind::InvalidSwitchMember { kind } => {
                write!(f, "switch may only contain case/default clauses, found [{kind}]")
            }
            LowerErrorKind::MisplacedNode { kind } => {
                write!(f, "[{kind}] node is not valid in this position")
            }
        }
    }
}

/// A fatal lowering failure, carrying the offending node's source position
/// and text.
#[derive(Clone, Debug, PartialEq)]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub span: Span,
    pub source_text: String,
}

impl LowerError {
    /// Capture the span and verbatim source text of the offending node.
    pub fn at(kind: LowerErrorKind, arena: &NodeArena, idx: NodeIndex) -> LowerError {
        let span = arena
            .get(idx)
            .map(|node| node.span)
            .unwrap_or(Span::EMPTY);
        LowerError {
            kind,
            span,
            source_text: span.text(arena.source()).to_string(),
        }
    }

    pub const fn code(&self) -> u32 {
        self.kind.code()
    }

    /// Format for user-facing reporting, attributed to `file`.
    pub fn to_diagnostic(&self, file: impl Into<String>) -> Diagnostic {
        Diagnostic::error(
            file,
            self.span.pos,
            self.span.len(),
            self.to_string(),
            self.code(),
        )
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source_text.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.source_text)
        }
    }
}

impl std::error::Error for LowerError {}

pub type LowerResult<T> = Result<T, LowerError>;
