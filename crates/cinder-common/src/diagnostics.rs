//! User-facing diagnostics.
//!
//! Lowering failures are converted into `Diagnostic` values by the caller of
//! the unit entry point; the lowering crate itself only carries the offending
//! span, source text, and error code.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

/// Stable error codes for lowering failures.
pub mod codes {
    /// An operator with no entry in the runtime dispatch table.
    pub const UNKNOWN_OPERATOR: u32 = 5001;
    /// break/continue with no enclosing loop or component body.
    pub const EXIT_OUTSIDE_CONSTRUCT: u32 = 5002;
    /// Assignment target of a kind that cannot be addressed.
    pub const UNSUPPORTED_ASSIGN_TARGET: u32 = 5003;
    /// Increment/decrement operand that has no addressable location.
    pub const BAD_INCREMENT_OPERAND: u32 = 5004;
    /// More than one default clause in a switch.
    pub const DUPLICATE_DEFAULT_CASE: u32 = 5005;
    /// A switch member that is neither a case nor a default clause.
    pub const INVALID_SWITCH_MEMBER: u32 = 5006;
    /// A node kind encountered in a position it can never occupy.
    pub const MISPLACED_NODE: u32 = 5007;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRelatedInformation {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn error(
        file: impl Into<String>,
        start: u32,
        length: u32,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            message_text: message.into(),
            code,
            file: file.into(),
            start,
            length,
            related_information: Vec::new(),
        }
    }

    pub fn with_related(
        mut self,
        file: impl Into<String>,
        start: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            category: DiagnosticCategory::Message,
            code: 0,
            file: file.into(),
            start,
            length,
            message_text: message.into(),
        });
        self
    }
}
