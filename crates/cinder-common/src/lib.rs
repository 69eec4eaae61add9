//! Common types and utilities for the Cinder script compiler.
//!
//! This crate provides foundational types used across all cinder crates:
//! - Source spans and line maps (`Span`, `LineMap`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCategory`, error codes)

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::{LineMap, Position, Span};

// Diagnostics and error codes
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticRelatedInformation};
