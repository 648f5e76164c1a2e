// Copyright 2025-2026 Neil Henderson
//
//! The `diagnostics` module defines the errors the compiler reports.

use std::fmt;

use crate::core::SourceLocation;

/// The category of a diagnostic.
///
/// Every category carries the source line it points at. Internal invariant violations are not
/// diagnostics; they abort through the `ICE!` macro.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A lexical or syntactic error.
    Syntax,
    /// A reference to an unbound variable or function.
    Undefined,
    /// A duplicate definition of a function or global.
    Redefinition,
    /// An array used as a scalar, a scalar subscripted, and similar shape errors.
    TypeMismatch,
    /// A call whose argument count differs from the callee's parameter count.
    ArityMismatch,
    /// `break`/`continue` outside any loop, or `return <expr>` from a void function.
    MisplacedControl,
    /// A non-positive or non-constant array dimension.
    ArrayShape,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::Undefined => "undefined name",
            DiagnosticKind::Redefinition => "redefinition",
            DiagnosticKind::TypeMismatch => "type mismatch",
            DiagnosticKind::ArityMismatch => "argument count mismatch",
            DiagnosticKind::MisplacedControl => "misplaced control statement",
            DiagnosticKind::ArrayShape => "invalid array shape",
        };
        write!(f, "{text}")
    }
}

/// A diagnostic emitted by the compiler.
#[derive(Debug)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    message: String,
    loc: SourceLocation,
}

impl Diagnostic {
    /// Creates a diagnostic pointing at the given 1-based source line.
    pub fn error_at_line(kind: DiagnosticKind, message: String, line: u32) -> Self {
        Self { kind, message, loc: SourceLocation::new(line) }
    }

    /// Creates a diagnostic with no source location.
    pub fn error(kind: DiagnosticKind, message: String) -> Self {
        Self { kind, message, loc: SourceLocation::none() }
    }

    /// The category of the diagnostic.
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// The diagnostic's message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source location, when the diagnostic points at source text.
    pub fn location(&self) -> Option<SourceLocation> {
        if self.loc.is_some() { Some(self.loc) } else { None }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loc.is_some() {
            write!(f, "error: {}: {}", self.loc, self.message)
        } else {
            write!(f, "error: {}", self.message)
        }
    }
}
