// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and run reporting for the assembler.

use std::fmt;

/// Categories of assembler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    /// Malformed architecture table line or directive.
    Syntax,
    /// No opcode pattern matched the statement.
    NoMatch,
    /// Relative encoding value outside its signed range.
    BranchOutOfBounds,
    /// Two writes to the same output byte.
    Overwrite,
    /// Endian swap requested for a width over 32 bits.
    EndianSwap,
    /// Target file could not be opened.
    Target,
    /// A constant was referenced but never determined.
    Constant,
    /// Expression evaluation failure.
    Expression,
    /// Source file loading failure.
    Source,
    /// Run-level failure summarizing recorded diagnostics.
    Assembler,
    Io,
    Cli,
}

/// An assembler error with a kind and message.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }

    /// Whether this error must unwind the current pass rather than skip to
    /// the next statement.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            AsmErrorKind::Overwrite | AsmErrorKind::Constant | AsmErrorKind::Io
        )
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AsmError {}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Origin of a statement: file, 1-based line, 1-based block within the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub block: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.block)
    }
}

/// A diagnostic message with the statement it was raised on.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    error: AsmError,
    location: Option<SourceLocation>,
    statement: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, error: AsmError) -> Self {
        Self {
            severity,
            error,
            location: None,
            statement: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> &str {
        self.error.message()
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn format(&self) -> String {
        let sev = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        let mut out = format!("{sev}: {}", self.error.message());
        if let Some(location) = &self.location {
            out.push('\n');
            match &self.statement {
                Some(statement) => out.push_str(&format!("  {location}: {statement}")),
                None => out.push_str(&format!("  {location}")),
            }
        }
        out
    }
}

/// Report from a successful assembly run.
#[derive(Debug)]
pub struct AsmRunReport {
    diagnostics: Vec<Diagnostic>,
}

impl AsmRunReport {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// Error from a failed assembly run.
#[derive(Debug)]
pub struct AsmRunError {
    error: AsmError,
    diagnostics: Vec<Diagnostic>,
}

impl AsmRunError {
    pub fn new(error: AsmError, diagnostics: Vec<Diagnostic>) -> Self {
        Self { error, diagnostics }
    }

    pub fn error(&self) -> &AsmError {
        &self.error
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for AsmRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AsmRunError {}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_includes_severity_and_location() {
        let err = AsmError::new(AsmErrorKind::NoMatch, "unrecognized instruction", Some("xyz"));
        let diag = Diagnostic::new(Severity::Error, err)
            .with_location(SourceLocation {
                file: "main.asm".to_string(),
                line: 4,
                block: 2,
            })
            .with_statement("xyz");
        assert_eq!(
            diag.format(),
            "error: unrecognized instruction: xyz\n  main.asm:4:2: xyz"
        );
    }

    #[test]
    fn fatal_kinds_unwind_the_pass() {
        assert!(AsmError::new(AsmErrorKind::Overwrite, "overwrite detected", None).is_fatal());
        assert!(AsmError::new(AsmErrorKind::Constant, "never determined", None).is_fatal());
        assert!(!AsmError::new(AsmErrorKind::NoMatch, "unrecognized", None).is_fatal());
    }
}
