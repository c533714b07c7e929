//! Non-fatal findings collected during a parse.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// A line matching no known shape.
    UnrecognizedLine,
    /// A table declared under a name already in use.
    DuplicateTable,
    /// The same foreign key declared twice.
    DuplicateReference,
    /// A foreign key whose column list and target column list differ in length.
    MismatchedForeignKey,
    /// A reference naming a table that was never declared.
    UnknownTable,
    /// A reference naming a column missing from its table.
    UnknownColumn,
    /// A reference from a table to itself.
    SelfReference,
    /// A junction table whose collapse had to be abandoned.
    JunctionAbandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based source line, when the finding maps to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: Option<usize>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Ordered diagnostics sink.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn push(&mut self, line: Option<usize>, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(line, kind, message);
        tracing::warn!(kind = ?diagnostic.kind, line = ?diagnostic.line, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
