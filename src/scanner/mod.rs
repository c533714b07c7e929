//! Lexical line scanner.
//!
//! Turns raw schema text into a lazy sequence of classified logical lines.
//! Classification is line-local apart from the "inside a table body" state
//! each dialect matcher tracks.

mod dbml;
mod ddl;
mod split;
mod text;

use crate::dialect::Dialect;
use crate::model::{Cardinality, ConstraintKind};
use split::LogicalLines;

pub(crate) use ddl::strip_create_table;

/// A `table.column` reference, still keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Relationship operator of the table-definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefOp {
    /// `>`: the left side references the right side.
    ManyToOne,
    /// `<`: the right side references the left side.
    OneToMany,
    /// `-`
    OneToOne,
    /// `<>`
    ManyToMany,
}

impl RefOp {
    /// Order the endpoints as (dependent side, referenced side).
    pub fn orient(self, left: ColumnRef, right: ColumnRef) -> (ColumnRef, ColumnRef, Cardinality) {
        match self {
            Self::ManyToOne => (left, right, Cardinality::OneToMany),
            Self::OneToMany => (right, left, Cardinality::OneToMany),
            Self::OneToOne => (left, right, Cardinality::OneToOne),
            Self::ManyToMany => (left, right, Cardinality::ManyToMany),
        }
    }
}

/// Reference attached to a column definition (`[ref: > t.c]`, `REFERENCES t(c)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRef {
    pub op: RefOp,
    pub target: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub typ: String,
    pub constraints: Vec<ConstraintKind>,
    pub reference: Option<InlineRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDef {
    pub label: Option<String>,
    pub left: ColumnRef,
    pub op: RefOp,
    pub right: ColumnRef,
}

/// `FOREIGN KEY (cols) REFERENCES table(cols)`; `table` is set for
/// `ALTER TABLE` statements and empty inside a table body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub table: Option<String>,
    pub columns: Vec<String>,
    pub target_table: String,
    pub target_columns: Vec<String>,
}

/// Table-level `PRIMARY KEY (..)` / `UNIQUE (..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineShape {
    TableOpen { name: String },
    TableClose,
    Column(ColumnDef),
    Relationship(RelationshipDef),
    ForeignKey(ForeignKeyDef),
    TableKey(KeyDef),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine {
    /// 1-based physical line the logical line starts on.
    pub line: usize,
    pub text: String,
    pub shape: LineShape,
}

#[derive(Debug, Clone)]
enum Matcher {
    TableDefinition(dbml::TableDefinitionMatcher),
    Ddl(ddl::DdlMatcher),
}

impl Matcher {
    fn classify(&mut self, text: &str) -> LineShape {
        match self {
            Self::TableDefinition(m) => m.classify(text),
            Self::Ddl(m) => m.classify(text),
        }
    }
}

/// Lazy classified-line iterator. Cloning or re-creating it restarts the scan.
#[derive(Clone)]
pub struct Scanner<'a> {
    lines: LogicalLines<'a>,
    matcher: Matcher,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str, dialect: Dialect) -> Self {
        let dialect = dialect.resolve(input);
        let matcher = match dialect {
            Dialect::Ddl => Matcher::Ddl(ddl::DdlMatcher::default()),
            _ => Matcher::TableDefinition(dbml::TableDefinitionMatcher::default()),
        };
        Self {
            lines: LogicalLines::new(input, dialect),
            matcher,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = ScannedLine;

    fn next(&mut self) -> Option<ScannedLine> {
        let logical = self.lines.next()?;
        let shape = self.matcher.classify(&logical.text);
        Some(ScannedLine {
            line: logical.line,
            text: logical.text,
            shape,
        })
    }
}
