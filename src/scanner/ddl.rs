//! Line matcher for SQL DDL.

use super::text::{
    constraint_keywords, read_name, read_name_list, read_qualified, squash_whitespace,
    strip_keyword, strip_keywords,
};
use super::{ColumnDef, ColumnRef, ForeignKeyDef, InlineRef, KeyDef, LineShape, RefOp};
use crate::model::ConstraintKind;

/// Words that end a column's type and start its constraint text.
const TYPE_TERMINATORS: &[&str] = &[
    "PRIMARY",
    "NOT",
    "NULL",
    "UNIQUE",
    "DEFAULT",
    "REFERENCES",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "CHECK",
    "CONSTRAINT",
    "COLLATE",
    "GENERATED",
    "COMMENT",
    "ON",
];

/// Table-level clauses that carry nothing for the schema graph.
const IGNORED_CLAUSES: &[&str] = &[
    "KEY", "INDEX", "CHECK", "FULLTEXT", "SPATIAL", "EXCLUDE", "LIKE", "PERIOD",
];

/// Strip `CREATE [TEMP|TEMPORARY|UNLOGGED] TABLE [IF NOT EXISTS]`.
pub(crate) fn strip_create_table(text: &str) -> Option<&str> {
    let mut rest = strip_keyword(text, "CREATE")?;
    for modifier in ["TEMPORARY", "TEMP", "UNLOGGED"] {
        if let Some(r) = strip_keyword(rest, modifier) {
            rest = r;
            break;
        }
    }
    let rest = strip_keyword(rest, "TABLE")?;
    Some(strip_keywords(rest, &["IF", "NOT", "EXISTS"]).unwrap_or(rest))
}

/// Table name from a complete `CREATE TABLE <name>` header.
///
/// Schema-qualified names keep their last segment.
pub(crate) fn table_header(text: &str) -> Option<String> {
    let rest = strip_create_table(text)?;
    let (mut parts, rest) = read_qualified(rest)?;
    if !rest.trim().is_empty() {
        return None;
    }
    parts.pop()
}

fn table_open(text: &str) -> Option<String> {
    table_header(text.strip_suffix('(')?)
}

pub(crate) fn is_table_close(text: &str) -> bool {
    text.starts_with(')')
}

fn strip_constraint_name(text: &str) -> &str {
    match strip_keyword(text, "CONSTRAINT").and_then(read_name) {
        Some((_, rest)) => rest,
        None => text,
    }
}

/// `REFERENCES table[(col, ...)]`; a missing column list means `id`.
fn references_clause(text: &str) -> Option<(String, Vec<String>)> {
    let (mut parts, rest) = read_qualified(text)?;
    let table = parts.pop()?;
    let columns = match read_name_list(rest) {
        Some((cols, _)) => cols,
        None => vec!["id".to_string()],
    };
    Some((table, columns))
}

/// `FOREIGN KEY [name] (cols) REFERENCES table[(cols)] ...`
fn foreign_key(text: &str, table: Option<String>) -> Option<ForeignKeyDef> {
    let rest = strip_keywords(text, &["FOREIGN", "KEY"])?;
    let rest = match read_name_list(rest) {
        Some(_) => rest,
        None => read_name(rest)?.1,
    };
    let (columns, rest) = read_name_list(rest)?;
    let rest = strip_keyword(rest, "REFERENCES")?;
    let (target_table, target_columns) = references_clause(rest)?;
    Some(ForeignKeyDef {
        table,
        columns,
        target_table,
        target_columns,
    })
}

/// `PRIMARY KEY (a, b)` / `UNIQUE [KEY|INDEX] [name] (a)`.
fn table_key(text: &str) -> Option<KeyDef> {
    if let Some(rest) = strip_keywords(text, &["PRIMARY", "KEY"]) {
        let (columns, _) = read_name_list(rest)?;
        return Some(KeyDef {
            kind: ConstraintKind::PrimaryKey,
            columns,
        });
    }

    let mut rest = strip_keyword(text, "UNIQUE")?;
    for kw in ["KEY", "INDEX"] {
        if let Some(r) = strip_keyword(rest, kw) {
            rest = r;
            break;
        }
    }
    let (columns, _) = match read_name_list(rest) {
        Some(found) => found,
        None => read_name_list(read_name(rest)?.1)?,
    };
    Some(KeyDef {
        kind: ConstraintKind::Unique,
        columns,
    })
}

fn is_type_terminator(word: &str) -> bool {
    TYPE_TERMINATORS
        .iter()
        .any(|kw| word.eq_ignore_ascii_case(kw))
}

/// Split `VARCHAR(255) NOT NULL ...` into the type and the constraint text.
fn split_type(text: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                let rest = &text[i..];
                let word: String = rest
                    .trim_start()
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if is_type_terminator(&word) {
                    return (&text[..i], rest);
                }
            }
            _ => {}
        }
    }
    (text, "")
}

fn column(text: &str) -> Option<ColumnDef> {
    let (name, rest) = read_name(text)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (typ, constraint_text) = split_type(rest.trim());
    let typ = squash_whitespace(typ);
    if typ.is_empty() || is_type_terminator(&typ) {
        return None;
    }

    let mut constraints = constraint_keywords(constraint_text);
    let lower = typ.to_lowercase();
    if lower.starts_with("serial")
        || lower.starts_with("bigserial")
        || lower.starts_with("smallserial")
    {
        constraints.push(ConstraintKind::AutoIncrement);
    }

    let reference = find_references(constraint_text).map(|(table, mut columns)| InlineRef {
        op: RefOp::ManyToOne,
        target: ColumnRef {
            table,
            column: columns.swap_remove(0),
        },
    });

    Some(ColumnDef {
        name,
        typ,
        constraints,
        reference,
    })
}

fn find_references(text: &str) -> Option<(String, Vec<String>)> {
    let mut rest = text;
    loop {
        let idx = rest.to_ascii_uppercase().find("REFERENCES")?;
        let after = &rest[idx..];
        if let Some(clause) = strip_keyword(after, "REFERENCES") {
            return references_clause(clause);
        }
        rest = &after["REFERENCES".len()..];
    }
}

/// Classify a line inside a `CREATE TABLE` body.
fn body_line(text: &str) -> LineShape {
    let text = text.trim_end_matches(',').trim();
    let clause = strip_constraint_name(text);

    if let Some(fk) = foreign_key(clause, None) {
        return LineShape::ForeignKey(fk);
    }
    if let Some(key) = table_key(clause) {
        return LineShape::TableKey(key);
    }
    if IGNORED_CLAUSES
        .iter()
        .any(|kw| strip_keyword(clause, kw).is_some())
    {
        return LineShape::Unrecognized;
    }
    match column(text) {
        Some(col) => LineShape::Column(col),
        None => LineShape::Unrecognized,
    }
}

/// `ALTER TABLE [ONLY] [IF EXISTS] t ADD [CONSTRAINT n] FOREIGN KEY ...`
fn alter_foreign_key(text: &str) -> Option<ForeignKeyDef> {
    let text = text.trim_end_matches(';').trim();
    let mut rest = strip_keywords(text, &["ALTER", "TABLE"])?;
    if let Some(r) = strip_keyword(rest, "ONLY") {
        rest = r;
    }
    if let Some(r) = strip_keywords(rest, &["IF", "EXISTS"]) {
        rest = r;
    }
    let (mut parts, rest) = read_qualified(rest)?;
    let table = parts.pop()?;
    let rest = strip_keyword(rest, "ADD")?;
    foreign_key(strip_constraint_name(rest), Some(table))
}

/// Running state for the DDL matcher.
#[derive(Debug, Clone, Default)]
pub(crate) struct DdlMatcher {
    in_table: bool,
}

impl DdlMatcher {
    pub(crate) fn classify(&mut self, text: &str) -> LineShape {
        if let Some(name) = table_open(text) {
            self.in_table = true;
            return LineShape::TableOpen { name };
        }
        if self.in_table {
            if is_table_close(text) {
                self.in_table = false;
                return LineShape::TableClose;
            }
            return body_line(text);
        }
        match alter_foreign_key(text) {
            Some(fk) => LineShape::ForeignKey(fk),
            None => LineShape::Unrecognized,
        }
    }
}
