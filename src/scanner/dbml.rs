//! Line matcher for the table-definition language.
//!
//! ```text
//! Table users {
//!   id integer [primary key]
//!   team_id integer [not null, ref: > teams.id]
//! }
//! Ref user_posts: posts.user_id > users.id
//! ```

use super::text::{constraint_keywords, read_name, read_qualified, split_top_level, strip_keyword};
use super::{ColumnDef, ColumnRef, InlineRef, LineShape, RefOp, RelationshipDef};
use crate::model::ConstraintKind;

/// `Table <name> [as <alias>] [settings] {`
fn table_open(text: &str) -> Option<String> {
    let rest = text.strip_suffix('{')?;
    let rest = strip_keyword(rest, "Table")?;
    let (parts, rest) = read_qualified(rest)?;
    let rest = rest.trim();
    let rest = match strip_keyword(rest, "as") {
        Some(alias) => read_name(alias)?.1.trim(),
        None => rest,
    };
    if !(rest.is_empty() || (rest.starts_with('[') && rest.ends_with(']'))) {
        return None;
    }
    Some(parts.join("."))
}

fn read_op(s: &str) -> Option<(RefOp, &str)> {
    let s = s.trim_start();
    [
        ("<>", RefOp::ManyToMany),
        (">", RefOp::ManyToOne),
        ("<", RefOp::OneToMany),
        ("-", RefOp::OneToOne),
    ]
    .into_iter()
    .find_map(|(token, op)| s.strip_prefix(token).map(|rest| (op, rest)))
}

/// `table.column`; anything before the last dot is the table name.
fn read_endpoint(s: &str) -> Option<(ColumnRef, &str)> {
    let (mut parts, rest) = read_qualified(s)?;
    if parts.len() < 2 {
        return None;
    }
    let column = parts.pop()?;
    Some((
        ColumnRef {
            table: parts.join("."),
            column,
        },
        rest,
    ))
}

/// `Ref[ <label>]: <table>.<column> (>|<|-|<>) <table>.<column> [settings]`
fn relationship(text: &str) -> Option<RelationshipDef> {
    let rest = strip_keyword(text, "Ref")?;
    let (head, body) = rest.split_once(':')?;
    let label = match head.trim() {
        "" => None,
        other => Some(read_name(other)?.0),
    };

    let (left, rest) = read_endpoint(body)?;
    let (op, rest) = read_op(rest)?;
    let (right, rest) = read_endpoint(rest)?;
    let rest = rest.trim();
    if !(rest.is_empty() || rest.starts_with('[')) {
        return None;
    }

    Some(RelationshipDef {
        label,
        left,
        op,
        right,
    })
}

/// Settings text of `[pk, not null, ref: > t.c, note: '...']`.
fn settings(text: &str) -> (Vec<ConstraintKind>, Option<InlineRef>) {
    let mut constraints = Vec::new();
    let mut reference = None;

    for item in split_top_level(text, ',') {
        let item = item.trim();
        let lower = item.to_lowercase();
        if lower.starts_with("note") || lower.starts_with("default") {
            continue;
        }
        if let Some(target) = strip_keyword(item, "ref").and_then(|r| r.trim_start().strip_prefix(':')) {
            reference = read_op(target).and_then(|(op, rest)| {
                read_endpoint(rest).map(|(target, _)| InlineRef { op, target })
            });
            continue;
        }
        match lower.as_str() {
            "pk" => constraints.push(ConstraintKind::PrimaryKey),
            "increment" => constraints.push(ConstraintKind::AutoIncrement),
            _ => {
                for kind in constraint_keywords(item) {
                    if !constraints.contains(&kind) {
                        constraints.push(kind);
                    }
                }
            }
        }
    }

    (constraints, reference)
}

/// Type token with optional parenthesized arguments.
fn read_type(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    if s.starts_with('"') {
        return read_name(s);
    }
    let mut depth = 0usize;
    let mut end = s.len();
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '[' if depth == 0 => {
                end = i;
                break;
            }
            c if c.is_whitespace() && depth == 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let typ = &s[..end];
    if typ.is_empty() {
        return None;
    }
    Some((typ.to_string(), &s[end..]))
}

/// `<name> <type>[(<args>)] [<settings>]`
fn column(text: &str) -> Option<ColumnDef> {
    let (name, rest) = read_name(text)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (typ, rest) = read_type(rest)?;
    let rest = rest.trim();

    let (constraints, reference) = if rest.is_empty() {
        (Vec::new(), None)
    } else {
        let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
        settings(inner)
    };

    Some(ColumnDef {
        name,
        typ,
        constraints,
        reference,
    })
}

/// Running state: brace depth and whether depth 1 is a table body.
#[derive(Debug, Clone, Default)]
pub(crate) struct TableDefinitionMatcher {
    depth: usize,
    in_table: bool,
}

impl TableDefinitionMatcher {
    pub(crate) fn classify(&mut self, text: &str) -> LineShape {
        if let Some(name) = table_open(text) {
            self.depth = 1;
            self.in_table = true;
            return LineShape::TableOpen { name };
        }
        if let Some(rel) = relationship(text) {
            return LineShape::Relationship(rel);
        }
        if text == "}" {
            if self.depth == 0 {
                return LineShape::Unrecognized;
            }
            self.depth -= 1;
            if self.depth == 0 && self.in_table {
                self.in_table = false;
                return LineShape::TableClose;
            }
            return LineShape::Unrecognized;
        }
        if text.ends_with('{') {
            self.depth += 1;
            return LineShape::Unrecognized;
        }
        if self.in_table && self.depth == 1 {
            if let Some(col) = column(text) {
                return LineShape::Column(col);
            }
        }
        LineShape::Unrecognized
    }
}
