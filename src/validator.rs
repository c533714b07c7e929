//! Schema validator.
//!
//! Every check runs independently and all violations are collected. The
//! cardinality tag needs no runtime check: `Cardinality` is a closed enum and
//! unknown tags are rejected when a document is deserialized.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::model::{ColumnId, Relationship, Schema, Table, TableId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Id of the offending table or relationship.
    pub entity: String,
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.entity, self.field, self.message)
    }
}

fn violation(entity: &str, field: impl Into<String>, message: impl Into<String>) -> Violation {
    Violation {
        entity: entity.to_string(),
        field: field.into(),
        message: message.into(),
    }
}

fn check_table(table: &Table, out: &mut Vec<Violation>) {
    let id = table.id.as_str();

    if table.name.trim().is_empty() {
        out.push(violation(id, "name", "table name is empty"));
    }
    if table.columns.is_empty() {
        out.push(violation(id, "columns", "table has no columns"));
    }

    let mut seen = HashSet::new();
    for (i, column) in table.columns.iter().enumerate() {
        if column.name.trim().is_empty() {
            out.push(violation(id, format!("columns[{}].name", i), "column name is empty"));
        } else if !seen.insert(column.name.as_str()) {
            out.push(violation(
                id,
                "columns",
                format!("duplicate column name {}", column.name),
            ));
        }
        if column.typ.trim().is_empty() {
            out.push(violation(id, format!("columns[{}].type", i), "column type is empty"));
        }
    }
}

fn check_endpoint(
    schema: &Schema,
    rel: &Relationship,
    table_id: &TableId,
    column_id: &ColumnId,
    (table_field, column_field): (&str, &str),
    out: &mut Vec<Violation>,
) {
    let id = rel.id.as_str();
    match schema.table(table_id) {
        None => out.push(violation(id, table_field, format!("unknown table {}", table_id))),
        Some(table) if table.column(column_id).is_none() => out.push(violation(
            id,
            column_field,
            format!("unknown column {} in table {}", column_id, table_id),
        )),
        Some(_) => {}
    }
}

fn check_relationship(schema: &Schema, rel: &Relationship, out: &mut Vec<Violation>) {
    check_endpoint(
        schema,
        rel,
        &rel.from_table_id,
        &rel.from_column_id,
        ("fromTableId", "fromColumnId"),
        out,
    );
    check_endpoint(
        schema,
        rel,
        &rel.to_table_id,
        &rel.to_column_id,
        ("toTableId", "toColumnId"),
        out,
    );
    if rel.from_table_id == rel.to_table_id {
        out.push(violation(
            rel.id.as_str(),
            "toTableId",
            "relationship connects a table to itself",
        ));
    }
}

/// Collect every violation in `schema`.
pub fn validate(schema: &Schema) -> Vec<Violation> {
    let mut out = Vec::new();
    for table in schema.tables() {
        check_table(table, &mut out);
    }
    for rel in schema.relationships() {
        check_relationship(schema, rel, &mut out);
    }
    out
}

pub fn is_valid(schema: &Schema) -> bool {
    validate(schema).is_empty()
}
