//! Plain-text schema summary for terminals.
//!
//! Columns are aligned by display width so wide (CJK) names line up.

use std::fmt;
use unicode_width::UnicodeWidthStr;

use crate::model::{ConstraintKind, Schema};

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{}{}", text, " ".repeat(fill))
}

fn flags(kinds: impl Iterator<Item = ConstraintKind>) -> String {
    kinds
        .map(|k| match k {
            ConstraintKind::PrimaryKey => "PK",
            ConstraintKind::ForeignKey => "FK",
            ConstraintKind::Unique => "UQ",
            ConstraintKind::NotNull => "NN",
            ConstraintKind::AutoIncrement => "AI",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Aligned listing of tables, columns and relationships.
pub struct Summary<'a>(pub &'a Schema);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.0;

        for table in schema.tables() {
            writeln!(f, "{} ({})", table.name, table.id)?;

            let name_width = table
                .columns
                .iter()
                .map(|c| UnicodeWidthStr::width(c.name.as_str()))
                .max()
                .unwrap_or(0);
            let type_width = table
                .columns
                .iter()
                .map(|c| UnicodeWidthStr::width(c.typ.as_str()))
                .max()
                .unwrap_or(0);

            for column in &table.columns {
                let line = format!(
                    "  {}  {}  {}",
                    pad(&column.name, name_width),
                    pad(&column.typ, type_width),
                    flags(column.constraints.iter().map(|c| c.kind))
                );
                writeln!(f, "{}", line.trim_end())?;
            }
            writeln!(f)?;
        }

        if schema.relationships().is_empty() {
            return Ok(());
        }

        let endpoint = |table_id, column_id| {
            schema
                .table(table_id)
                .map(|t| {
                    let column = t.column(column_id).map(|c| c.name.as_str()).unwrap_or("?");
                    format!("{}.{}", t.name, column)
                })
                .unwrap_or_else(|| "?".to_string())
        };

        let rows: Vec<(String, String, String)> = schema
            .relationships()
            .iter()
            .map(|r| {
                (
                    endpoint(&r.from_table_id, &r.from_column_id),
                    endpoint(&r.to_table_id, &r.to_column_id),
                    r.cardinality.to_string(),
                )
            })
            .collect();
        let from_width = rows
            .iter()
            .map(|(from, _, _)| UnicodeWidthStr::width(from.as_str()))
            .max()
            .unwrap_or(0);
        let to_width = rows
            .iter()
            .map(|(_, to, _)| UnicodeWidthStr::width(to.as_str()))
            .max()
            .unwrap_or(0);

        writeln!(f, "Relationships")?;
        for (from, to, card) in &rows {
            writeln!(f, "  {} -> {}  {}", pad(from, from_width), pad(to, to_width), card)?;
        }
        Ok(())
    }
}

/// Render `schema` as a [`Summary`] string.
pub fn render(schema: &Schema) -> String {
    Summary(schema).to_string()
}
