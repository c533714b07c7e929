//! Reference resolver.
//!
//! Maps name-keyed descriptors onto the finalized table arena. The name index
//! is built once from the complete table list before any descriptor is
//! looked at, so forward references resolve exactly like backward ones.

use std::collections::HashMap;

use crate::builder::RawReference;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Cardinality, Constraint, ConstraintKind, Table};

/// A resolved edge, as indices into the table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub from_table: usize,
    pub from_column: usize,
    pub to_table: usize,
    pub to_column: usize,
    pub cardinality: Cardinality,
}

struct Unresolved {
    kind: DiagnosticKind,
    message: String,
}

struct NameIndex(HashMap<String, usize>);

impl NameIndex {
    fn new(tables: &[Table]) -> Self {
        Self(
            tables
                .iter()
                .enumerate()
                .map(|(i, t)| (t.name.to_lowercase(), i))
                .collect(),
        )
    }

    fn locate(&self, tables: &[Table], table: &str, column: &str) -> Result<(usize, usize), Unresolved> {
        let t = *self.0.get(&table.to_lowercase()).ok_or_else(|| Unresolved {
            kind: DiagnosticKind::UnknownTable,
            message: format!("Unknown table {}", table),
        })?;
        let c = tables[t]
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| Unresolved {
                kind: DiagnosticKind::UnknownColumn,
                message: format!("Unknown column {}.{}", tables[t].name, column),
            })?;
        Ok((t, c))
    }
}

fn resolve_one(index: &NameIndex, tables: &[Table], r: &RawReference) -> Result<Candidate, Unresolved> {
    let (from_table, from_column) = index.locate(tables, &r.from.table, &r.from.column)?;
    let (to_table, to_column) = index.locate(tables, &r.to.table, &r.to.column)?;
    if from_table == to_table {
        return Err(Unresolved {
            kind: DiagnosticKind::SelfReference,
            message: format!("Table {} references itself", tables[from_table].name),
        });
    }
    Ok(Candidate {
        from_table,
        from_column,
        to_table,
        to_column,
        cardinality: r.cardinality,
    })
}

/// Resolve every descriptor, dropping the ones that do not fully resolve.
///
/// Resolved from-columns get a display FOREIGN_KEY constraint.
pub(crate) fn resolve(
    tables: &mut [Table],
    references: &[RawReference],
    diagnostics: &mut Diagnostics,
) -> Vec<Candidate> {
    let index = NameIndex::new(tables);
    let mut candidates = Vec::with_capacity(references.len());

    for r in references {
        match resolve_one(&index, tables, r) {
            Ok(candidate) => candidates.push(candidate),
            Err(Unresolved { kind, message }) => diagnostics.push(
                Some(r.line),
                kind,
                format!("Dropping reference {}: {}", r.describe(), message),
            ),
        }
    }

    for c in &candidates {
        let target = format!(
            "{}.{}",
            tables[c.to_table].name, tables[c.to_table].columns[c.to_column].name
        );
        let column = &mut tables[c.from_table].columns[c.from_column];
        if !column.has(ConstraintKind::ForeignKey) {
            column.add_constraint(Constraint::foreign_key(target));
        }
    }

    tracing::debug!(
        resolved = candidates.len(),
        dropped = references.len() - candidates.len(),
        "references resolved"
    );
    candidates
}
