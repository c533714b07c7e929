//! Entity builder.
//!
//! Folds classified lines into finalized tables and a queue of relationship
//! descriptors that still refer to tables and columns by name. Identifier
//! counters live in the builder, so every parse starts from `table-1`/`col-1`.

use std::collections::HashSet;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Cardinality, Column, ColumnId, Constraint, Position, Table, TableId};
use crate::scanner::{ColumnDef, ColumnRef, ForeignKeyDef, KeyDef, LineShape, RefOp, ScannedLine};

/// Initial table placement: tables are laid out left to right in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin_x: f64,
    pub origin_y: f64,
    pub spacing_x: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            origin_x: 50.0,
            origin_y: 50.0,
            spacing_x: 300.0,
        }
    }
}

impl Placement {
    /// Position of the table declared `order`-th (0-based).
    pub fn position(&self, order: usize) -> Position {
        Position {
            x: self.origin_x + order as f64 * self.spacing_x,
            y: self.origin_y,
        }
    }
}

/// Relationship descriptor keyed by table and column names.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReference {
    pub line: usize,
    /// Dependent side.
    pub from: ColumnRef,
    /// Referenced side.
    pub to: ColumnRef,
    pub cardinality: Cardinality,
    pub label: Option<String>,
}

impl RawReference {
    fn same_edge(&self, other: &RawReference) -> bool {
        self.from.table.eq_ignore_ascii_case(&other.from.table)
            && self.from.column == other.from.column
            && self.to.table.eq_ignore_ascii_case(&other.to.table)
            && self.to.column == other.to.column
    }

    pub fn describe(&self) -> String {
        format!(
            "{}.{} -> {}.{}",
            self.from.table, self.from.column, self.to.table, self.to.column
        )
    }
}

/// Builder output: finalized tables plus unresolved references.
#[derive(Debug, Default)]
pub struct Draft {
    pub tables: Vec<Table>,
    pub references: Vec<RawReference>,
}

struct OpenTable {
    table: Table,
    keys: Vec<(usize, KeyDef)>,
}

pub(crate) struct EntityBuilder<'d> {
    placement: Placement,
    draft: Draft,
    names: HashSet<String>,
    open: Option<OpenTable>,
    /// Inside the body of a rejected duplicate table
    skipping: bool,
    next_table: usize,
    next_column: usize,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> EntityBuilder<'d> {
    pub(crate) fn new(placement: Placement, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            placement,
            draft: Draft::default(),
            names: HashSet::new(),
            open: None,
            skipping: false,
            next_table: 0,
            next_column: 0,
            diagnostics,
        }
    }

    pub(crate) fn build(mut self, lines: impl Iterator<Item = ScannedLine>) -> Draft {
        for line in lines {
            self.feed(line);
        }
        self.finish()
    }

    fn feed(&mut self, line: ScannedLine) {
        let ScannedLine { line, text, shape } = line;
        match shape {
            LineShape::TableOpen { name } => self.open_table(line, name),
            LineShape::TableClose => {
                if self.skipping {
                    self.skipping = false;
                } else {
                    self.finalize();
                }
            }
            LineShape::Column(def) if !self.skipping => self.add_column(line, &text, def),
            LineShape::Relationship(rel) => {
                let (from, to, cardinality) = rel.op.orient(rel.left, rel.right);
                self.push_reference(RawReference {
                    line,
                    from,
                    to,
                    cardinality,
                    label: rel.label,
                });
            }
            LineShape::ForeignKey(fk) => self.add_foreign_key(line, &text, fk),
            LineShape::TableKey(key) if !self.skipping => match self.open.as_mut() {
                Some(open) => open.keys.push((line, key)),
                None => self.unrecognized(line, &text),
            },
            LineShape::Unrecognized if !self.skipping => self.unrecognized(line, &text),
            _ => {}
        }
    }

    fn unrecognized(&mut self, line: usize, text: &str) {
        self.diagnostics.push(
            Some(line),
            DiagnosticKind::UnrecognizedLine,
            format!("Ignoring unrecognized line: {}", text),
        );
    }

    fn open_table(&mut self, line: usize, name: String) {
        if self.open.is_some() {
            tracing::debug!(line, "table opened before previous one closed");
            self.finalize();
        }
        self.skipping = false;

        if !self.names.insert(name.to_lowercase()) {
            self.diagnostics.push(
                Some(line),
                DiagnosticKind::DuplicateTable,
                format!("Table {} is already declared; skipping this declaration", name),
            );
            self.skipping = true;
            return;
        }

        self.next_table += 1;
        let mut table = Table::new(TableId::from_seq(self.next_table), name);
        table.position = self.placement.position(self.next_table - 1);
        self.open = Some(OpenTable {
            table,
            keys: Vec::new(),
        });
    }

    fn add_column(&mut self, line: usize, text: &str, def: ColumnDef) {
        let Some(open) = self.open.as_mut() else {
            self.unrecognized(line, text);
            return;
        };

        self.next_column += 1;
        let mut column = Column::new(ColumnId::from_seq(self.next_column), def.name, def.typ);
        for kind in def.constraints {
            column.add_constraint(Constraint::new(kind));
        }

        let reference = def.reference.map(|r| {
            let this = ColumnRef {
                table: open.table.name.clone(),
                column: column.name.clone(),
            };
            let (from, to, cardinality) = r.op.orient(this, r.target);
            RawReference {
                line,
                from,
                to,
                cardinality,
                label: None,
            }
        });

        open.table.columns.push(column);
        if let Some(reference) = reference {
            self.push_reference(reference);
        }
    }

    fn add_foreign_key(&mut self, line: usize, text: &str, fk: ForeignKeyDef) {
        let table = match fk.table {
            Some(table) => table,
            None => match &self.open {
                Some(open) => open.table.name.clone(),
                None => {
                    if !self.skipping {
                        self.unrecognized(line, text);
                    }
                    return;
                }
            },
        };

        if fk.columns.len() != fk.target_columns.len() {
            self.diagnostics.push(
                Some(line),
                DiagnosticKind::MismatchedForeignKey,
                format!(
                    "Foreign key on {} names {} column(s) but {} target column(s) in {}; skipping it",
                    table,
                    fk.columns.len(),
                    fk.target_columns.len(),
                    fk.target_table
                ),
            );
            return;
        }

        for (column, target_column) in fk.columns.into_iter().zip(fk.target_columns) {
            let this = ColumnRef {
                table: table.clone(),
                column,
            };
            let target = ColumnRef {
                table: fk.target_table.clone(),
                column: target_column,
            };
            let (from, to, cardinality) = RefOp::ManyToOne.orient(this, target);
            self.push_reference(RawReference {
                line,
                from,
                to,
                cardinality,
                label: None,
            });
        }
    }

    fn push_reference(&mut self, reference: RawReference) {
        if self.draft.references.iter().any(|r| r.same_edge(&reference)) {
            self.diagnostics.push(
                Some(reference.line),
                DiagnosticKind::DuplicateReference,
                format!("Foreign key {} declared more than once", reference.describe()),
            );
            return;
        }
        self.draft.references.push(reference);
    }

    fn finalize(&mut self) {
        let Some(OpenTable { mut table, keys }) = self.open.take() else {
            return;
        };

        for (line, key) in keys {
            for name in &key.columns {
                match table.columns.iter_mut().find(|c| &c.name == name) {
                    Some(column) => column.add_constraint(Constraint::new(key.kind)),
                    None => self.diagnostics.push(
                        Some(line),
                        DiagnosticKind::UnknownColumn,
                        format!("Key names unknown column {}.{}", table.name, name),
                    ),
                }
            }
        }

        tracing::debug!(table = %table.name, columns = table.columns.len(), "table finalized");
        self.draft.tables.push(table);
    }

    fn finish(mut self) -> Draft {
        self.finalize();
        self.draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::model::ConstraintKind;
    use crate::scanner::Scanner;

    fn build(input: &str, dialect: Dialect) -> (Draft, Vec<crate::diagnostics::Diagnostic>) {
        let mut diagnostics = Diagnostics::default();
        let draft = EntityBuilder::new(Placement::default(), &mut diagnostics)
            .build(Scanner::new(input, dialect));
        (draft, diagnostics.into_vec())
    }

    #[test]
    fn test_ids_follow_declaration_order() {
        let input = "Table a {\n x int\n y int\n}\nTable b {\n z int\n}";
        let (draft, _) = build(input, Dialect::TableDefinition);

        assert_eq!(draft.tables[0].id.as_str(), "table-1");
        assert_eq!(draft.tables[1].id.as_str(), "table-2");
        let col_ids: Vec<&str> = draft
            .tables
            .iter()
            .flat_map(|t| t.columns.iter().map(|c| c.id.as_str()))
            .collect();
        assert_eq!(col_ids, vec!["col-1", "col-2", "col-3"]);
    }

    #[test]
    fn test_position_from_order() {
        let (draft, _) = build("Table a {\n x int\n}\nTable b {\n z int\n}", Dialect::TableDefinition);
        assert_eq!(draft.tables[0].position, Position { x: 50.0, y: 50.0 });
        assert_eq!(draft.tables[1].position, Position { x: 350.0, y: 50.0 });
    }

    #[test]
    fn test_finalize_on_eof() {
        let (draft, _) = build("Table a {\n x int\n", Dialect::TableDefinition);
        assert_eq!(draft.tables.len(), 1);
        assert_eq!(draft.tables[0].columns.len(), 1);
    }

    #[test]
    fn test_operator_direction() {
        let (draft, _) = build("Ref: users.id < posts.user_id", Dialect::TableDefinition);
        let r = &draft.references[0];
        assert_eq!(r.from.table, "posts");
        assert_eq!(r.from.column, "user_id");
        assert_eq!(r.to.table, "users");
        assert_eq!(r.cardinality, Cardinality::OneToMany);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let input = "Table a {\n x int\n}\nTable A {\n y int\n}\nTable b {\n z int\n}";
        let (draft, diagnostics) = build(input, Dialect::TableDefinition);

        assert_eq!(draft.tables.len(), 2);
        assert_eq!(draft.tables[0].columns[0].name, "x");
        assert_eq!(draft.tables[1].id.as_str(), "table-2");
        assert_eq!(draft.tables[1].columns[0].id.as_str(), "col-2");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateTable);
    }

    #[test]
    fn test_ddl_inline_and_standalone_fk_counted_once() {
        let input = "CREATE TABLE posts (\n  id INT PRIMARY KEY,\n  user_id INT REFERENCES users(id),\n  FOREIGN KEY (user_id) REFERENCES users(id)\n);";
        let (draft, diagnostics) = build(input, Dialect::Ddl);

        assert_eq!(draft.references.len(), 1);
        assert_eq!(draft.references[0].from.table, "posts");
        assert_eq!(draft.references[0].to.table, "users");
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateReference);
    }

    #[test]
    fn test_table_level_primary_key_applied() {
        let input = "CREATE TABLE e (\n  a INT,\n  b INT,\n  PRIMARY KEY (a, b)\n);";
        let (draft, _) = build(input, Dialect::Ddl);
        assert!(draft.tables[0].columns.iter().all(|c| c.has(ConstraintKind::PrimaryKey)));
    }

    #[test]
    fn test_composite_foreign_key_paired() {
        let input = "CREATE TABLE line (\n  o INT,\n  p INT,\n  FOREIGN KEY (o, p) REFERENCES item(order_id, pos)\n);";
        let (draft, _) = build(input, Dialect::Ddl);
        assert_eq!(draft.references.len(), 2);
        assert_eq!(draft.references[1].from.column, "p");
        assert_eq!(draft.references[1].to.column, "pos");
    }

    #[test]
    fn test_mismatched_foreign_key_skipped() {
        let input = "CREATE TABLE line (\n  x INT,\n  y INT,\n  FOREIGN KEY (x, y) REFERENCES a\n);";
        let (draft, diagnostics) = build(input, Dialect::Ddl);
        assert!(draft.references.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MismatchedForeignKey);
        assert_eq!(diagnostics[0].line, Some(4));
    }

    #[test]
    fn test_unrecognized_lines_reported() {
        let (draft, diagnostics) = build("hello world\nTable a {\n x int\n}", Dialect::TableDefinition);
        assert_eq!(draft.tables.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, Some(1));
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnrecognizedLine);
    }
}
