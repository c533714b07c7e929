//! Cardinality inference.
//!
//! A junction table is a table with exactly two outgoing one-to-many edges
//! whose source columns are both part of its primary key. Its two edges are
//! replaced by one many-to-many edge between the tables it bridges. Decisions
//! are made once over the complete candidate set.

use std::collections::HashMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Cardinality, ConstraintKind, Table};
use crate::resolver::Candidate;

/// Final edge, as arena indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from_table: usize,
    pub from_column: usize,
    pub to_table: usize,
    pub to_column: usize,
    pub cardinality: Cardinality,
    pub optional: bool,
}

impl Edge {
    fn passthrough(tables: &[Table], c: &Candidate) -> Self {
        let column = &tables[c.from_table].columns[c.from_column];
        Self {
            from_table: c.from_table,
            from_column: c.from_column,
            to_table: c.to_table,
            to_column: c.to_column,
            cardinality: c.cardinality,
            optional: !column.has(ConstraintKind::NotNull) && !column.is_primary_key(),
        }
    }
}

enum Junction {
    /// Not shaped like a junction table.
    No,
    /// Shaped like one, but cannot be collapsed.
    Abandoned(String),
    Collapsed(Edge),
}

fn primary_key_index(table: &Table) -> Option<usize> {
    table.columns.iter().position(|c| c.is_primary_key())
}

fn classify(tables: &[Table], a: &Candidate, b: &Candidate) -> Junction {
    let one_to_many = |c: &Candidate| c.cardinality == Cardinality::OneToMany;
    let keyed = |c: &Candidate| tables[c.from_table].columns[c.from_column].is_primary_key();
    if !(one_to_many(a) && one_to_many(b) && keyed(a) && keyed(b)) {
        return Junction::No;
    }

    let junction = &tables[a.from_table].name;
    let (t1, t2) = (a.to_table, b.to_table);
    if t1 == t2 {
        return Junction::Abandoned(format!(
            "{} bridges {} to itself",
            junction, tables[t1].name
        ));
    }

    match (primary_key_index(&tables[t1]), primary_key_index(&tables[t2])) {
        (Some(pk1), Some(pk2)) => Junction::Collapsed(Edge {
            from_table: t1,
            from_column: pk1,
            to_table: t2,
            to_column: pk2,
            cardinality: Cardinality::ManyToMany,
            optional: true,
        }),
        (None, _) | (_, None) => {
            let missing = if primary_key_index(&tables[t1]).is_none() { t1 } else { t2 };
            Junction::Abandoned(format!(
                "{} has no primary key to bridge through {}",
                tables[missing].name, junction
            ))
        }
    }
}

/// Rewrite junction-table edge pairs into many-to-many edges.
///
/// Output keeps candidate order; a collapsed pair is replaced in place by its
/// many-to-many edge.
pub(crate) fn infer(tables: &[Table], candidates: &[Candidate], diagnostics: &mut Diagnostics) -> Vec<Edge> {
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, c) in candidates.iter().enumerate() {
        groups.entry(c.from_table).or_default().push(i);
    }

    let mut collapsed: HashMap<usize, Edge> = HashMap::new();
    let mut junctions: Vec<(usize, &Vec<usize>)> = groups
        .iter()
        .filter(|(_, members)| members.len() == 2)
        .map(|(table, members)| (*table, members))
        .collect();
    junctions.sort_by_key(|(table, _)| *table);

    for (table, members) in junctions {
        match classify(tables, &candidates[members[0]], &candidates[members[1]]) {
            Junction::No => {}
            Junction::Abandoned(reason) => {
                diagnostics.push(None, DiagnosticKind::JunctionAbandoned, reason);
            }
            Junction::Collapsed(edge) => {
                tracing::debug!(junction = %tables[table].name, "collapsed junction table");
                collapsed.insert(table, edge);
            }
        }
    }

    let mut edges = Vec::with_capacity(candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        match collapsed.get(&c.from_table) {
            Some(edge) => {
                if groups[&c.from_table][0] == i {
                    edges.push(*edge);
                }
            }
            None => edges.push(Edge::passthrough(tables, c)),
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnId, Constraint, TableId};

    fn table(n: usize, name: &str, cols: &[(&str, &[ConstraintKind])]) -> Table {
        let mut t = Table::new(TableId::from_seq(n), name);
        for (i, (col, kinds)) in cols.iter().enumerate() {
            let mut c = Column::new(ColumnId::from_seq(n * 10 + i), *col, "int");
            for kind in *kinds {
                c.add_constraint(Constraint::new(*kind));
            }
            t.columns.push(c);
        }
        t
    }

    const PK: &[ConstraintKind] = &[ConstraintKind::PrimaryKey];
    const NONE: &[ConstraintKind] = &[];
    const NN: &[ConstraintKind] = &[ConstraintKind::NotNull];

    fn candidate(from: (usize, usize), to: (usize, usize)) -> Candidate {
        Candidate {
            from_table: from.0,
            from_column: from.1,
            to_table: to.0,
            to_column: to.1,
            cardinality: Cardinality::OneToMany,
        }
    }

    fn school(course_id: &'static [ConstraintKind]) -> Vec<Table> {
        vec![
            table(1, "Student", &[("id", PK)]),
            table(2, "Course", &[("id", PK)]),
            table(3, "Enrollment", &[("student_id", PK), ("course_id", course_id)]),
        ]
    }

    #[test]
    fn test_junction_collapsed() {
        let tables = school(PK);
        let candidates = vec![candidate((2, 0), (0, 0)), candidate((2, 1), (1, 0))];
        let mut diagnostics = Diagnostics::default();
        let edges = infer(&tables, &candidates, &mut diagnostics);

        assert_eq!(
            edges,
            vec![Edge {
                from_table: 0,
                from_column: 0,
                to_table: 1,
                to_column: 0,
                cardinality: Cardinality::ManyToMany,
                optional: true,
            }]
        );
        assert!(diagnostics.into_vec().is_empty());
    }

    #[test]
    fn test_partial_key_not_junction() {
        let tables = school(NONE);
        let candidates = vec![candidate((2, 0), (0, 0)), candidate((2, 1), (1, 0))];
        let edges = infer(&tables, &candidates, &mut Diagnostics::default());

        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.cardinality == Cardinality::OneToMany));
        assert_eq!(edges[0].from_table, 2);
        assert!(!edges[0].optional);
        assert!(edges[1].optional);
    }

    #[test]
    fn test_three_foreign_keys_not_junction() {
        let mut tables = school(PK);
        tables.push(table(4, "Term", &[("id", PK)]));
        tables[2].columns.push(Column::new(ColumnId::from_seq(99), "term_id", "int"));
        tables[2].columns[2].add_constraint(Constraint::new(ConstraintKind::PrimaryKey));
        let candidates = vec![
            candidate((2, 0), (0, 0)),
            candidate((2, 1), (1, 0)),
            candidate((2, 2), (3, 0)),
        ];
        let edges = infer(&tables, &candidates, &mut Diagnostics::default());
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().all(|e| e.cardinality == Cardinality::OneToMany));
    }

    #[test]
    fn test_target_without_primary_key_abandons() {
        let mut tables = school(PK);
        tables[1] = table(2, "Course", &[("code", NN)]);
        let candidates = vec![candidate((2, 0), (0, 0)), candidate((2, 1), (1, 0))];
        let mut diagnostics = Diagnostics::default();
        let edges = infer(&tables, &candidates, &mut diagnostics);

        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.cardinality == Cardinality::OneToMany));
        assert_eq!(diagnostics.into_vec()[0].kind, DiagnosticKind::JunctionAbandoned);
    }

    #[test]
    fn test_two_junctions_same_pair_not_deduplicated() {
        let mut tables = school(PK);
        tables.push(table(4, "Waitlist", &[("student_id", PK), ("course_id", PK)]));
        let candidates = vec![
            candidate((2, 0), (0, 0)),
            candidate((2, 1), (1, 0)),
            candidate((3, 0), (0, 0)),
            candidate((3, 1), (1, 0)),
        ];
        let edges = infer(&tables, &candidates, &mut Diagnostics::default());
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.cardinality == Cardinality::ManyToMany));
    }

    #[test]
    fn test_other_edges_pass_through_in_order() {
        let mut tables = school(PK);
        tables.push(table(4, "Grade", &[("id", PK), ("student_id", NN)]));
        let candidates = vec![
            candidate((3, 1), (0, 0)),
            candidate((2, 0), (0, 0)),
            candidate((2, 1), (1, 0)),
        ];
        let edges = infer(&tables, &candidates, &mut Diagnostics::default());
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].cardinality, Cardinality::OneToMany);
        assert_eq!(edges[1].cardinality, Cardinality::ManyToMany);
    }
}
