//! Relational schema graph.
//!
//! [`Schema`] is the aggregate root: it owns tables (in declaration order) and
//! relationships, and every mutation goes through methods that keep the graph
//! free of dangling relationships. The serde representation is the persisted
//! JSON document shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Sequential id, e.g. `table-3`.
            pub fn from_seq(n: usize) -> Self {
                Self(format!(concat!($prefix, "-{}"), n))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(TableId, "table");
string_id!(ColumnId, "col");
string_id!(RelationshipId, "rel");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Table id already present: {0}")]
    DuplicateTable(TableId),
    #[error("Table name already in use: {0}")]
    DuplicateTableName(String),
    #[error("Column id already present: {0}")]
    DuplicateColumn(ColumnId),
    #[error("Relationship id already present: {0}")]
    DuplicateRelationship(RelationshipId),
    #[error("Unknown table: {0}")]
    UnknownTable(TableId),
    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: TableId, column: ColumnId },
    #[error("Relationship {0} connects a table to itself")]
    SelfReference(RelationshipId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    NotNull,
    AutoIncrement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// Display-only `Table.column` text for foreign keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind, value: None }
    }

    pub fn foreign_key(target: impl Into<String>) -> Self {
        Self {
            kind: ConstraintKind::ForeignKey,
            value: Some(target.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Column {
    pub fn new(id: ColumnId, name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            typ: typ.into(),
            constraints: Vec::new(),
        }
    }

    pub fn has(&self, kind: ConstraintKind) -> bool {
        self.constraints.iter().any(|c| c.kind == kind)
    }

    pub fn is_primary_key(&self) -> bool {
        self.has(ConstraintKind::PrimaryKey)
    }

    /// Add a constraint unless one of the same kind is already present.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        if !self.has(constraint.kind) {
            self.constraints.push(constraint);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            position: Position::default(),
            columns: Vec::new(),
        }
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Exact-name column lookup.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First column carrying PRIMARY_KEY.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneToOne => "1:1",
            Self::OneToMany => "1:N",
            Self::ManyToMany => "N:M",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub from_table_id: TableId,
    pub from_column_id: ColumnId,
    pub to_table_id: TableId,
    pub to_column_id: ColumnId,
    #[serde(rename = "type")]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub optional: bool,
}

impl Relationship {
    pub fn touches_table(&self, table: &TableId) -> bool {
        &self.from_table_id == table || &self.to_table_id == table
    }

    pub fn touches_column(&self, column: &ColumnId) -> bool {
        &self.from_column_id == column || &self.to_column_id == column
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

/// Aggregate root of the schema graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument")]
pub struct Schema {
    pub(crate) id: String,
    pub(crate) tables: Vec<Table>,
    pub(crate) relationships: Vec<Relationship>,
    pub(crate) metadata: Metadata,
}

impl Schema {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            tables: Vec::new(),
            relationships: Vec::new(),
            metadata: Metadata::at(created_at),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tables in declaration order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.tables.iter().find(|t| &t.id == id)
    }

    /// Case-insensitive table lookup.
    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        let needle = name.to_lowercase();
        self.tables.iter().find(|t| t.name.to_lowercase() == needle)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.id == id)
    }

    fn has_column_id(&self, id: &ColumnId) -> bool {
        self.tables.iter().any(|t| t.column(id).is_some())
    }

    fn table_mut(&mut self, id: &TableId) -> Result<&mut Table, SchemaError> {
        self.tables
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| SchemaError::UnknownTable(id.clone()))
    }

    fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        if self.table(&table.id).is_some() {
            return Err(SchemaError::DuplicateTable(table.id));
        }
        if self.table_by_name(&table.name).is_some() {
            return Err(SchemaError::DuplicateTableName(table.name));
        }
        for (i, column) in table.columns.iter().enumerate() {
            let repeated = table.columns[..i].iter().any(|c| c.id == column.id);
            if repeated || self.has_column_id(&column.id) {
                return Err(SchemaError::DuplicateColumn(column.id.clone()));
            }
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn add_relationship(&mut self, rel: Relationship) -> Result<(), SchemaError> {
        if self.relationship(&rel.id).is_some() {
            return Err(SchemaError::DuplicateRelationship(rel.id));
        }
        if rel.from_table_id == rel.to_table_id {
            return Err(SchemaError::SelfReference(rel.id));
        }
        for (table_id, column_id) in [
            (&rel.from_table_id, &rel.from_column_id),
            (&rel.to_table_id, &rel.to_column_id),
        ] {
            let table = self
                .table(table_id)
                .ok_or_else(|| SchemaError::UnknownTable(table_id.clone()))?;
            if table.column(column_id).is_none() {
                return Err(SchemaError::UnknownColumn {
                    table: table_id.clone(),
                    column: column_id.clone(),
                });
            }
        }
        self.relationships.push(rel);
        Ok(())
    }

    pub fn remove_relationship(&mut self, id: &RelationshipId) -> Option<Relationship> {
        let idx = self.relationships.iter().position(|r| &r.id == id)?;
        self.touch();
        Some(self.relationships.remove(idx))
    }

    /// Remove a table together with every relationship touching it.
    pub fn remove_table(&mut self, id: &TableId) -> Result<Table, SchemaError> {
        let idx = self
            .tables
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| SchemaError::UnknownTable(id.clone()))?;
        self.relationships.retain(|r| !r.touches_table(id));
        self.touch();
        Ok(self.tables.remove(idx))
    }

    pub fn rename_table(&mut self, id: &TableId, name: impl Into<String>) -> Result<(), SchemaError> {
        let name = name.into();
        if let Some(other) = self.table_by_name(&name) {
            if &other.id != id {
                return Err(SchemaError::DuplicateTableName(name));
            }
        }
        self.table_mut(id)?.name = name;
        self.touch();
        Ok(())
    }

    pub fn set_position(&mut self, id: &TableId, position: Position) -> Result<(), SchemaError> {
        self.table_mut(id)?.position = position;
        self.touch();
        Ok(())
    }

    pub fn add_column(&mut self, table: &TableId, column: Column) -> Result<(), SchemaError> {
        if self.has_column_id(&column.id) {
            return Err(SchemaError::DuplicateColumn(column.id));
        }
        self.table_mut(table)?.columns.push(column);
        self.touch();
        Ok(())
    }

    /// Remove a column together with every relationship touching it.
    pub fn remove_column(&mut self, table: &TableId, column: &ColumnId) -> Result<Column, SchemaError> {
        let owner = self.table_mut(table)?;
        let idx = owner
            .columns
            .iter()
            .position(|c| &c.id == column)
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: table.clone(),
                column: column.clone(),
            })?;
        let removed = owner.columns.remove(idx);
        self.relationships.retain(|r| !r.touches_column(column));
        self.touch();
        Ok(removed)
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Unchecked wire form; converted through the checked insertion API.
#[derive(Deserialize)]
struct SchemaDocument {
    id: String,
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    relationships: Vec<Relationship>,
    metadata: Metadata,
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = SchemaError;

    fn try_from(doc: SchemaDocument) -> Result<Self, Self::Error> {
        let mut schema = Schema::new(doc.id, doc.metadata.created_at);
        schema.metadata = doc.metadata;
        for table in doc.tables {
            schema.add_table(table)?;
        }
        for rel in doc.relationships {
            schema.add_relationship(rel)?;
        }
        Ok(schema)
    }
}
