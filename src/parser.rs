//! One-pass schema extraction: scan, build, resolve, infer.

use chrono::{DateTime, Utc};

use crate::builder::{EntityBuilder, Placement};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::dialect::{Dialect, UnknownDialect};
use crate::inference::{self, Edge};
use crate::model::{Relationship, RelationshipId, Schema, SchemaError, Table};
use crate::resolver;
use crate::scanner::Scanner;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Input is not valid UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),
    #[error("Input looks binary: NUL byte at offset {offset}")]
    BinaryInput { offset: usize },
    #[error(transparent)]
    UnknownDialect(#[from] UnknownDialect),
    #[error("Schema assembly failed: {0}")]
    Assembly(#[from] SchemaError),
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub placement: Placement,
    /// Fixed `createdAt`/`updatedAt`; defaults to the current time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Fixed schema id; defaults to a random UUID.
    pub schema_id: Option<String>,
}

/// Parse result: the schema plus everything that was dropped along the way.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Parser {
    dialect: Dialect,
    options: ParseOptions,
}

impl Parser {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse raw bytes, failing if they are not text.
    pub fn parse_bytes(&self, input: &[u8]) -> Result<ParseOutput, ParseError> {
        let text = std::str::from_utf8(input)?;
        self.parse(text)
    }

    pub fn parse(&self, input: &str) -> Result<ParseOutput, ParseError> {
        if let Some(offset) = input.find('\0') {
            return Err(ParseError::BinaryInput { offset });
        }

        let dialect = self.dialect.resolve(input);
        tracing::debug!(%dialect, bytes = input.len(), "parsing schema");

        let mut diagnostics = Diagnostics::default();
        let mut draft = EntityBuilder::new(self.options.placement, &mut diagnostics)
            .build(Scanner::new(input, dialect));
        let candidates = resolver::resolve(&mut draft.tables, &draft.references, &mut diagnostics);
        let edges = inference::infer(&draft.tables, &candidates, &mut diagnostics);

        let schema = self.assemble(draft.tables, &edges)?;
        Ok(ParseOutput {
            schema,
            diagnostics: diagnostics.into_vec(),
        })
    }

    fn assemble(&self, tables: Vec<Table>, edges: &[Edge]) -> Result<Schema, SchemaError> {
        let relationships: Vec<Relationship> = edges
            .iter()
            .enumerate()
            .map(|(i, e)| Relationship {
                id: RelationshipId::from_seq(i + 1),
                from_table_id: tables[e.from_table].id.clone(),
                from_column_id: tables[e.from_table].columns[e.from_column].id.clone(),
                to_table_id: tables[e.to_table].id.clone(),
                to_column_id: tables[e.to_table].columns[e.to_column].id.clone(),
                cardinality: e.cardinality,
                optional: e.optional,
            })
            .collect();

        let id = self
            .options
            .schema_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut schema = Schema::new(id, self.options.timestamp.unwrap_or_else(Utc::now));
        for table in tables {
            schema.add_table(table)?;
        }
        for rel in relationships {
            schema.add_relationship(rel)?;
        }
        Ok(schema)
    }
}

/// Parse `input` in `dialect` with default options.
pub fn parse(input: &str, dialect: Dialect) -> Result<ParseOutput, ParseError> {
    Parser::new(dialect).parse(input)
}
