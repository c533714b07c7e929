pub mod builder;
pub mod diagnostics;
pub mod dialect;
pub mod inference;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod summary;
pub mod validator;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use builder::Placement;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use dialect::{Dialect, UnknownDialect};
pub use model::{
    Cardinality, Column, ColumnId, Constraint, ConstraintKind, Metadata, Position, Relationship,
    RelationshipId, Schema, SchemaError, Table, TableId,
};
pub use parser::{parse, ParseError, ParseOptions, ParseOutput, Parser};
pub use validator::{is_valid, validate, Violation};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
struct ParseResponse<'a> {
    schema: &'a Schema,
    diagnostics: &'a [Diagnostic],
}

/// Parse schema source to `{ schema, diagnostics }` JSON.
#[wasm_bindgen(js_name = "parseSchema")]
pub fn parse_schema(source: &str, dialect: Option<String>) -> Result<String, String> {
    let dialect = match dialect.as_deref() {
        Some(name) => name.parse::<Dialect>().map_err(|e| e.to_string())?,
        None => Dialect::Auto,
    };
    let out = parse(source, dialect).map_err(|e| e.to_string())?;
    serde_json::to_string(&ParseResponse {
        schema: &out.schema,
        diagnostics: &out.diagnostics,
    })
    .map_err(|e| e.to_string())
}

/// Validate a schema JSON document, returning the violations as JSON.
#[wasm_bindgen(js_name = "validateSchema")]
pub fn validate_schema(json: &str) -> Result<String, String> {
    let schema = Schema::from_json(json).map_err(|e| e.to_string())?;
    serde_json::to_string(&validate(&schema)).map_err(|e| e.to_string())
}
