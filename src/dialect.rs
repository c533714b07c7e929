//! Input dialect selection and detection.

use std::fmt;
use std::str::FromStr;

use crate::scanner::strip_create_table;

/// Schema text dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Auto-detect from content
    #[default]
    Auto,
    /// `Table name { ... }` / `Ref: a.b > c.d` table-definition language
    TableDefinition,
    /// SQL `CREATE TABLE` statements
    Ddl,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown dialect: {0} (expected table-definition, ddl or auto)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "table-definition" | "table_definition" | "dbml" => Ok(Self::TableDefinition),
            "ddl" | "sql" => Ok(Self::Ddl),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::TableDefinition => "table-definition",
            Self::Ddl => "ddl",
        })
    }
}

impl Dialect {
    /// Guess the dialect from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "sql" | "ddl" => Some(Self::Ddl),
            "dbml" => Some(Self::TableDefinition),
            _ => None,
        }
    }

    /// Detect dialect from content.
    pub fn detect(content: &str) -> Self {
        let has_create_table = content
            .lines()
            .any(|line| strip_create_table(line).is_some());

        if has_create_table {
            Self::Ddl
        } else {
            Self::TableDefinition
        }
    }

    /// Resolve Auto to a concrete dialect.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }
}
