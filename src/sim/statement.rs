//! Recognises the handful of SQL statement shapes the simulated engine runs.

use crate::clients::query::QueryError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

static CREATE_SCHEMA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+SCHEMA\s+(IF\s+NOT\s+EXISTS\s+)?({IDENT})\.({IDENT})\s*(?:WITH\s*\((.*)\))?\s*;?\s*$"
    ))
    .unwrap()
});

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*CREATE\s+TABLE\s+(IF\s+NOT\s+EXISTS\s+)?({IDENT})\.({IDENT})\.({IDENT})\s*\((.*)\)\s*WITH\s*\((.*)\)\s*;?\s*$"
    ))
    .unwrap()
});

static DROP_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*DROP\s+TABLE\s+(IF\s+EXISTS\s+)?({IDENT})\.({IDENT})\.({IDENT})\s*;?\s*$"
    ))
    .unwrap()
});

static DROP_SCHEMA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*DROP\s+SCHEMA\s+(IF\s+EXISTS\s+)?({IDENT})\.({IDENT})\s*;?\s*$"
    ))
    .unwrap()
});

static CATALOGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+\*\s+FROM\s+system\.metadata\.catalogs\s*;?\s*$").unwrap()
});

static SELECT_ALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*SELECT\s+\*\s+FROM\s+({IDENT})\.({IDENT})\.({IDENT})(?:\s+LIMIT\s+(\d+))?\s*;?\s*$"
    ))
    .unwrap()
});

static SELECT_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*SELECT\s+(-?\d+)\s*;?\s*$").unwrap());

static PROPERTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)([A-Za-z_][A-Za-z0-9_]*)\s*=\s*'([^']*)'").unwrap());

/// `catalog.schema`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaName {
    pub catalog: String,
    pub schema: String,
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema)
    }
}

/// `catalog.schema.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn schema_name(&self) -> SchemaName {
        SchemaName {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateSchema {
        name: SchemaName,
        if_not_exists: bool,
        properties: HashMap<String, String>,
    },
    CreateTable {
        name: TableName,
        if_not_exists: bool,
        columns: Vec<ColumnDefinition>,
        properties: HashMap<String, String>,
    },
    DropTable {
        name: TableName,
        if_exists: bool,
    },
    DropSchema {
        name: SchemaName,
        if_exists: bool,
    },
    ListCatalogs,
    SelectAll {
        name: TableName,
        limit: Option<usize>,
    },
    SelectLiteral(i64),
}

fn lowercase(caps: &regex::Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default()
}

fn properties(raw: Option<regex::Match<'_>>) -> HashMap<String, String> {
    let Some(raw) = raw else {
        return HashMap::new();
    };
    PROPERTY_RE
        .captures_iter(raw.as_str())
        .map(|c| (c[1].to_ascii_lowercase(), c[2].to_string()))
        .collect()
}

/// Split a column list on top-level commas, so `decimal(10, 2)` stays whole.
fn columns(raw: &str) -> Result<Vec<ColumnDefinition>, QueryError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in raw.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, data_type) = part
                .split_once(char::is_whitespace)
                .ok_or_else(|| syntax_error(&format!("column definition '{part}' has no type")))?;
            Ok(ColumnDefinition {
                name: name.trim_matches('"').to_ascii_lowercase(),
                data_type: data_type.trim().to_string(),
            })
        })
        .collect()
}

fn syntax_error(message: &str) -> QueryError {
    QueryError::Query {
        name: "SYNTAX_ERROR".to_string(),
        message: message.to_string(),
    }
}

impl Statement {
    pub fn parse(sql: &str) -> Result<Self, QueryError> {
        if let Some(c) = CREATE_SCHEMA_RE.captures(sql) {
            return Ok(Statement::CreateSchema {
                name: SchemaName {
                    catalog: lowercase(&c, 2),
                    schema: lowercase(&c, 3),
                },
                if_not_exists: c.get(1).is_some(),
                properties: properties(c.get(4)),
            });
        }
        if let Some(c) = CREATE_TABLE_RE.captures(sql) {
            let columns = columns(&c[5])?;
            if columns.is_empty() {
                return Err(syntax_error("table must have at least one column"));
            }
            return Ok(Statement::CreateTable {
                name: TableName {
                    catalog: lowercase(&c, 2),
                    schema: lowercase(&c, 3),
                    table: lowercase(&c, 4),
                },
                if_not_exists: c.get(1).is_some(),
                columns,
                properties: properties(c.get(6)),
            });
        }
        if let Some(c) = DROP_TABLE_RE.captures(sql) {
            return Ok(Statement::DropTable {
                name: TableName {
                    catalog: lowercase(&c, 2),
                    schema: lowercase(&c, 3),
                    table: lowercase(&c, 4),
                },
                if_exists: c.get(1).is_some(),
            });
        }
        if let Some(c) = DROP_SCHEMA_RE.captures(sql) {
            return Ok(Statement::DropSchema {
                name: SchemaName {
                    catalog: lowercase(&c, 2),
                    schema: lowercase(&c, 3),
                },
                if_exists: c.get(1).is_some(),
            });
        }
        if CATALOGS_RE.is_match(sql) {
            return Ok(Statement::ListCatalogs);
        }
        if let Some(c) = SELECT_ALL_RE.captures(sql) {
            let limit = match c.get(4) {
                Some(m) => Some(
                    m.as_str()
                        .parse::<usize>()
                        .map_err(|_| syntax_error("LIMIT is out of range"))?,
                ),
                None => None,
            };
            return Ok(Statement::SelectAll {
                name: TableName {
                    catalog: lowercase(&c, 1),
                    schema: lowercase(&c, 2),
                    table: lowercase(&c, 3),
                },
                limit,
            });
        }
        if let Some(c) = SELECT_LITERAL_RE.captures(sql) {
            let value = c[1]
                .parse::<i64>()
                .map_err(|_| syntax_error("literal is out of range"))?;
            return Ok(Statement::SelectLiteral(value));
        }
        Err(QueryError::Query {
            name: "NOT_SUPPORTED".to_string(),
            message: format!("statement is not supported: {}", sql.trim()),
        })
    }
}
