//! psql-style rendering of query results.

use crate::clients::query::QueryResult;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Printed in place of a table when a statement returned no rows.
pub const NO_DATA_MESSAGE: &str = "No data was returned from the table";

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render rows under a header line, or [`NO_DATA_MESSAGE`] when empty.
pub fn render_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(result.columns.iter().cloned());
    for row in &result.rows {
        builder.push_record(row.iter().map(cell));
    }
    let mut table = builder.build();
    table.with(Style::psql());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_result_prints_message() {
        assert_eq!(render_table(&QueryResult::default()), NO_DATA_MESSAGE);
    }

    #[test]
    fn test_rows_render_under_header() {
        let result = QueryResult {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![json!(1), json!("Alice")], vec![json!(2), Value::Null]],
        };
        let rendered = render_table(&result);
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].contains("id") && lines[0].contains("name"));
        assert!(lines[1].contains("-+-"));
        assert!(rendered.contains("Alice"));
        assert!(rendered.contains("NULL"));
    }
}
