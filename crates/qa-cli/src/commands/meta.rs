//! Ad-hoc SQL over the stored ledger snapshot

use anyhow::{Context, Result};
use qa_meta::QueryResult;
use serde_json::{Map, Value};

use crate::cli::{GlobalArgs, MetaArgs, MetaCommands};
use crate::commands::common::{print_json, print_table};
use crate::context::Workspace;

/// Execute a meta subcommand
pub(crate) async fn execute(args: &MetaArgs, global: &GlobalArgs) -> Result<()> {
    let ws = Workspace::open(global)?;
    match &args.command {
        MetaCommands::Query(query) => {
            let result = qa_meta::execute_query(ws.db.conn(), &query.sql)
                .context("Failed to execute query")?;
            if ws.json() {
                return print_json(&rows_as_objects(&result));
            }
            if result.rows.is_empty() {
                println!("(0 rows)");
                return Ok(());
            }
            let headers: Vec<&str> = result.columns.iter().map(String::as_str).collect();
            print_table(&headers, &result.rows);
            println!("\n({} rows)", result.rows.len());
            Ok(())
        }
        MetaCommands::Tables => {
            let conn = ws.db.conn();
            let tables = qa_meta::list_tables(conn).context("Failed to list meta tables")?;
            let mut counts = Vec::with_capacity(tables.len());
            for table in &tables {
                counts.push((table.as_str(), qa_meta::table_row_count(conn, table)?));
            }
            if ws.json() {
                let map: Map<String, Value> = counts
                    .iter()
                    .map(|(name, count)| (name.to_string(), Value::from(*count)))
                    .collect();
                return print_json(&map);
            }
            let rows: Vec<Vec<String>> = counts
                .iter()
                .map(|(name, count)| vec![name.to_string(), count.to_string()])
                .collect();
            print_table(&["TABLE", "ROWS"], &rows);
            Ok(())
        }
    }
}

/// One JSON object per row; the literal `null` cell becomes JSON null
fn rows_as_objects(result: &QueryResult) -> Vec<Value> {
    result
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = result
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| {
                    let value = match cell.as_str() {
                        "null" => Value::Null,
                        text => Value::String(text.to_string()),
                    };
                    (column.clone(), value)
                })
                .collect();
            Value::Object(object)
        })
        .collect()
}
