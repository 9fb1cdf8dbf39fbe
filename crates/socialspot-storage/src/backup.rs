// SQL dump of the public schema
//
// Produces a plain SQL script: one CREATE TABLE rebuilt from
// information_schema per table, followed by one INSERT per row.

use async_trait::async_trait;
use serde_json::Value;
use socialspot_core::{BackupSource, CoreError, Result};

use crate::models::ColumnInfoRow;
use crate::repositories::Database;

#[derive(Clone)]
pub struct DbBackupSource {
    db: Database,
}

impl DbBackupSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public'
              AND table_type = 'BASE TABLE'
              AND table_name NOT LIKE '\_sqlx%'
            ORDER BY table_name
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> anyhow::Result<Vec<ColumnInfoRow>> {
        let columns = sqlx::query_as::<_, ColumnInfoRow>(
            r#"
            SELECT column_name::text, data_type::text, is_nullable::text, column_default::text
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(self.db.pool())
        .await?;

        Ok(columns)
    }

    async fn table_rows(&self, table: &str) -> anyhow::Result<Vec<Value>> {
        let sql = format!("SELECT row_to_json(t)::text FROM {} t", quote_ident(table));
        let rows: Vec<String> = sqlx::query_scalar(&sql).fetch_all(self.db.pool()).await?;

        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(anyhow::Error::from))
            .collect()
    }

    async fn dump(&self) -> anyhow::Result<String> {
        sqlx::query("SELECT 1").execute(self.db.pool()).await?;

        let tables = self.list_tables().await?;
        tracing::info!(tables = tables.len(), "Dumping database");

        let mut dump = String::new();
        for table in &tables {
            let columns = self.list_columns(table).await?;
            if columns.is_empty() {
                anyhow::bail!("Failed to get schema for table {table}");
            }
            dump.push_str(&render_create_table(table, &columns));
            dump.push_str("\n\n");

            let rows = self.table_rows(table).await?;
            tracing::debug!(table = %table, rows = rows.len(), "Dumping table");
            let names: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();
            for row in &rows {
                dump.push_str(&render_insert(table, &names, row));
                dump.push('\n');
            }
            dump.push('\n');
        }

        Ok(dump)
    }
}

#[async_trait]
impl BackupSource for DbBackupSource {
    async fn dump_sql(&self) -> Result<String> {
        self.dump().await.map_err(|e| CoreError::store(e.to_string()))
    }
}

/// Double-quote an identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement for a table, from its column metadata.
///
/// Sequence defaults are dropped because the sequences are not part of the dump.
pub fn render_create_table(table: &str, columns: &[ColumnInfoRow]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|column| {
            let mut definition = format!(
                "    {} {}",
                quote_ident(&column.column_name),
                column.data_type.to_uppercase()
            );
            if column.is_nullable == "NO" {
                definition.push_str(" NOT NULL");
            }
            if let Some(default) = column
                .column_default
                .as_deref()
                .filter(|d| !d.starts_with("nextval("))
            {
                definition.push_str(" DEFAULT ");
                definition.push_str(default);
            }
            definition
        })
        .collect();

    format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_ident(table),
        definitions.join(",\n")
    )
}

/// One `INSERT` for a row read back as JSON, in column order
pub fn render_insert(table: &str, columns: &[&str], row: &Value) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let values: Vec<String> = columns
        .iter()
        .map(|c| sql_literal(row.get(*c).unwrap_or(&Value::Null)))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_ident(table),
        names.join(", "),
        values.join(", ")
    )
}

/// SQL literal for a JSON value; strings get single quotes doubled
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        Value::Array(_) | Value::Object(_) => quote_literal(&value.to_string()),
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
