use itertools::Itertools;

use crate::action::{ConstraintDef, FieldDef};
use crate::error::EngineError;
use crate::ident::quote_ident;
use crate::value::SqlValue;

/// Compiled clauses for one field definition.
///
/// `column` is the column clause itself; `keys` carries the secondary index
/// and constraint clauses a `foreign_key` field implies.
#[derive(Debug)]
pub struct ColumnClauses {
    pub column: String,
    pub keys: Vec<String>,
}

/// Map a logical field type to its physical MySQL type.
pub fn physical_type(action: &'static str, field: &FieldDef) -> Result<String, EngineError> {
    match field.field_type.as_str() {
        "foreign_key" => Ok("INT".to_string()),
        "varchar" => {
            let size = field
                .size
                .ok_or_else(|| EngineError::missing_field(action, "size"))?;
            Ok(format!("VARCHAR({})", size))
        }
        other => {
            // The passthrough type lands in statement text, so it is held to
            // the same identifier rules as table and column names.
            if !crate::ident::is_valid_identifier(other) {
                return Err(EngineError::invalid_field(
                    action,
                    "type",
                    format!("`{}` is not a recognized column type", other),
                ));
            }
            Ok(other.to_uppercase())
        }
    }
}

/// Render a DEFAULT clause value. String-like values are quoted with
/// embedded quotes doubled; everything else renders as a SQL literal.
fn render_default(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}

/// Build the clauses for one field definition.
pub fn build_column_clauses(
    action: &'static str,
    table: &str,
    field: &FieldDef,
) -> Result<ColumnClauses, EngineError> {
    if field.name.is_empty() {
        return Err(EngineError::missing_field(action, "name"));
    }
    let quoted_name = quote_ident(&field.name)?;

    let mut column = format!("{} {}", quoted_name, physical_type(action, field)?);
    column.push_str(if field.nullable { " NULL" } else { " NOT NULL" });

    if let Some(default) = &field.default {
        column.push_str(" DEFAULT ");
        column.push_str(&render_default(default));
    }

    if let Some(after) = &field.after {
        column.push_str(" AFTER ");
        column.push_str(&quote_ident(after)?);
    }

    let mut keys = Vec::new();
    if field.is_foreign_key() {
        let foreign_table = field
            .foreign_table
            .as_deref()
            .ok_or_else(|| EngineError::missing_field(action, "foreign_table"))?;
        let foreign_field = field
            .foreign_field
            .as_deref()
            .ok_or_else(|| EngineError::missing_field(action, "foreign_field"))?;

        keys.push(format!(
            "KEY {} ({})",
            quote_ident(&format!("foreign_{}_{}", foreign_table, field.name))?,
            quoted_name
        ));
        keys.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&format!("fk_{}_{}", table, field.name))?,
            quoted_name,
            quote_ident(foreign_table)?,
            quote_ident(foreign_field)?,
            field.on_delete.as_sql(),
            field.on_update.as_sql(),
        ));
    }

    Ok(ColumnClauses { column, keys })
}

/// Build the KEY clause for a constraint definition.
pub fn build_key_clause(
    action: &'static str,
    table: &str,
    constraint: &ConstraintDef,
) -> Result<String, EngineError> {
    match constraint {
        ConstraintDef::Unique { columns, name } => {
            let column_list = quoted_column_list(action, columns)?;
            let name = match name {
                Some(explicit) => explicit.clone(),
                None => format!("unique_{}_{}", table, columns.iter().join("_")),
            };
            Ok(format!(
                "UNIQUE KEY {} ({})",
                quote_ident(&name)?,
                column_list
            ))
        }
        ConstraintDef::Index { columns, name } => {
            let column_list = quoted_column_list(action, columns)?;
            let name = name
                .as_deref()
                .ok_or_else(|| EngineError::missing_field(action, "name"))?;
            Ok(format!("KEY {} ({})", quote_ident(name)?, column_list))
        }
    }
}

fn quoted_column_list(action: &'static str, columns: &[String]) -> Result<String, EngineError> {
    if columns.is_empty() {
        return Err(EngineError::missing_field(action, "columns"));
    }
    Ok(columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .join(", "))
}
