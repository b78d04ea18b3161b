//! Predicate to SQL translation.
//!
//! Every comparison value is bound as a positional parameter. A clause on a
//! column the table does not have renders as `0`, so it matches nothing
//! instead of failing the statement.

use crate::schema::{has_column, table};
use cadence_core::{Collection, Field, FieldValue, Operator, Predicate};
use rusqlite::types::Value;

/// A `WHERE` body with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlFilter {
    pub(crate) clause: String,
    pub(crate) params: Vec<Value>,
}

/// Render `predicate` for `collection`. An empty predicate matches every row.
pub(crate) fn where_clause(collection: Collection, predicate: &Predicate) -> SqlFilter {
    let mut parts = Vec::with_capacity(predicate.clauses().len());
    let mut params = Vec::new();

    for clause in predicate.clauses() {
        if !has_column(collection, clause.field) {
            parts.push("0".to_owned());
            continue;
        }
        let column = clause.field.column();
        let comparison = match clause.operator {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::NonEmpty => {
                parts.push(format!("({column} IS NOT NULL AND {column} != '')"));
                continue;
            }
        };
        match &clause.value {
            Some(value) => {
                params.push(to_sql(value));
                parts.push(format!("{column} {comparison} ?{}", params.len()));
            }
            None => parts.push("0".to_owned()),
        }
    }

    let clause = if parts.is_empty() {
        "1".to_owned()
    } else {
        parts.join(" AND ")
    };
    SqlFilter { clause, params }
}

/// `SELECT` of the name column of `collection`, optionally ordered.
///
/// Text columns use SQLite's default `BINARY` collation, so ordering is by
/// byte value: upper case before lower case.
pub(crate) fn select_names(
    collection: Collection,
    predicate: &Predicate,
    order_by: Option<Field>,
) -> (String, Vec<Value>) {
    let filter = where_clause(collection, predicate);
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {}",
        collection.name_field().column(),
        table(collection),
        filter.clause
    );
    if let Some(field) = order_by.filter(|field| has_column(collection, *field)) {
        sql.push_str(" ORDER BY ");
        sql.push_str(field.column());
    }
    (sql, filter.params)
}

/// `DELETE` of every row of `collection` matching `predicate`.
pub(crate) fn delete_matching(
    collection: Collection,
    predicate: &Predicate,
) -> (String, Vec<Value>) {
    let filter = where_clause(collection, predicate);
    (
        format!("DELETE FROM {} WHERE {}", table(collection), filter.clause),
        filter.params,
    )
}

fn to_sql(value: &FieldValue) -> Value {
    match value {
        FieldValue::Int(number) => Value::Integer(*number),
        FieldValue::Text(text) => Value::Text(text.clone()),
    }
}
