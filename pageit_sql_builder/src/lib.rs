#![forbid(unsafe_code)]
#![allow(unexpected_cfgs)]
//! SQL text builders driven by `#[derive(Entity)]` metadata and the query
//! types from `pageit_core`.
//!
//! Statements use `?` placeholders (SQLite / libSQL). Builders return the SQL
//! together with the parameters in placeholder order. Column names are taken
//! verbatim; callers validate them against the entity first
//! (`pageit_core::ensure_columns`).

use pageit_core::{Assignment, Condition, Fetchable, Insertable, Mutation, ParamValue, Predicate, Sort, Updatable};

const PH: &str = "?";

fn placeholders(n: usize) -> String {
    vec![PH; n].join(", ")
}

/// Build SELECT <cols> FROM <table> WHERE <id> = ?
pub fn select_by_id<E>(id_column: &str) -> String
where
    E: Fetchable,
{
    format!(
        "{select} WHERE {id} = {ph}",
        select = select_all::<E>(),
        id = id_column,
        ph = PH
    )
}

/// Build DELETE FROM <table> WHERE <id> = ?
pub fn delete_by_id<E>(id_column: &str) -> String
where
    E: Fetchable,
{
    format!(
        "DELETE FROM {table} WHERE {id} = {ph}",
        table = E::TABLE,
        id = id_column,
        ph = PH
    )
}

/// Build INSERT INTO <table> (<cols>) VALUES (<placeholders>)
/// With feature `libsql_returning` this appends `RETURNING <id_column>`.
pub fn insert<E>(id_column: &str) -> String
where
    E: Fetchable + Insertable,
{
    let cols = E::INSERT_COLUMNS;
    #[allow(unused_mut)]
    let mut sql = format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals})",
        table = E::TABLE,
        cols = cols.join(", "),
        vals = placeholders(cols.len())
    );

    #[cfg(feature = "libsql_returning")]
    {
        sql.push_str(" RETURNING ");
        sql.push_str(id_column);
    }
    #[cfg(not(feature = "libsql_returning"))]
    {
        let _ = id_column;
    }

    sql
}

/// Build UPDATE <table> SET <col1> = ?, ... WHERE <id> = ?
pub fn update_by_id<E>(id_column: &str) -> String
where
    E: Fetchable + Updatable,
{
    let assignments: Vec<String> = E::UPDATE_COLUMNS
        .iter()
        .map(|col| format!("{col} = {PH}"))
        .collect();
    format!(
        "UPDATE {table} SET {set_clause} WHERE {id} = {ph}",
        table = E::TABLE,
        set_clause = assignments.join(", "),
        id = id_column,
        ph = PH
    )
}

/// Build SELECT <cols> FROM <table>
pub fn select_all<E>() -> String
where
    E: Fetchable,
{
    format!(
        "SELECT {cols} FROM {table}",
        cols = E::SELECT_COLUMNS.join(", "),
        table = E::TABLE
    )
}

fn render_condition(c: &Condition, params: &mut Vec<ParamValue>) -> String {
    match c {
        Condition::Compare { column, op, value } => {
            params.push(value.clone());
            format!("{} {} {}", column, op.as_sql(), PH)
        }
        // `IN ()` is a syntax error in SQLite; an empty list matches nothing.
        Condition::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
        Condition::In { column, values } => {
            params.extend(values.iter().cloned());
            format!("{} IN ({})", column, placeholders(values.len()))
        }
        Condition::IsNull { column } => format!("{} IS NULL", column),
        Condition::IsNotNull { column } => format!("{} IS NOT NULL", column),
    }
}

/// Render a predicate as `WHERE a = ? AND b > ?`, or an empty string for the
/// empty predicate. Returns the params in placeholder order.
pub fn build_where(predicate: &Predicate) -> (String, Vec<ParamValue>) {
    if predicate.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut params = Vec::with_capacity(predicate.conditions().len());
    let clauses: Vec<String> = predicate
        .conditions()
        .iter()
        .map(|c| render_condition(c, &mut params))
        .collect();
    (format!("WHERE {}", clauses.join(" AND ")), params)
}

/// Render `ORDER BY <col> ASC|DESC`. The id column is appended as a tie-breaker
/// so equal sort keys page deterministically.
pub fn order_by(sort: Option<&Sort>, id_column: &str) -> String {
    match sort {
        Some(s) if s.column() == id_column => {
            format!("ORDER BY {} {}", s.column(), s.direction().as_sql())
        }
        Some(s) => format!(
            "ORDER BY {} {}, {} ASC",
            s.column(),
            s.direction().as_sql(),
            id_column
        ),
        None => format!("ORDER BY {} ASC", id_column),
    }
}

/// Build SELECT ... [WHERE ...] ORDER BY ...
pub fn select_where<E>(
    predicate: &Predicate,
    sort: Option<&Sort>,
    id_column: &str,
) -> (String, Vec<ParamValue>)
where
    E: Fetchable,
{
    let (where_sql, params) = build_where(predicate);
    let mut sql = select_all::<E>();
    if !where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&where_sql);
    }
    sql.push(' ');
    sql.push_str(&order_by(sort, id_column));
    (sql, params)
}

/// Build SELECT ... [WHERE ...] ORDER BY ... LIMIT <limit> OFFSET <offset>
pub fn select_page<E>(
    predicate: &Predicate,
    sort: Option<&Sort>,
    id_column: &str,
    limit: u64,
    offset: u64,
) -> (String, Vec<ParamValue>)
where
    E: Fetchable,
{
    let (mut sql, params) = select_where::<E>(predicate, sort, id_column);
    // SQLite integers are signed 64-bit.
    let clamp = |n: u64| n.min(i64::MAX as u64);
    sql.push_str(&format!(" LIMIT {} OFFSET {}", clamp(limit), clamp(offset)));
    (sql, params)
}

/// Build SELECT COUNT(*) FROM <table> [WHERE ...]
pub fn count_where<E>(predicate: &Predicate) -> (String, Vec<ParamValue>)
where
    E: Fetchable,
{
    let (where_sql, params) = build_where(predicate);
    let mut sql = format!("SELECT COUNT(*) FROM {table}", table = E::TABLE);
    if !where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&where_sql);
    }
    (sql, params)
}

/// Build UPDATE <table> SET <assignments> [WHERE ...]. SET params precede WHERE params.
pub fn update_where<E>(predicate: &Predicate, mutation: &Mutation) -> (String, Vec<ParamValue>)
where
    E: Fetchable,
{
    let mut params = Vec::with_capacity(mutation.assignments().len());
    let sets: Vec<String> = mutation
        .assignments()
        .iter()
        .map(|a| match a {
            Assignment::Set { column, value } => {
                params.push(value.clone());
                format!("{column} = {PH}")
            }
            Assignment::Increment { column, delta } => {
                params.push(delta.clone());
                format!("{column} = {column} + {PH}")
            }
        })
        .collect();
    let (where_sql, where_params) = build_where(predicate);
    params.extend(where_params);

    let mut sql = format!(
        "UPDATE {table} SET {sets}",
        table = E::TABLE,
        sets = sets.join(", ")
    );
    if !where_sql.is_empty() {
        sql.push(' ');
        sql.push_str(&where_sql);
    }
    (sql, params)
}
