//! PostgreSQL driver: parameterized SQL over a `sqlx` pool. Identifiers come from
//! `ModelMeta` only; values are always bound.

use crate::driver::{Driver, ModelMeta, Query, Record, SortDirection};
use crate::error::DriverError;
use crate::model::ValidationErrors;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

#[derive(Clone, Debug)]
pub struct PgDriver {
    pool: PgPool,
    schema: String,
}

impl PgDriver {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgDriver {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, model: &ModelMeta, q: &QueryBuf) -> Result<Vec<Record>, DriverError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| row_to_record(model, r)).collect())
    }

    async fn fetch_optional(&self, model: &ModelMeta, q: &QueryBuf) -> Result<Option<Record>, DriverError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await;
        Ok(row?.map(|r| row_to_record(model, &r)))
    }

    /// Runs a write; constraint violations become validation errors instead of driver errors.
    async fn write(
        &self,
        model: &ModelMeta,
        q: &QueryBuf,
        errors: &mut ValidationErrors,
    ) -> Result<Option<Record>, DriverError> {
        match self.fetch_optional(model, q).await {
            Err(DriverError::Db(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                errors.add(format!("{} already exists", model.name));
                Ok(None)
            }
            Err(DriverError::Db(sqlx::Error::Database(db))) if db.is_foreign_key_violation() => {
                errors.add(format!("{} is still referenced or references a missing record", model.name));
                Ok(None)
            }
            Err(DriverError::Db(sqlx::Error::Database(db))) if db.is_check_violation() => {
                errors.add(db.message().to_string());
                Ok(None)
            }
            other => other,
        }
    }
}

#[async_trait]
impl Driver for PgDriver {
    async fn query_models(&self, model: &ModelMeta, query: &Query) -> Result<Vec<Record>, DriverError> {
        self.fetch_all(model, &select(model, &self.schema, query)).await
    }

    async fn count_models(&self, model: &ModelMeta, query: &Query) -> Result<u64, DriverError> {
        use sqlx::Row;
        let q = count(model, &self.schema, query);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn create_model(
        &self,
        model: &ModelMeta,
        values: &Record,
        errors: &mut ValidationErrors,
    ) -> Result<Option<Value>, DriverError> {
        let row = self.write(model, &insert(model, &self.schema, values), errors).await?;
        let id = row.and_then(|mut r| r.remove(model.id_field));
        if let Some(id) = &id {
            tracing::info!(table = model.table, id = %id, "created");
        }
        Ok(id)
    }

    async fn update_model(
        &self,
        model: &ModelMeta,
        id: &Value,
        changes: &Record,
        errors: &mut ValidationErrors,
    ) -> Result<bool, DriverError> {
        let row = self.write(model, &update(model, &self.schema, id, changes), errors).await?;
        Ok(row.is_some())
    }

    async fn delete_model(
        &self,
        model: &ModelMeta,
        id: &Value,
        errors: &mut ValidationErrors,
    ) -> Result<bool, DriverError> {
        let row = self.write(model, &delete(model, &self.schema, id), errors).await?;
        Ok(row.is_some())
    }
}

#[derive(Debug, Default)]
struct QueryBuf {
    sql: String,
    params: Vec<Value>,
}

impl QueryBuf {
    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Numeric and schema-qualified enum columns come back as text so every row decodes.
fn reads_as_text(pg_type: &str) -> bool {
    pg_type == "numeric" || pg_type.starts_with("numeric(") || pg_type.contains('.')
}

fn column_list(model: &ModelMeta) -> String {
    model
        .properties
        .iter()
        .map(|p| match model.column_type(p) {
            Some(t) if reads_as_text(t) => format!("{}::text AS {}", quoted(p), quoted(p)),
            _ => quoted(p),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$n`, cast to the property's declared column type when there is one.
fn placeholder(model: &ModelMeta, property: &str, n: usize) -> String {
    match model.column_type(property) {
        Some(t) => format!("${}::{}", n, t),
        None => format!("${}", n),
    }
}

/// WHERE clause over filters; only declared properties, compared as text.
fn where_clause(model: &ModelMeta, filters: &[(String, Value)], q: &mut QueryBuf) -> String {
    let parts: Vec<String> = filters
        .iter()
        .filter(|(col, _)| model.properties.contains(&col.as_str()))
        .map(|(col, val)| {
            let text = super::scalar_text(val).map(Value::String).unwrap_or(Value::Null);
            let n = q.push_param(text);
            format!("{}::text = ${}::text", quoted(col), n)
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn select(model: &ModelMeta, schema: &str, query: &Query) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_clause(model, &query.filters, &mut q);
    let order: Vec<String> = query
        .sort
        .iter()
        .filter(|s| model.properties.contains(&s.field.as_str()))
        .map(|s| {
            let dir = match s.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {}", quoted(&s.field), dir)
        })
        .collect();
    let order_sql = if order.is_empty() {
        format!(" ORDER BY {}", quoted(model.id_field))
    } else {
        format!(" ORDER BY {}", order.join(", "))
    };
    let limit_sql = query.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_sql = if query.offset > 0 {
        format!(" OFFSET {}", query.offset)
    } else {
        String::new()
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        column_list(model),
        qualified_table(schema, model.table),
        where_sql,
        order_sql,
        limit_sql,
        offset_sql
    );
    q
}

fn count(model: &ModelMeta, schema: &str, query: &Query) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_clause(model, &query.filters, &mut q);
    q.sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        qualified_table(schema, model.table),
        where_sql
    );
    q
}

/// INSERT of the provided properties; a null or absent id is left to the column default.
fn insert(model: &ModelMeta, schema: &str, values: &Record) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for prop in model.properties {
        let Some(val) = values.get(*prop) else { continue };
        if *prop == model.id_field && val.is_null() {
            continue;
        }
        let n = q.push_param(val.clone());
        cols.push(quoted(prop));
        placeholders.push(placeholder(model, prop, n));
    }
    let table = qualified_table(schema, model.table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, column_list(model))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            column_list(model)
        )
    };
    q
}

/// UPDATE by id: SET only declared, non-id properties present in `changes`.
fn update(model: &ModelMeta, schema: &str, id: &Value, changes: &Record) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = qualified_table(schema, model.table);
    let mut sets = Vec::new();
    for (k, v) in changes {
        if k == model.id_field || !model.properties.contains(&k.as_str()) {
            continue;
        }
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(k), placeholder(model, k, n)));
    }
    let id_param = q.push_param(id.clone());
    let id_ph = placeholder(model, model.id_field, id_param);
    q.sql = if sets.is_empty() {
        format!(
            "SELECT {} FROM {} WHERE {} = {}",
            column_list(model),
            table,
            quoted(model.id_field),
            id_ph
        )
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
            table,
            sets.join(", "),
            quoted(model.id_field),
            id_ph,
            column_list(model)
        )
    };
    q
}

fn delete(model: &ModelMeta, schema: &str, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::default();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, model.table),
        quoted(model.id_field),
        placeholder(model, model.id_field, n),
        quoted(model.id_field)
    );
    q
}

fn bind_all<'q>(mut query: PgQuery<'q>, params: &[Value]) -> PgQuery<'q> {
    for p in params {
        query = bind_value(query, p);
    }
    query
}

/// Bind with the value's JSON type. Strings always bind as text; columns of another
/// type get there through the placeholder cast.
fn bind_value<'q>(query: PgQuery<'q>, v: &Value) -> PgQuery<'q> {
    match v {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(v.clone()),
    }
}

fn row_to_record(model: &ModelMeta, row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        let value = match (cell_to_value(row, name), model.column_type(name)) {
            (Value::String(s), Some(t)) if t.starts_with("numeric") => numeric_value(s),
            (value, _) => value,
        };
        map.insert(name.to_string(), value);
    }
    map
}

/// NUMERIC text as a JSON number when it fits one, otherwise kept as text.
fn numeric_value(text: String) -> Value {
    match text.parse::<serde_json::Number>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(text),
    }
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::{Row, ValueRef};
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    let present = row.try_get_raw(name).map(|raw| !raw.is_null()).unwrap_or(false);
    if present {
        tracing::warn!(column = name, "undecodable column; declare its type in COLUMN_TYPES");
    }
    Value::Null
}
