//! In-process driver keeping records per table in insertion order.

use crate::driver::{scalar_text, Driver, ModelMeta, Query, Record, SortDirection};
use crate::error::DriverError;
use crate::model::{DisplayId, ValidationErrors};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug, Default)]
enum WriteMode {
    #[default]
    Accept,
    Reject { reason: Option<String> },
}

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, Vec<Record>>,
    next_id: HashMap<String, i64>,
    mode: WriteMode,
}

#[derive(Debug, Default)]
pub struct MemoryDriver {
    tables: RwLock<Tables>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records as-is, bypassing write rejection. Numeric ids advance the id sequence.
    pub fn seed(&self, table: &str, records: impl IntoIterator<Item = Record>) -> Result<(), DriverError> {
        let mut tables = self.write()?;
        for record in records {
            if let Some(n) = record.get("id").and_then(Value::as_i64) {
                let next = tables.next_id.entry(table.to_string()).or_insert(1);
                *next = (*next).max(n + 1);
            }
            tables.rows.entry(table.to_string()).or_default().push(record);
        }
        Ok(())
    }

    /// Make every subsequent write fail. With a reason, it is reported as a validation error.
    pub fn reject_writes(&self, reason: Option<&str>) -> Result<(), DriverError> {
        self.write()?.mode = WriteMode::Reject {
            reason: reason.map(str::to_string),
        };
        Ok(())
    }

    pub fn accept_writes(&self) -> Result<(), DriverError> {
        self.write()?.mode = WriteMode::Accept;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DriverError> {
        self.tables
            .read()
            .map_err(|_| DriverError::Other("memory driver lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DriverError> {
        self.tables
            .write()
            .map_err(|_| DriverError::Other("memory driver lock poisoned".into()))
    }

    fn filtered<'a>(rows: &'a [Record], query: &Query) -> Vec<&'a Record> {
        rows.iter().filter(|r| matches(r, query)).collect()
    }
}

/// Returns false (and records the reason) when writes are being rejected.
fn admit(mode: &WriteMode, errors: &mut ValidationErrors) -> bool {
    match mode {
        WriteMode::Accept => true,
        WriteMode::Reject { reason } => {
            if let Some(reason) = reason {
                errors.add(reason.clone());
            }
            false
        }
    }
}

fn matches(record: &Record, query: &Query) -> bool {
    query.filters.iter().all(|(field, expected)| {
        let actual = record.get(field).unwrap_or(&Value::Null);
        match (scalar_text(actual), scalar_text(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => actual == expected,
        }
    })
}

fn same_id(record: &Record, id_field: &str, id: &Value) -> bool {
    record
        .get(id_field)
        .and_then(scalar_text)
        .zip(scalar_text(id))
        .map(|(a, b)| a == b)
        .unwrap_or(false)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn query_models(&self, model: &ModelMeta, query: &Query) -> Result<Vec<Record>, DriverError> {
        let tables = self.read()?;
        let rows = tables.rows.get(model.table).map(Vec::as_slice).unwrap_or(&[]);
        let mut found = Self::filtered(rows, query);
        if !query.sort.is_empty() {
            found.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|s| {
                        let ord = compare_values(
                            a.get(&s.field).unwrap_or(&Value::Null),
                            b.get(&s.field).unwrap_or(&Value::Null),
                        );
                        match s.direction {
                            SortDirection::Asc => ord,
                            SortDirection::Desc => ord.reverse(),
                        }
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        tracing::debug!(table = model.table, filters = ?query.filters, "memory query");
        Ok(found
            .into_iter()
            .skip(query.offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_models(&self, model: &ModelMeta, query: &Query) -> Result<u64, DriverError> {
        let tables = self.read()?;
        let rows = tables.rows.get(model.table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Self::filtered(rows, query).len() as u64)
    }

    async fn create_model(
        &self,
        model: &ModelMeta,
        values: &Record,
        errors: &mut ValidationErrors,
    ) -> Result<Option<Value>, DriverError> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        if !admit(&tables.mode, errors) {
            return Ok(None);
        }
        let mut record = values.clone();
        let id = match record.get(model.id_field).filter(|v| !v.is_null()) {
            Some(id) => id.clone(),
            None => {
                let next = tables.next_id.entry(model.table.to_string()).or_insert(1);
                let id = Value::Number((*next).into());
                *next += 1;
                id
            }
        };
        let rows = tables.rows.entry(model.table.to_string()).or_default();
        if rows.iter().any(|r| same_id(r, model.id_field, &id)) {
            errors.add_for(
                model.id_field,
                format!("{} {} already exists", model.name, DisplayId(&id)),
            );
            return Ok(None);
        }
        record.insert(model.id_field.to_string(), id.clone());
        rows.push(record);
        Ok(Some(id))
    }

    async fn update_model(
        &self,
        model: &ModelMeta,
        id: &Value,
        changes: &Record,
        errors: &mut ValidationErrors,
    ) -> Result<bool, DriverError> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        if !admit(&tables.mode, errors) {
            return Ok(false);
        }
        let Some(record) = tables
            .rows
            .get_mut(model.table)
            .and_then(|rows| rows.iter_mut().find(|r| same_id(r, model.id_field, id)))
        else {
            return Ok(false);
        };
        for (k, v) in changes {
            if k != model.id_field {
                record.insert(k.clone(), v.clone());
            }
        }
        Ok(true)
    }

    async fn delete_model(
        &self,
        model: &ModelMeta,
        id: &Value,
        errors: &mut ValidationErrors,
    ) -> Result<bool, DriverError> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        if !admit(&tables.mode, errors) {
            return Ok(false);
        }
        let Some(rows) = tables.rows.get_mut(model.table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !same_id(r, model.id_field, id));
        Ok(rows.len() < before)
    }
}
