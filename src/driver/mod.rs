//! Persistence driver seam. Routes only ever talk to models through a `Driver`.

mod memory;
mod postgres;

pub use memory::MemoryDriver;
pub use postgres::PgDriver;

use crate::error::DriverError;
use crate::model::ValidationErrors;
use async_trait::async_trait;
use serde_json::Value;

/// One stored model, keyed by property name.
pub type Record = serde_json::Map<String, Value>;

/// Static description of a model handed to drivers.
#[derive(Clone, Copy, Debug)]
pub struct ModelMeta {
    pub name: &'static str,
    pub table: &'static str,
    pub id_field: &'static str,
    pub properties: &'static [&'static str],
    /// Postgres type per property where the driver must cast (`timestamptz`, `numeric`,
    /// `uuid`, `app.status`). Properties not listed bind and decode by value.
    pub column_types: &'static [(&'static str, &'static str)],
}

impl ModelMeta {
    pub fn column_type(&self, property: &str) -> Option<&'static str> {
        self.column_types
            .iter()
            .find(|(name, _)| *name == property)
            .map(|(_, ty)| *ty)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

/// Exact-match filters, ordering and window. Filter values compare by their text form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub sort: Vec<SortField>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Query {
    pub fn by_id(meta: &ModelMeta, id: Value) -> Self {
        Query {
            filters: vec![(meta.id_field.to_string(), id)],
            sort: Vec::new(),
            limit: Some(1),
            offset: 0,
        }
    }
}

/// Text form used for filter comparison; `None` for arrays and objects.
pub(crate) fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[async_trait]
pub trait Driver: Send + Sync {
    async fn query_models(&self, model: &ModelMeta, query: &Query) -> Result<Vec<Record>, DriverError>;

    /// Number of records matching the query's filters (sort and window ignored).
    async fn count_models(&self, model: &ModelMeta, query: &Query) -> Result<u64, DriverError>;

    /// Stores a new record and returns its id, or `None` when the write was rejected
    /// (reasons, if any, are pushed onto `errors`).
    async fn create_model(
        &self,
        model: &ModelMeta,
        values: &Record,
        errors: &mut ValidationErrors,
    ) -> Result<Option<Value>, DriverError>;

    async fn update_model(
        &self,
        model: &ModelMeta,
        id: &Value,
        changes: &Record,
        errors: &mut ValidationErrors,
    ) -> Result<bool, DriverError>;

    async fn delete_model(
        &self,
        model: &ModelMeta,
        id: &Value,
        errors: &mut ValidationErrors,
    ) -> Result<bool, DriverError>;
}
