//! Model trait: the typed surface a struct implements to be served by the CRUD routes.

mod errors;
pub mod rules;

pub use errors::{ValidationError, ValidationErrors};
pub use rules::{Format, Rule};

use crate::driver::{Driver, ModelMeta, Query, Record};
use crate::error::ApiError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;

/// Action a route performs against a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    FindAll,
    Retrieve,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::FindAll,
        Action::Retrieve,
        Action::Edit,
        Action::Delete,
    ];

    pub fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::FindAll => "list",
            Action::Retrieve => "retrieve",
            Action::Edit => "update",
            Action::Delete => "delete",
        }
    }

    /// Gerund used in generic failure messages ("There was an error updating the Post.").
    pub fn gerund(self) -> &'static str {
        match self {
            Action::Create => "creating",
            Action::FindAll => "listing",
            Action::Retrieve => "retrieving",
            Action::Edit => "updating",
            Action::Delete => "deleting",
        }
    }
}

pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Type name as it appears in error messages, e.g. `LineItem`.
    const NAME: &'static str;
    const TABLE: &'static str;
    const ID_FIELD: &'static str = "id";
    /// Every property, in storage order. Filters and sorts are limited to these.
    const PROPERTIES: &'static [&'static str];
    /// Properties a request body may set on create and edit.
    const MUTABLE: &'static [&'static str];
    /// Properties left out of responses unless the request includes them explicitly.
    const HIDDEN: &'static [&'static str] = &[];
    const ACTIONS: &'static [Action] = &Action::ALL;
    /// Storage column types for properties that need a cast, e.g. `("created_at", "timestamptz")`.
    const COLUMN_TYPES: &'static [(&'static str, &'static str)] = &[];

    fn rules() -> Vec<(&'static str, Rule)> {
        Vec::new()
    }

    fn validate(&self, _errors: &mut ValidationErrors) {}

    /// Runs before the driver delete; any error recorded here cancels it.
    fn before_delete(&self, _errors: &mut ValidationErrors) {}

    fn human_name() -> String {
        humanize(Self::NAME)
    }

    /// Path segment to id value. Integers stay numeric, anything else is a string key.
    fn parse_id(raw: &str) -> Value {
        raw.parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string()))
    }

    fn meta() -> ModelMeta {
        ModelMeta {
            name: Self::NAME,
            table: Self::TABLE,
            id_field: Self::ID_FIELD,
            properties: Self::PROPERTIES,
            column_types: Self::COLUMN_TYPES,
        }
    }
}

/// Render a model into the record shape drivers store.
pub fn to_record<M: Model>(model: &M) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(model)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "{} did not serialize to an object: {}",
            M::NAME,
            other
        ))),
    }
}

pub fn id_of<M: Model>(model: &M) -> Option<Value> {
    to_record(model)
        .ok()
        .and_then(|mut record| record.remove(M::ID_FIELD))
        .filter(|v| !v.is_null())
}

/// Runs declared rules, then the model's own `validate` hook.
pub fn validate<M: Model>(model: &M, errors: &mut ValidationErrors) -> Result<(), ApiError> {
    let rules = M::rules();
    if !rules.is_empty() {
        let record = to_record(model).map_err(|e| ApiError::invalid_request(e.to_string()))?;
        rules::check(&record, &rules, errors);
    }
    model.validate(errors);
    Ok(())
}

pub async fn find<M: Model>(driver: &dyn Driver, id: &Value) -> Result<Option<M>, ApiError> {
    let meta = M::meta();
    let query = Query::by_id(&meta, id.clone());
    let mut records = driver.query_models(&meta, &query).await?;
    if records.is_empty() {
        return Ok(None);
    }
    let record = records.swap_remove(0);
    let model = serde_json::from_value(Value::Object(record)).map_err(crate::error::DriverError::from)?;
    Ok(Some(model))
}

/// Display form of an id in messages: strings unquoted.
pub struct DisplayId<'a>(pub &'a Value);

impl fmt::Display for DisplayId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// "LineItem" -> "Line Item".
pub fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c == '_' {
            out.push(' ');
            prev = Some(' ');
            continue;
        }
        if c.is_uppercase() && prev.map(|p| p.is_lowercase() || p.is_ascii_digit()).unwrap_or(false) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
