//! Serializer chain: turns a route's result into a response body.

mod chained;
mod json;
mod model;

pub use chained::ChainedSerializer;
pub use json::JsonSerializer;
pub use model::ModelSerializer;

use crate::driver::Record;
use crate::model::{to_record, Model};
use crate::response::ApiResponse;
use serde_json::Value;
use std::fmt;

/// Type-erased model as seen by serializers.
pub trait SerializableModel: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn hidden_properties(&self) -> &'static [&'static str];
    fn to_record(&self) -> Result<Record, serde_json::Error>;
}

impl<M: Model> SerializableModel for M {
    fn model_name(&self) -> &'static str {
        M::NAME
    }

    fn hidden_properties(&self) -> &'static [&'static str] {
        M::HIDDEN
    }

    fn to_record(&self) -> Result<Record, serde_json::Error> {
        to_record(self)
    }
}

/// What flows between serializers.
pub enum Payload {
    Empty,
    Model(Box<dyn SerializableModel>),
    Collection(Vec<Box<dyn SerializableModel>>),
    Value(Value),
}

impl Payload {
    pub fn model<M: Model>(model: M) -> Self {
        Payload::Model(Box::new(model))
    }

    pub fn collection<M: Model>(models: Vec<M>) -> Self {
        Payload::Collection(
            models
                .into_iter()
                .map(|m| Box::new(m) as Box<dyn SerializableModel>)
                .collect(),
        )
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Model(m) => write!(f, "Model({})", m.model_name()),
            Payload::Collection(c) => write!(f, "Collection(len={})", c.len()),
            Payload::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

pub trait Serializer: Send + Sync {
    /// Short identifier, e.g. `json`.
    fn name(&self) -> &'static str;

    fn serialize(&self, payload: Payload, response: &mut ApiResponse) -> Payload;
}
