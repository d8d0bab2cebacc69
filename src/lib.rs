//! model-rest: generic REST CRUD routes over typed models and a pluggable persistence driver.

pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod model;
pub mod request;
pub mod response;
pub mod routes;
pub mod serializer;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::ApiConfig;
pub use controller::ModelController;
pub use driver::{Driver, MemoryDriver, ModelMeta, PgDriver, Query, Record, SortDirection, SortField};
pub use error::{ApiError, ConfigError, DriverError};
pub use model::{Action, Format, Model, Rule, ValidationError, ValidationErrors};
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use routes::{common_routes, execute, Route};
pub use serializer::{ChainedSerializer, JsonSerializer, ModelSerializer, Payload, Serializer};
pub use state::ApiState;
