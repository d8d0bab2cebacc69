//! Model routes: one per CRUD action, sharing the request lifecycle in `ModelRoute`.

mod common;
mod create;
mod delete;
mod edit;
mod find_all;
mod retrieve;

pub use common::common_routes;
pub use create::CreateModelRoute;
pub use delete::DeleteModelRoute;
pub use edit::EditModelRoute;
pub use find_all::{FindAllModelsRoute, DEFAULT_PER_PAGE, MAX_PER_PAGE, TOTAL_COUNT};
pub use retrieve::RetrieveModelRoute;

use crate::driver::{Driver, Record};
use crate::error::ApiError;
use crate::model::{self, Action, DisplayId, Model, ValidationErrors};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::serializer::{Payload, Serializer};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Route: Send {
    /// Pull identifiers and parameters out of the request.
    fn parse_request(&mut self) -> Result<(), ApiError>;

    /// Perform the action; the result is handed to the serializer chain.
    async fn respond(&mut self) -> Result<Payload, ApiError>;

    fn response_mut(&mut self) -> &mut ApiResponse;

    fn into_response(self) -> ApiResponse
    where
        Self: Sized;
}

/// Runs a route to completion: either a serialized response or an error, never both.
pub async fn execute<R: Route>(mut route: R, serializer: &dyn Serializer) -> Result<ApiResponse, ApiError> {
    route.parse_request()?;
    let payload = route.respond().await?;
    serializer.serialize(payload, route.response_mut());
    Ok(route.into_response())
}

/// Per-request state shared by every model route.
pub struct ModelRoute<M: Model> {
    request: ApiRequest,
    response: ApiResponse,
    driver: Arc<dyn Driver>,
    model_id: Option<Value>,
    model: Option<M>,
    errors: ValidationErrors,
}

impl<M: Model> ModelRoute<M> {
    pub fn new(request: ApiRequest, driver: Arc<dyn Driver>) -> Self {
        ModelRoute {
            request,
            response: ApiResponse::new(),
            driver,
            model_id: None,
            model: None,
            errors: ValidationErrors::new(),
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn response(&self) -> &ApiResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ApiResponse {
        &mut self.response
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn model_id(&self) -> Option<&Value> {
        self.model_id.as_ref()
    }

    pub fn set_model_id(&mut self, id: Value) -> &mut Self {
        self.model_id = Some(id);
        self
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, model: M) -> &mut Self {
        self.model = Some(model);
        self
    }

    pub fn take_model(&mut self) -> Option<M> {
        self.model.take()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    pub fn into_response(self) -> ApiResponse {
        self.response
    }

    /// Reads `model_id` from the path parameters.
    pub fn parse_model_id(&mut self) {
        if let Some(raw) = self.request.param("model_id") {
            self.model_id = Some(M::parse_id(raw));
        }
    }

    /// The request body as an object; absent body is an empty object.
    pub fn parse_body(&self) -> Result<Record, ApiError> {
        match self.request.body() {
            None => Ok(Record::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(ApiError::invalid_request("Request body must be a JSON object")),
        }
    }

    pub fn authorize(&self, action: Action) -> Result<(), ApiError> {
        if M::ACTIONS.contains(&action) {
            return Ok(());
        }
        Err(ApiError::forbidden(format!(
            "You do not have permission to {} {} records",
            action.verb(),
            M::human_name()
        )))
    }

    pub fn not_found_error(&self) -> ApiError {
        let id = self.model_id.clone().unwrap_or(Value::Null);
        ApiError::not_found(format!("{} was not found: {}", M::human_name(), DisplayId(&id)))
    }

    /// Uses the given model if one was set, otherwise looks it up by id.
    pub async fn resolve_model(&mut self) -> Result<(), ApiError> {
        if self.model.is_some() {
            return Ok(());
        }
        let Some(id) = self.model_id.clone() else {
            return Err(self.not_found_error());
        };
        match model::find::<M>(self.driver.as_ref(), &id).await? {
            Some(found) => {
                self.model = Some(found);
                Ok(())
            }
            None => Err(self.not_found_error()),
        }
    }

    /// Id of the resolved model, falling back to the parsed id.
    pub fn current_id(&self) -> Option<Value> {
        self.model
            .as_ref()
            .and_then(model::id_of)
            .or_else(|| self.model_id.clone())
    }

    /// Rejects any key outside the model's mutable properties.
    pub fn check_mass_assignment(&self, params: &Record) -> Result<(), ApiError> {
        match params.keys().find(|k| !M::MUTABLE.contains(&k.as_str())) {
            Some(field) => Err(ApiError::invalid_param(
                format!("Mass assignment of {} on {} is not allowed", field, M::NAME),
                field.clone(),
            )),
            None => Ok(()),
        }
    }

    /// First validation error as a 400, if there is one.
    pub fn validation_error(&self) -> Option<ApiError> {
        self.errors.first().map(|e| match &e.field {
            Some(field) => ApiError::invalid_param(e.message.clone(), field.clone()),
            None => ApiError::invalid_request(e.message.clone()),
        })
    }

    /// Error for a write the driver refused: first validation error, else a generic API error.
    pub fn write_failed(&self, action: Action) -> ApiError {
        self.validation_error().unwrap_or_else(|| {
            ApiError::api(format!(
                "There was an error {} the {}.",
                action.gerund(),
                M::human_name()
            ))
        })
    }
}
