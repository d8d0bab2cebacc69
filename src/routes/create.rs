use crate::driver::{Driver, Record};
use crate::error::ApiError;
use crate::model::{self, Action, Model};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::routes::{ModelRoute, Route};
use crate::serializer::Payload;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

pub struct CreateModelRoute<M: Model> {
    route: ModelRoute<M>,
    create_parameters: Record,
}

impl<M: Model> CreateModelRoute<M> {
    pub fn new(request: ApiRequest, driver: Arc<dyn Driver>) -> Self {
        CreateModelRoute {
            route: ModelRoute::new(request, driver),
            create_parameters: Record::new(),
        }
    }

    pub fn route(&self) -> &ModelRoute<M> {
        &self.route
    }

    pub fn create_parameters(&self) -> &Record {
        &self.create_parameters
    }

    pub fn set_create_parameters(&mut self, params: Record) -> &mut Self {
        self.create_parameters = params;
        self
    }

    /// Stores a new model and returns it as persisted; the response status becomes 201.
    pub async fn build_response(&mut self) -> Result<M, ApiError> {
        self.route.authorize(Action::Create)?;
        self.route.check_mass_assignment(&self.create_parameters)?;

        let candidate: M = serde_json::from_value(Value::Object(self.create_parameters.clone()))
            .map_err(|e| ApiError::invalid_request(e.to_string()))?;
        model::validate(&candidate, self.route.errors_mut())?;
        if let Some(err) = self.route.validation_error() {
            return Err(err);
        }

        let values = model::to_record(&candidate).map_err(|e| ApiError::api(e.to_string()))?;
        let mut errors = std::mem::take(self.route.errors_mut());
        let created = self
            .route
            .driver()
            .create_model(&M::meta(), &values, &mut errors)
            .await;
        *self.route.errors_mut() = errors;
        let Some(id) = created? else {
            return Err(self.route.write_failed(Action::Create));
        };
        tracing::info!(model = M::NAME, id = %id, "created");

        self.route.set_model_id(id.clone());
        self.route.response_mut().set_status(StatusCode::CREATED);
        let stored = model::find::<M>(self.route.driver(), &id).await?;
        Ok(stored.unwrap_or(candidate))
    }
}

#[async_trait]
impl<M: Model> Route for CreateModelRoute<M> {
    fn parse_request(&mut self) -> Result<(), ApiError> {
        self.create_parameters = self.route.parse_body()?;
        Ok(())
    }

    async fn respond(&mut self) -> Result<Payload, ApiError> {
        Ok(Payload::model(self.build_response().await?))
    }

    fn response_mut(&mut self) -> &mut ApiResponse {
        self.route.response_mut()
    }

    fn into_response(self) -> ApiResponse {
        self.route.into_response()
    }
}
