use crate::driver::{Driver, Record};
use crate::error::ApiError;
use crate::model::{self, Action, Model};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::routes::{ModelRoute, Route};
use crate::serializer::Payload;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct EditModelRoute<M: Model> {
    route: ModelRoute<M>,
    update_parameters: Record,
}

impl<M: Model> EditModelRoute<M> {
    pub fn new(request: ApiRequest, driver: Arc<dyn Driver>) -> Self {
        EditModelRoute {
            route: ModelRoute::new(request, driver),
            update_parameters: Record::new(),
        }
    }

    pub fn route(&self) -> &ModelRoute<M> {
        &self.route
    }

    pub fn route_mut(&mut self) -> &mut ModelRoute<M> {
        &mut self.route
    }

    pub fn update_parameters(&self) -> &Record {
        &self.update_parameters
    }

    pub fn set_update_parameters(&mut self, params: Record) -> &mut Self {
        self.update_parameters = params;
        self
    }

    /// Applies the update and returns the refreshed model (the merged one if the
    /// driver no longer returns the record).
    pub async fn build_response(&mut self) -> Result<M, ApiError> {
        self.route.authorize(Action::Edit)?;
        self.route.resolve_model().await?;
        self.route.check_mass_assignment(&self.update_parameters)?;

        let current = self.route.model().ok_or_else(|| self.route.not_found_error())?;
        let mut merged = model::to_record(current).map_err(|e| ApiError::api(e.to_string()))?;
        for (k, v) in &self.update_parameters {
            merged.insert(k.clone(), v.clone());
        }
        let candidate: M = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ApiError::invalid_request(e.to_string()))?;

        let id = self.route.current_id().ok_or_else(|| self.route.not_found_error())?;
        model::validate(&candidate, self.route.errors_mut())?;
        if let Some(err) = self.route.validation_error() {
            return Err(err);
        }

        let mut errors = std::mem::take(self.route.errors_mut());
        let updated = self
            .route
            .driver()
            .update_model(&M::meta(), &id, &self.update_parameters, &mut errors)
            .await;
        *self.route.errors_mut() = errors;
        if !updated? {
            return Err(self.route.write_failed(Action::Edit));
        }
        tracing::info!(model = M::NAME, id = %id, "updated");

        let refreshed = model::find::<M>(self.route.driver(), &id).await?;
        Ok(refreshed.unwrap_or(candidate))
    }
}

#[async_trait]
impl<M: Model> Route for EditModelRoute<M> {
    fn parse_request(&mut self) -> Result<(), ApiError> {
        self.route.parse_model_id();
        self.update_parameters = self.route.parse_body()?;
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
