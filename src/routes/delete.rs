use crate::driver::Driver;
use crate::error::ApiError;
use crate::model::{Action, Model};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::routes::{ModelRoute, Route};
use crate::serializer::Payload;
use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;

pub struct DeleteModelRoute<M: Model> {
    route: ModelRoute<M>,
}

impl<M: Model> DeleteModelRoute<M> {
    pub fn new(request: ApiRequest, driver: Arc<dyn Driver>) -> Self {
        DeleteModelRoute {
            route: ModelRoute::new(request, driver),
        }
    }

    pub fn route(&self) -> &ModelRoute<M> {
        &self.route
    }

    pub fn route_mut(&mut self) -> &mut ModelRoute<M> {
        &mut self.route
    }

    /// Deletes the model; on success the response is 204 with no body.
    pub async fn build_response(&mut self) -> Result<(), ApiError> {
        self.route.authorize(Action::Delete)?;
        self.route.resolve_model().await?;

        let mut errors = std::mem::take(self.route.errors_mut());
        if let Some(model) = self.route.model() {
            model.before_delete(&mut errors);
        }
        let id = self.route.current_id().ok_or_else(|| self.route.not_found_error())?;
        let deleted = if errors.is_empty() {
            self.route
                .driver()
                .delete_model(&M::meta(), &id, &mut errors)
                .await
        } else {
            Ok(false)
        };
        *self.route.errors_mut() = errors;

        if deleted? {
            tracing::info!(model = M::NAME, id = %id, "deleted");
            self.route.response_mut().set_status(StatusCode::NO_CONTENT);
            return Ok(());
        }
        Err(self.route.write_failed(Action::Delete))
    }
}

#[async_trait]
impl<M: Model> Route for DeleteModelRoute<M> {
    fn parse_request(&mut self) -> Result<(), ApiError> {
        self.route.parse_model_id();
        Ok(())
    }

    async fn respond(&mut self) -> Result<Payload, ApiError> {
        self.build_response().await?;
        Ok(Payload::Empty)
    }

    fn response_mut(&mut self) -> &mut ApiResponse {
        self.route.response_mut()
    }

    fn into_response(self) -> ApiResponse {
        self.route.into_response()
    }
}
