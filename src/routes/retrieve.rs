use crate::driver::Driver;
use crate::error::ApiError;
use crate::model::{Action, Model};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::routes::{ModelRoute, Route};
use crate::serializer::Payload;
use async_trait::async_trait;
use std::sync::Arc;

pub struct RetrieveModelRoute<M: Model> {
    route: ModelRoute<M>,
}

impl<M: Model> RetrieveModelRoute<M> {
    pub fn new(request: ApiRequest, driver: Arc<dyn Driver>) -> Self {
        RetrieveModelRoute {
            route: ModelRoute::new(request, driver),
        }
    }

    pub fn route(&self) -> &ModelRoute<M> {
        &self.route
    }

    pub fn route_mut(&mut self) -> &mut ModelRoute<M> {
        &mut self.route
    }

    pub async fn build_response(&mut self) -> Result<&M, ApiError> {
        self.route.authorize(Action::Retrieve)?;
        self.route.resolve_model().await?;
        self.route.model().ok_or_else(|| self.route.not_found_error())
    }
}

#[async_trait]
impl<M: Model> Route for RetrieveModelRoute<M> {
    fn parse_request(&mut self) -> Result<(), ApiError> {
        self.route.parse_model_id();
        Ok(())
    }

    async fn respond(&mut self) -> Result<Payload, ApiError> {
        self.build_response().await?;
        match self.route.take_model() {
            Some(model) => Ok(Payload::model(model)),
            None => Err(self.route.not_found_error()),
        }
    }

    fn response_mut(&mut self) -> &mut ApiResponse {
        self.route.response_mut()
    }

    fn into_response(self) -> ApiResponse {
        self.route.into_response()
    }
}
