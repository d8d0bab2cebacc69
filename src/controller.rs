//! Model controller: one axum handler per CRUD action, all sharing one serializer chain.

use crate::error::ApiError;
use crate::model::Model;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::routes::{
    execute, CreateModelRoute, DeleteModelRoute, EditModelRoute, FindAllModelsRoute,
    RetrieveModelRoute,
};
use crate::serializer::{ChainedSerializer, JsonSerializer, ModelSerializer};
use crate::state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    Router,
};
use std::marker::PhantomData;
use tower_http::limit::RequestBodyLimitLayer;

pub struct ModelController<M: Model> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelController<M> {
    /// Default chain: models to plain objects, then JSON text.
    pub fn serializer(request: &ApiRequest) -> ChainedSerializer {
        ChainedSerializer::new()
            .add(ModelSerializer::new(request))
            .add(JsonSerializer::new(request))
    }

    pub async fn create(
        State(state): State<ApiState>,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let serializer = Self::serializer(&request);
        execute(CreateModelRoute::<M>::new(request, state.driver), &serializer).await
    }

    pub async fn find_all(
        State(state): State<ApiState>,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let serializer = Self::serializer(&request);
        let route = FindAllModelsRoute::<M>::new(request, state.driver)
            .with_page_limits(state.config.per_page, state.config.max_per_page);
        execute(route, &serializer).await
    }

    pub async fn retrieve(
        State(state): State<ApiState>,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let serializer = Self::serializer(&request);
        execute(RetrieveModelRoute::<M>::new(request, state.driver), &serializer).await
    }

    pub async fn edit(
        State(state): State<ApiState>,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let serializer = Self::serializer(&request);
        execute(EditModelRoute::<M>::new(request, state.driver), &serializer).await
    }

    pub async fn delete(
        State(state): State<ApiState>,
        request: ApiRequest,
    ) -> Result<ApiResponse, ApiError> {
        let serializer = Self::serializer(&request);
        execute(DeleteModelRoute::<M>::new(request, state.driver), &serializer).await
    }

    /// Mounts the collection at `/<path>` and members at `/<path>/:model_id`.
    pub fn routes(path: &str, state: ApiState) -> Router {
        let collection = format!("/{}", path.trim_matches('/'));
        let member = format!("{}/:model_id", collection);
        let body_limit = state.config.body_limit;
        tracing::debug!(model = M::NAME, path = %collection, "mounting model routes");
        Router::new()
            .route(&collection, get(Self::find_all).post(Self::create))
            .route(
                &member,
                get(Self::retrieve)
                    .patch(Self::edit)
                    .put(Self::edit)
                    .delete(Self::delete),
            )
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(body_limit))
            .with_state(state)
    }
}
