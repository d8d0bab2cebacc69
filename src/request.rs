//! Inbound request as seen by routes: path params, query params and a JSON body.

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct ApiRequest {
    path: String,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        ApiRequest {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path parameter captured by the router, e.g. `model_id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `true`, `1` and `yes` (any case) count as set.
    pub fn query_flag(&self, name: &str) -> bool {
        self.query(name)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    /// Comma-separated query list, trimmed, empties dropped.
    pub fn query_list(&self, name: &str) -> Vec<String> {
        self.query(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

#[async_trait]
impl<S> FromRequest<S> for ApiRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let params = Option::<Path<HashMap<String, String>>>::from_request_parts(&mut parts, state)
            .await
            .ok()
            .flatten()
            .map(|Path(p)| p)
            .unwrap_or_default();
        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::invalid_request(format!("Invalid query string: {}", e)))?;
        let path = parts.uri.path().to_string();

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| ApiError::invalid_request(format!("Could not read request body: {}", e)))?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::invalid_request(format!("Request body is not valid JSON: {}", e)))?;
            Some(value)
        };

        Ok(ApiRequest {
            path,
            params,
            query,
            body,
        })
    }
}
