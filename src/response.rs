//! Outbound response assembled by a route and its serializers.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(Clone, Debug)]
pub struct ApiResponse {
    status: StatusCode,
    content_type: Option<String>,
    headers: Vec<(HeaderName, String)>,
    body: Option<String>,
}

impl Default for ApiResponse {
    fn default() -> Self {
        ApiResponse {
            status: StatusCode::OK,
            content_type: None,
            headers: Vec::new(),
            body: None,
        }
    }
}

impl ApiResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn set_body(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces any earlier value for the same header.
    pub fn set_header(&mut self, name: HeaderName, value: impl Into<String>) -> &mut Self {
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value.into()));
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body.unwrap_or_default()).into_response();
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_TYPE);
        if let Some(ct) = self.content_type {
            match HeaderValue::from_str(&ct) {
                Ok(v) => {
                    headers.insert(header::CONTENT_TYPE, v);
                }
                Err(_) => tracing::warn!(content_type = %ct, "dropping invalid content type"),
            }
        }
        for (name, value) in self.headers {
            match HeaderValue::from_str(&value) {
                Ok(v) => {
                    headers.insert(name, v);
                }
                Err(_) => tracing::warn!(header = %name, "dropping invalid header value"),
            }
        }
        response
    }
}
