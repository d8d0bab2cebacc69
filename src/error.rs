//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Failure reported by a persistence driver (I/O, lock, decoding), as opposed to
/// a rejected write, which drivers report through validation errors.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("malformed record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("driver: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Client-caused failure with a specific status (400, 403, 404).
    #[error("{message}")]
    InvalidRequest {
        message: String,
        status: StatusCode,
        param: Option<String>,
    },
    /// Server-side failure without further diagnostic detail.
    #[error("{message}")]
    Api { message: String, status: StatusCode },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
            param: None,
        }
    }

    pub fn invalid_param(message: impl Into<String>, param: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
            param: Some(param.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
            status: StatusCode::NOT_FOUND,
            param: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
            status: StatusCode::FORBIDDEN,
            param: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        ApiError::Api {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { status, .. } | ApiError::Api { status, .. } => *status,
            ApiError::Driver(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            ApiError::InvalidRequest { param, .. } => param.as_deref(),
            _ => None,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest { .. } => "invalid_request",
            ApiError::Api { .. } | ApiError::Driver(_) => "api_error",
        }
    }
}

/// Client-facing text for driver failures; the detail only goes to the log.
pub const DRIVER_FAILURE_MESSAGE: &str = "There was an error processing the request.";

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Driver(e) => {
                tracing::error!(error = %e, "driver failure");
                DRIVER_FAILURE_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                param: self.param().map(str::to_string),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::invalid_request("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::api("oops").status(), StatusCode::INTERNAL_SERVER_ERROR);
        let driver = ApiError::from(DriverError::Other("lock poisoned".into()));
        assert_eq!(driver.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(driver.to_string(), "driver: lock poisoned");
    }

    #[tokio::test]
    async fn error_body_carries_code_message_and_param() -> Result<(), Box<dyn std::error::Error>> {
        let response = ApiError::invalid_param("Mass assignment of age on Person is not allowed", "age").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "Mass assignment of age on Person is not allowed");
        assert_eq!(json["error"]["param"], "age");
        Ok(())
    }

    #[tokio::test]
    async fn driver_detail_stays_out_of_the_body() -> Result<(), Box<dyn std::error::Error>> {
        let err = ApiError::from(DriverError::Other("relation \"people\" does not exist".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(body.to_vec())?;
        assert!(!text.contains("relation"));
        let json: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(json["error"]["code"], "api_error");
        assert_eq!(json["error"]["message"], DRIVER_FAILURE_MESSAGE);
        Ok(())
    }
}
