use crate::pinning::PinningError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A setting required to reach the pinning service is missing
    #[error("Missing required configuration: {setting}")]
    Configuration { setting: String },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// The route exists but does not accept this HTTP method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The pinning service rejected the request or could not be reached
    #[error("Pinning service failed to {operation}: {source}")]
    Upstream {
        operation: String,
        #[source]
        source: PinningError,
    },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    /// Wrap a pinning error raised while performing `operation`.
    ///
    /// A missing credential is surfaced as a configuration error rather than
    /// an upstream one, since no request was ever sent.
    pub fn pinning(operation: &str, source: PinningError) -> Self {
        match source {
            PinningError::NotConfigured { setting } => Error::Configuration {
                setting: setting.to_string(),
            },
            source => Error::Upstream {
                operation: operation.to_string(),
                source,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Configuration { .. } => "Server configuration error".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::MethodNotAllowed => "Method not allowed".to_string(),
            Error::Upstream { .. } | Error::Other(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Configuration { .. } => {
                tracing::error!("Configuration error: {}", self);
            }
            Error::Upstream { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::BadRequest { .. } | Error::MethodNotAllowed => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorBody { error: self.user_message() };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
