//! Application error taxonomy and its HTTP mapping

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::entities::checks::CONSTRAINT_VIOLATION_PREFIX;
use crate::services::chain_gateway::ChainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    StoreConstraintViolation(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("Database error")]
    Store(DbErr),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::Chain(chain) => match chain {
                ChainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ChainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ChainError::CallError(_) => StatusCode::BAD_GATEWAY,
                ChainError::InsufficientBalance(_) | ChainError::InsufficientPayment(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ChainError::ListingInactive(_) => StatusCode::CONFLICT,
                ChainError::NotListingOwner(_) => StatusCode::FORBIDDEN,
            },
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let DbErr::Custom(message) = &err {
            if let Some(reason) = message.strip_prefix(CONSTRAINT_VIOLATION_PREFIX) {
                return AppError::StoreConstraintViolation(reason.to_string());
            }
        }

        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::StoreConstraintViolation(format!("Duplicate value: {}", detail))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                AppError::StoreConstraintViolation(format!("Unknown reference: {}", detail))
            }
            _ => AppError::Store(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let details = match &self {
            AppError::Validation(details) => details.clone(),
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            details,
            debug: None,
        };
        let verbose = VerboseError(ErrorResponse {
            debug: Some(format!("{:?}", self)),
            ..body.clone()
        });

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(verbose);
        response
    }
}

/// Error body including the `debug` rendering, carried on the response
/// until `expose_error_debug` publishes or drops it.
#[derive(Debug, Clone)]
pub struct VerboseError(pub ErrorResponse);

/// Response mapper installed by the router: swaps in the `debug` body when
/// `verbose` is set, otherwise only strips the extension.
pub async fn expose_error_debug(State(verbose): State<bool>, mut response: Response) -> Response {
    let Some(VerboseError(body)) = response.extensions_mut().remove::<VerboseError>() else {
        return response;
    };
    if !verbose {
        return response;
    }
    (response.status(), Json(body)).into_response()
}
