use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, status::Custom};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised by a [`DataStore`](crate::store::DataStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflicting row: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() || db.is_foreign_key_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Store(StoreError::NotFound(_)) => Status::NotFound,
            ApiError::Store(StoreError::Conflict(_)) => Status::Conflict,
            ApiError::Store(_) => Status::InternalServerError,
        }
    }

    /// Message safe to show to the caller. Backend failures are not echoed.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Store(StoreError::NotFound(_)) => self.to_string(),
            // Constraint text names tables and columns.
            ApiError::Store(StoreError::Conflict(_)) => {
                "the request conflicts with existing data".to_string()
            }
            ApiError::Store(_) => "the request could not be completed, please retry".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Json<Self> {
        Json(ErrorBody { error: error.into() })
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            tracing::error!(method = %request.method(), uri = %request.uri(), error = %self, "request failed");
        } else if let ApiError::Store(StoreError::Conflict(detail)) = &self {
            tracing::warn!(method = %request.method(), uri = %request.uri(), %detail, "storage constraint rejected write");
        } else {
            tracing::debug!(method = %request.method(), uri = %request.uri(), %status, error = %self, "request rejected");
        }
        Custom(status, ErrorBody::new(self.public_message())).respond_to(request)
    }
}
