// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every variant maps to a stable machine-readable code. Backend faults are
//! translated into the failing operation's code at the repository boundary
//! (see [`AppError::during`]); business-rule rejections pass through as-is.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Slot already booked: {0}")]
    SlotAlreadyBooked(String),

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Failed to fetch: {0}")]
    Fetch(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Failed to add: {0}")]
    Add(String),

    #[error("Failed to update: {0}")]
    Update(String),

    #[error("Failed to delete: {0}")]
    Delete(String),

    #[error("Failed to create: {0}")]
    Create(String),

    #[error("Failed to cancel: {0}")]
    Cancel(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthRequired => "AUTH_REQUIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidStatus(_) => "INVALID_STATUS",
            AppError::SlotAlreadyBooked(_) => "SLOT_ALREADY_BOOKED",
            AppError::InvalidSlot(_) => "INVALID_SLOT",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Fetch(_) => "FETCH_ERROR",
            AppError::Search(_) => "SEARCH_ERROR",
            AppError::Add(_) => "ADD_ERROR",
            AppError::Update(_) => "UPDATE_ERROR",
            AppError::Delete(_) => "DELETE_ERROR",
            AppError::Create(_) => "CREATE_ERROR",
            AppError::Cancel(_) => "CANCEL_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for transport/backend faults, as opposed to rule or precondition
    /// rejections.
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_)
        )
    }

    /// Re-tag a backend fault as a failure of the given operation.
    ///
    /// ```ignore
    /// store.bookings_on(date).await.map_err(|e| e.during(AppError::Fetch))?;
    /// ```
    pub fn during(self, operation: fn(String) -> AppError) -> AppError {
        if self.is_backend_fault() {
            operation(self.to_string())
        } else {
            self
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::AuthRequired | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStatus(_) | AppError::SlotAlreadyBooked(_) => StatusCode::CONFLICT,
            AppError::InvalidSlot(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::AuthRequired | AppError::InvalidToken => None,
            AppError::PermissionDenied(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidStatus(msg)
            | AppError::SlotAlreadyBooked(msg)
            | AppError::InvalidSlot(msg)
            | AppError::BadRequest(msg) => Some(msg.clone()),
            other => {
                tracing::error!(code = other.code(), error = %other, "Request failed");
                None
            }
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
