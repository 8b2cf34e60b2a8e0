use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing or invalid user identity")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient stock for {product_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        available: i32,
        requested: i32,
    },

    #[error("{0}")]
    ReservationConflict(String),

    #[error("Cannot move order from '{current}' to '{requested}'")]
    InvalidStateTransition { current: String, requested: String },

    #[error("Payment signature verification failed")]
    SignatureMismatch,

    #[error("{0}")]
    DuplicatePayment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code sent as `reason`.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::ReservationConflict(_) => "RESERVATION_CONFLICT",
            AppError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            AppError::SignatureMismatch => "SIGNATURE_MISMATCH",
            AppError::DuplicatePayment(_) => "DUPLICATE_PAYMENT",
            AppError::Internal(_) => "PERSISTENCE_ERROR",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            },
            e @ DomainError::ReservationConflict(_) => AppError::ReservationConflict(e.to_string()),
            DomainError::InvalidStateTransition { current, requested } => {
                AppError::InvalidStateTransition { current, requested }
            }
            DomainError::SignatureMismatch => AppError::SignatureMismatch,
            e @ DomainError::DuplicatePayment(_) => AppError::DuplicatePayment(e.to_string()),
            DomainError::Persistence(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "reason": self.reason(),
            "message": self.to_string(),
        });
        match self {
            AppError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => {
                body["productId"] = json!(product_id);
                body["available"] = json!(available);
                body["requested"] = json!(requested);
            }
            AppError::InvalidStateTransition { current, .. } => {
                body["currentState"] = json!(current);
            }
            AppError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                body["message"] = json!("Internal server error");
            }
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
