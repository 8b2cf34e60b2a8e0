use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Insufficient stock for {product_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        available: i32,
        requested: i32,
    },
    #[error("Failed to reserve stock for product: {0}")]
    ReservationConflict(String),
    #[error("Cannot move order from '{current}' to '{requested}'")]
    InvalidStateTransition { current: String, requested: String },
    #[error("Payment signature verification failed")]
    SignatureMismatch,
    #[error("Payment {0} has already been applied to another order")]
    DuplicatePayment(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn order_not_found() -> Self {
        DomainError::NotFound("Order not found".to_string())
    }
}
