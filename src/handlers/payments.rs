use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;

use super::dto::{ApiResponse, PaymentVerifiedResponse, VerifyPaymentRequest};

/// POST /cart/verifypayment
///
/// Checks the gateway's HMAC signature. On a match the payment is COMPLETED,
/// the order moves to PROCESSING and the caller's cart is emptied. A gateway
/// payment id settles at most one order.
#[utoipa::path(
    post,
    path = "/cart/verifypayment",
    request_body = VerifyPaymentRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated caller")),
    responses(
        (status = 200, description = "Payment verified", body = ApiResponse<PaymentVerifiedResponse>),
        (status = 400, description = "Signature mismatch, payment already used or order not payable"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    service: web::Data<OrderService>,
    user: AuthenticatedUser,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let (order_id, confirmation) = body.into_inner().into_parts();

    let order = web::block(move || service.verify_payment(order_id, user.0, confirmation))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Payment verified successfully",
        PaymentVerifiedResponse {
            order_id: order.id,
            payment_id: order.transaction_id.unwrap_or_default(),
        },
    )))
}
