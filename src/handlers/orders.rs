use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::application::order_service::{OrderService, PlaceOrder};
use crate::auth::AuthenticatedUser;
use crate::errors::AppError;

use super::dto::{
    order_list, ApiResponse, CancelledOrderResponse, CreateOrderRequest, OrderResponse,
    UserOrdersQuery,
};

/// POST /orders
///
/// Reserves stock for every line, prices the order from the catalog and
/// persists it as PENDING/PENDING. Nothing is left reserved on failure.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated caller")),
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Validation, duplicate or insufficient stock"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<OrderService>,
    user: AuthenticatedUser,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let command: PlaceOrder = body.into_inner().into();

    let placed = web::block(move || service.place_order(user.0, command))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ApiResponse::ok(
        "Order created successfully",
        OrderResponse::from(placed),
    )))
}

/// GET /user/orders
#[utoipa::path(
    get,
    path = "/user/orders",
    params(
        ("X-User-Id" = Uuid, Header, description = "Authenticated caller"),
        UserOrdersQuery,
    ),
    responses(
        (status = 200, description = "Paginated orders of the caller", body = ApiResponse<Vec<OrderResponse>>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_user_orders(
    service: web::Data<OrderService>,
    user: AuthenticatedUser,
    query: web::Query<UserOrdersQuery>,
) -> Result<HttpResponse, AppError> {
    let (status, page) = query.into_inner().into_parts()?;

    let orders = web::block(move || service.list_user_orders(user.0, status, page))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let (items, pagination) = order_list(orders);
    Ok(HttpResponse::Ok()
        .json(ApiResponse::ok("Orders retrieved successfully", items).with_pagination(pagination)))
}

/// GET /user/orders/{id}
#[utoipa::path(
    get,
    path = "/user/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated caller"),
    ),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_user_order(
    service: web::Data<OrderService>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_user_order(order_id, user.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Order retrieved successfully",
        OrderResponse::from(order),
    )))
}

/// PATCH /user/orders/{id}/cancel
///
/// Only PENDING orders can be cancelled. Stock restore failures do not fail
/// the request; they are listed under `stockUpdates`.
#[utoipa::path(
    patch,
    path = "/user/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated caller"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<CancelledOrderResponse>),
        (status = 400, description = "Order is not PENDING"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    service: web::Data<OrderService>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let cancelled = web::block(move || service.cancel_order(order_id, user.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Order cancelled successfully",
        CancelledOrderResponse::from(cancelled),
    )))
}
