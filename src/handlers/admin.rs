use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::application::order_service::{OrderService, StatusUpdate};
use crate::auth::AuthenticatedUser;
use crate::domain::query::{DateWindow, OrderFilter, Page};
use crate::errors::AppError;

use super::dto::{
    order_list, parse_date, AdminOrdersQuery, ApiResponse, DateBound, OrderResponse,
    RevenueStatistics, StatisticsQuery, StatisticsResponse, StatusUpdatedResponse,
    UpdateStatusRequest,
};

/// GET /admin/orders
///
/// Paginated listing across all users. `statistics` sums revenue and
/// discount over the COMPLETED orders matching the same filters.
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(
        ("X-User-Id" = Uuid, Header, description = "Authenticated admin"),
        AdminOrdersQuery,
    ),
    responses(
        (status = 200, description = "Paginated orders with revenue statistics", body = ApiResponse<Vec<OrderResponse>>),
        (status = 400, description = "Invalid filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    service: web::Data<OrderService>,
    _admin: AuthenticatedUser,
    query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = OrderFilter {
        user_id: query.user_id,
        delivery_status: query.delivery_status()?,
        payment_status: query.payment_status()?,
        created_from: parse_date(query.start_date.as_deref(), DateBound::Start)?,
        created_to: parse_date(query.end_date.as_deref(), DateBound::End)?,
    };
    let page = Page::new(query.page, query.limit);

    let result = web::block(move || service.list_orders(filter, page))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let (items, pagination) = order_list(result.orders);
    Ok(HttpResponse::Ok().json(
        ApiResponse::ok("Orders retrieved successfully", items)
            .with_statistics(RevenueStatistics::from(result.summary))
            .with_pagination(pagination),
    ))
}

/// GET /admin/orders/statistics
#[utoipa::path(
    get,
    path = "/admin/orders/statistics",
    params(
        ("X-User-Id" = Uuid, Header, description = "Authenticated admin"),
        StatisticsQuery,
    ),
    responses(
        (status = 200, description = "Order statistics", body = ApiResponse<StatisticsResponse>),
        (status = 400, description = "Invalid date range"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn order_statistics(
    service: web::Data<OrderService>,
    _admin: AuthenticatedUser,
    query: web::Query<StatisticsQuery>,
) -> Result<HttpResponse, AppError> {
    let window = DateWindow {
        start: parse_date(query.start_date.as_deref(), DateBound::Start)?,
        end: parse_date(query.end_date.as_deref(), DateBound::End)?,
    };

    let stats = web::block(move || service.statistics(window))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Order statistics retrieved successfully",
        StatisticsResponse::from(stats),
    )))
}

/// GET /admin/orders/{id}
#[utoipa::path(
    get,
    path = "/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated admin"),
    ),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn get_order(
    service: web::Data<OrderService>,
    _admin: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Order retrieved successfully",
        OrderResponse::from(order),
    )))
}

/// PATCH /admin/orders/{id}/status
///
/// Moves delivery and/or payment status through the state machine.
/// Cancelling here restores stock the same way a user cancellation does and
/// reports the outcome as `stockUpdates`.
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}/status",
    request_body = UpdateStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated admin"),
    ),
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<StatusUpdatedResponse>),
        (status = 400, description = "Invalid status or transition"),
        (status = 404, description = "Order not found"),
    ),
    tag = "admin"
)]
pub async fn update_order_status(
    service: web::Data<OrderService>,
    _admin: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let update = StatusUpdate::try_from(body.into_inner())?;

    let updated = web::block(move || service.update_status(order_id, update))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Order status updated successfully",
        StatusUpdatedResponse::from(updated),
    )))
}

/// DELETE /admin/orders/{id}
///
/// Purges the order and its lines. Stock is not restored.
#[utoipa::path(
    delete,
    path = "/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated admin"),
    ),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn delete_order(
    service: web::Data<OrderService>,
    _admin: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || service.delete_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Order deleted successfully")))
}
