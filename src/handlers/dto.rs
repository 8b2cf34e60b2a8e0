//! Wire types. JSON is camelCase; money is sent as decimal strings to avoid
//! floating-point rounding on the client.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::{
    CancelledOrder, OrderPage, PaymentConfirmation, PlaceOrder, RequestedItem, StatusUpdate,
    StatusUpdated,
};
use crate::application::reservation::{CompensationOutcome, StockRestoreReport};
use crate::domain::order::{Order, OrderLineItem, PopulatedOrder, ShippingAddress};
use crate::domain::product::ProductSummary;
use crate::domain::query::{
    DayBucket, OrderStatistics, Page, RevenueSummary, StatusBucket, TopProduct,
};
use crate::domain::status::{DeliveryStatus, PaymentStatus};
use crate::errors::AppError;

// ── Envelope ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<RevenueStatistics>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
            pagination: None,
            statistics: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_statistics(mut self, statistics: RevenueStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
            pagination: None,
            statistics: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        Self {
            current_page: page.page,
            total_pages: page.total_pages(total),
            total_items: total,
            limit: page.limit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStatistics {
    pub total_revenue: String,
    pub total_discount: String,
}

impl From<RevenueSummary> for RevenueStatistics {
    fn from(summary: RevenueSummary) -> Self {
        Self {
            total_revenue: summary.total_revenue.to_string(),
            total_discount: summary.total_discount.to_string(),
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    /// Product UUID.
    pub product: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddressDto {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(dto: ShippingAddressDto) -> Self {
        ShippingAddress {
            name: dto.name,
            phone: dto.phone,
            street: dto.street,
            city: dto.city,
            state: dto.state,
            zip_code: dto.zip_code,
        }
    }
}

impl From<ShippingAddress> for ShippingAddressDto {
    fn from(address: ShippingAddress) -> Self {
        Self {
            name: address.name,
            phone: address.phone,
            street: address.street,
            city: address.city,
            state: address.state,
            zip_code: address.zip_code,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub payment_method: String,
    pub shipping_address: Option<ShippingAddressDto>,
    pub notes: Option<String>,
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(req: CreateOrderRequest) -> Self {
        PlaceOrder {
            items: req
                .items
                .into_iter()
                .map(|item| RequestedItem {
                    product: item.product,
                    quantity: item.quantity,
                })
                .collect(),
            payment_method: req.payment_method,
            shipping_address: req.shipping_address.map(ShippingAddress::from),
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: Uuid,
    #[serde(default)]
    pub gateway_order_id: String,
    #[serde(default)]
    pub gateway_payment_id: String,
    #[serde(default)]
    pub gateway_signature: String,
}

impl VerifyPaymentRequest {
    pub fn into_parts(self) -> (Uuid, PaymentConfirmation) {
        (
            self.order_id,
            PaymentConfirmation {
                gateway_order_id: self.gateway_order_id,
                gateway_payment_id: self.gateway_payment_id,
                signature: self.gateway_signature,
            },
        )
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// One of PENDING, PROCESSING, SHIPPED, DELIVERED, CANCELLED.
    pub delivery_status: Option<String>,
    /// One of PENDING, COMPLETED, FAILED, REFUNDED.
    pub payment_status: Option<String>,
    pub transaction_id: Option<String>,
}

impl TryFrom<UpdateStatusRequest> for StatusUpdate {
    type Error = AppError;

    fn try_from(req: UpdateStatusRequest) -> Result<Self, Self::Error> {
        Ok(StatusUpdate {
            delivery_status: parse_status(req.delivery_status.as_deref(), "delivery status")?,
            payment_status: parse_status(req.payment_status.as_deref(), "payment status")?,
            transaction_id: req.transaction_id.filter(|t| !t.trim().is_empty()),
        })
    }
}

fn parse_status<S: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<Option<S>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid {what}: {value}"))),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserOrdersQuery {
    /// Page number (1-based, default 1)
    pub page: Option<i64>,
    /// Items per page (default 10, max 100)
    pub limit: Option<i64>,
    /// Delivery status filter
    pub status: Option<String>,
}

impl UserOrdersQuery {
    pub fn into_parts(self) -> Result<(Option<DeliveryStatus>, Page), AppError> {
        let status = parse_status(self.status.as_deref(), "delivery status")?;
        Ok((status, Page::new(self.page, self.limit)))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdminOrdersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub delivery_status: Option<String>,
    pub payment_status: Option<String>,
    pub user_id: Option<Uuid>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    pub start_date: Option<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD (whole day)
    pub end_date: Option<String>,
}

impl AdminOrdersQuery {
    pub fn delivery_status(&self) -> Result<Option<DeliveryStatus>, AppError> {
        parse_status(self.delivery_status.as_deref(), "delivery status")
    }

    pub fn payment_status(&self) -> Result<Option<PaymentStatus>, AppError> {
        parse_status(self.payment_status.as_deref(), "payment status")
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatisticsQuery {
    /// RFC 3339 timestamp or YYYY-MM-DD
    pub start_date: Option<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD (whole day)
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum DateBound {
    Start,
    End,
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`. A bare end date covers the whole
/// day.
pub fn parse_date(raw: Option<&str>, bound: DateBound) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date: {raw}")))?;
    let (h, m, sec, micro) = match bound {
        DateBound::Start => (0, 0, 0, 0),
        DateBound::End => (23, 59, 59, 999_999),
    };
    let time = NaiveTime::from_hms_micro_opt(h, m, sec, micro)
        .ok_or_else(|| AppError::Validation(format!("Invalid date: {raw}")))?;
    Ok(Some(Utc.from_utc_datetime(&day.and_time(time))))
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    /// Current catalog price
    pub price: String,
}

impl From<&ProductSummary> for ProductSummaryResponse {
    fn from(p: &ProductSummary) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            image: p.image.clone(),
            price: p.price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i32,
    /// Unit price at checkout
    pub price: String,
    /// Discount percent at checkout
    pub discount: String,
    pub final_price: String,
    /// Current catalog details, absent when the product is gone
    pub product: Option<ProductSummaryResponse>,
}

impl OrderItemResponse {
    fn new(item: OrderLineItem, products: &HashMap<Uuid, ProductSummary>) -> Self {
        Self {
            product: products.get(&item.product_id).map(ProductSummaryResponse::from),
            product_id: item.product_id,
            name: item.name,
            image: item.image,
            quantity: item.quantity,
            price: item.price.to_string(),
            discount: item.discount.to_string(),
            final_price: item.final_price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: String,
    pub discount_amount: String,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub payment_method: String,
    pub shipping_address: ShippingAddressDto,
    pub transaction_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub cancelled_at: Option<String>,
}

impl OrderResponse {
    fn build(order: Order, products: &HashMap<Uuid, ProductSummary>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse::new(item, products))
                .collect(),
            total_amount: order.total_amount.to_string(),
            discount_amount: order.discount_amount.to_string(),
            payment_status: order.payment_status,
            delivery_status: order.delivery_status,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address.into(),
            transaction_id: order.transaction_id,
            gateway_order_id: order.gateway.order_id,
            gateway_payment_id: order.gateway.payment_id,
            notes: order.notes,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            cancelled_at: order.cancelled_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl From<PopulatedOrder> for OrderResponse {
    fn from(populated: PopulatedOrder) -> Self {
        Self::build(populated.order, &populated.products)
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self::build(order, &HashMap::new())
    }
}

pub fn order_list(page: OrderPage) -> (Vec<OrderResponse>, Pagination) {
    let pagination = Pagination::new(page.page, page.total);
    let items = page.items.into_iter().map(OrderResponse::from).collect();
    (items, pagination)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateDetail {
    pub product_id: Uuid,
    pub quantity: i32,
    pub new_stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateFailure {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdates {
    pub successful: usize,
    pub failed: usize,
    pub details: Vec<StockUpdateDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StockUpdateFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelledOrderResponse {
    pub order: OrderResponse,
    pub stock_updates: StockUpdates,
}

impl From<StockRestoreReport> for StockUpdates {
    fn from(report: StockRestoreReport) -> Self {
        let mut details = Vec::new();
        let mut failures = Vec::new();
        for outcome in report.outcomes {
            match outcome {
                CompensationOutcome::Restored {
                    product_id,
                    quantity,
                    new_stock,
                } => details.push(StockUpdateDetail {
                    product_id,
                    quantity,
                    new_stock,
                }),
                CompensationOutcome::Failed {
                    product_id,
                    quantity,
                    reason,
                } => failures.push(StockUpdateFailure {
                    product_id,
                    quantity,
                    reason,
                }),
            }
        }
        Self {
            successful: details.len(),
            failed: failures.len(),
            details,
            failures,
        }
    }
}

impl From<CancelledOrder> for CancelledOrderResponse {
    fn from(cancelled: CancelledOrder) -> Self {
        Self {
            order: cancelled.order.into(),
            stock_updates: cancelled.stock_updates.into(),
        }
    }
}

/// Admin status change. Carries `stockUpdates` when the order was cancelled.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatedResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_updates: Option<StockUpdates>,
}

impl From<StatusUpdated> for StatusUpdatedResponse {
    fn from(updated: StatusUpdated) -> Self {
        Self {
            order: updated.order.into(),
            stock_updates: updated.stock_updates.map(StockUpdates::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerifiedResponse {
    pub order_id: Uuid,
    pub payment_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusBucketResponse {
    pub status: String,
    pub count: i64,
    pub revenue: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayBucketResponse {
    pub date: String,
    pub count: i64,
    pub revenue: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProductResponse {
    pub product_id: Uuid,
    pub name: String,
    pub total_quantity: i64,
    pub total_revenue: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub orders_by_status: Vec<StatusBucketResponse>,
    pub orders_by_day: Vec<DayBucketResponse>,
    pub top_products: Vec<TopProductResponse>,
}

impl From<OrderStatistics> for StatisticsResponse {
    fn from(stats: OrderStatistics) -> Self {
        Self {
            orders_by_status: stats
                .orders_by_status
                .into_iter()
                .map(|StatusBucket { status, count, revenue }| StatusBucketResponse {
                    status,
                    count,
                    revenue: revenue.to_string(),
                })
                .collect(),
            orders_by_day: stats
                .orders_by_day
                .into_iter()
                .map(|DayBucket { date, count, revenue }| DayBucketResponse {
                    date,
                    count,
                    revenue: revenue.to_string(),
                })
                .collect(),
            top_products: stats
                .top_products
                .into_iter()
                .map(|p: TopProduct| TopProductResponse {
                    product_id: p.product_id,
                    name: p.name,
                    total_quantity: p.total_quantity,
                    total_revenue: p.total_revenue.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn bare_dates_cover_whole_days() {
        let start = parse_date(Some("2025-03-01"), DateBound::Start).unwrap().unwrap();
        let end = parse_date(Some("2025-03-01"), DateBound::End).unwrap().unwrap();

        assert_eq!((start.day(), start.hour(), start.minute()), (1, 0, 0));
        assert_eq!((end.day(), end.hour(), end.minute(), end.second()), (1, 23, 59, 59));
        assert!(end > start);
    }

    #[test]
    fn rfc3339_is_normalised_to_utc() {
        let ts = parse_date(Some("2025-03-01T10:00:00+02:00"), DateBound::End)
            .unwrap()
            .unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn blank_dates_are_absent_and_garbage_is_rejected() {
        assert!(parse_date(None, DateBound::Start).unwrap().is_none());
        assert!(parse_date(Some(" "), DateBound::Start).unwrap().is_none());
        assert!(matches!(
            parse_date(Some("03/01/2025"), DateBound::Start),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn status_update_parses_case_insensitively() {
        let update = StatusUpdate::try_from(UpdateStatusRequest {
            delivery_status: Some("shipped".to_string()),
            payment_status: None,
            transaction_id: Some(" ".to_string()),
        })
        .unwrap();
        assert_eq!(update.delivery_status, Some(DeliveryStatus::Shipped));
        assert!(update.transaction_id.is_none());

        let bad = StatusUpdate::try_from(UpdateStatusRequest {
            delivery_status: None,
            payment_status: Some("LOST".to_string()),
            transaction_id: None,
        });
        assert!(matches!(bad, Err(AppError::Validation(msg)) if msg.contains("payment status")));
    }

    #[test]
    fn pagination_metadata() {
        let meta = Pagination::new(Page::new(Some(2), Some(10)), 21);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            serde_json::json!({ "currentPage": 2, "totalPages": 3, "totalItems": 21, "limit": 10 })
        );
    }
}
