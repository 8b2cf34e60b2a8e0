use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::order::Order;
use super::status::{DeliveryStatus, PaymentStatus};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const TOP_PRODUCTS_LIMIT: i64 = 5;

/// 1-based page with a clamped size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |id| order.user_id == id)
            && self.delivery_status.map_or(true, |s| order.delivery_status == s)
            && self.payment_status.map_or(true, |s| order.payment_status == s)
            && self.created_from.map_or(true, |from| order.created_at >= from)
            && self.created_to.map_or(true, |to| order.created_at <= to)
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Revenue and discount given over COMPLETED orders.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueSummary {
    pub total_revenue: BigDecimal,
    pub total_discount: BigDecimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusBucket {
    pub status: String,
    pub count: i64,
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub count: i64,
    pub revenue: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub total_quantity: i64,
    pub total_revenue: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatistics {
    pub orders_by_status: Vec<StatusBucket>,
    pub orders_by_day: Vec<DayBucket>,
    pub top_products: Vec<TopProduct>,
}
