use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Numeric, Text, Uuid as SqlUuid};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{GatewayReferences, Order, OrderLineItem, ShippingAddress, StatusChange};
use crate::domain::product::Product;
use crate::domain::query::{DayBucket, StatusBucket, TopProduct};
use crate::domain::status::UnknownStatus;
use crate::schema::{order_items, orders, products};

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub payment_status: String,
    pub delivery_status: String,
    pub payment_method: String,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip_code: String,
    pub transaction_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    /// Assembles the aggregate; `items` must already be sorted by position.
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
        let id = self.id;
        let corrupt = |e: UnknownStatus| DomainError::Persistence(format!("order {id}: {e}"));
        Ok(Order {
            payment_status: self.payment_status.parse().map_err(corrupt)?,
            delivery_status: self.delivery_status.parse().map_err(corrupt)?,
            id: self.id,
            user_id: self.user_id,
            items: items.into_iter().map(OrderItemRow::into_line).collect(),
            total_amount: self.total_amount,
            discount_amount: self.discount_amount,
            payment_method: self.payment_method,
            shipping_address: ShippingAddress {
                name: self.shipping_name,
                phone: self.shipping_phone,
                street: self.shipping_street,
                city: self.shipping_city,
                state: self.shipping_state,
                zip_code: self.shipping_zip_code,
            },
            transaction_id: self.transaction_id,
            gateway: GatewayReferences {
                order_id: self.gateway_order_id,
                payment_id: self.gateway_payment_id,
                signature: self.gateway_signature,
            },
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub payment_status: String,
    pub delivery_status: String,
    pub payment_method: String,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip_code: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `None` fields are left untouched by the update.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderStatusChangeset {
    pub delivery_status: Option<String>,
    pub payment_status: Option<String>,
    pub transaction_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StatusChange> for OrderStatusChangeset {
    fn from(change: &StatusChange) -> Self {
        let gateway = change.gateway.clone().unwrap_or_default();
        Self {
            delivery_status: change.delivery_status.map(|s| s.as_str().to_string()),
            payment_status: change.payment_status.map(|s| s.as_str().to_string()),
            transaction_id: change.transaction_id.clone(),
            gateway_order_id: gateway.order_id,
            gateway_payment_id: gateway.payment_id,
            gateway_signature: gateway.signature,
            cancelled_at: change.cancelled_at,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub final_price: BigDecimal,
    pub name: String,
    pub image: Option<String>,
}

impl OrderItemRow {
    fn into_line(self) -> OrderLineItem {
        OrderLineItem {
            product_id: self.product_id,
            quantity: self.quantity,
            price: self.price,
            discount: self.discount,
            final_price: self.final_price,
            name: self.name,
            image: self.image,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub final_price: BigDecimal,
    pub name: String,
    pub image: Option<String>,
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            discount: row.discount,
            stock: row.stock,
            images: row.images,
            is_active: row.is_active,
        }
    }
}

/// Catalog rows are owned by the product service; this exists for seeding.
#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub stock: i32,
    pub images: Vec<String>,
}

// ── Aggregations ─────────────────────────────────────────────────────────────

#[derive(Debug, QueryableByName)]
pub struct StatusBucketRow {
    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
    #[diesel(sql_type = Numeric)]
    pub revenue: BigDecimal,
}

impl From<StatusBucketRow> for StatusBucket {
    fn from(row: StatusBucketRow) -> Self {
        StatusBucket {
            status: row.status,
            count: row.count,
            revenue: row.revenue,
        }
    }
}

#[derive(Debug, QueryableByName)]
pub struct DayBucketRow {
    #[diesel(sql_type = Text)]
    pub date: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
    #[diesel(sql_type = Numeric)]
    pub revenue: BigDecimal,
}

impl From<DayBucketRow> for DayBucket {
    fn from(row: DayBucketRow) -> Self {
        DayBucket {
            date: row.date,
            count: row.count,
            revenue: row.revenue,
        }
    }
}

#[derive(Debug, QueryableByName)]
pub struct TopProductRow {
    #[diesel(sql_type = SqlUuid)]
    pub product_id: Uuid,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = BigInt)]
    pub total_quantity: i64,
    #[diesel(sql_type = Numeric)]
    pub total_revenue: BigDecimal,
}

impl From<TopProductRow> for TopProduct {
    fn from(row: TopProductRow) -> Self {
        TopProduct {
            product_id: row.product_id,
            name: row.name,
            total_quantity: row.total_quantity,
            total_revenue: row.total_revenue,
        }
    }
}
