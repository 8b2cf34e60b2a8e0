use std::collections::HashMap;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::product::ProductSummary;
use super::status::{DeliveryStatus, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl ShippingAddress {
    /// Each field with the width of its `orders.shipping_*` column.
    fn fields(&self) -> [(&'static str, usize, &str); 6] {
        [
            ("name", 255, &self.name),
            ("phone", 50, &self.phone),
            ("street", 255, &self.street),
            ("city", 100, &self.city),
            ("state", 100, &self.state),
            ("zipCode", 20, &self.zip_code),
        ]
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, _, value)| value.trim().is_empty())
            .map(|(field, _, _)| field)
            .collect()
    }

    /// Fields longer than their column allows, with the limit.
    pub fn oversized_fields(&self) -> Vec<(&'static str, usize)> {
        self.fields()
            .into_iter()
            .filter(|(_, limit, value)| value.chars().count() > *limit)
            .map(|(field, limit, _)| (field, limit))
            .collect()
    }
}

/// Product snapshot captured at checkout. `final_price` is never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub final_price: BigDecimal,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayReferences {
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub payment_method: String,
    pub shipping_address: ShippingAddress,
    pub transaction_id: Option<String>,
    pub gateway: GatewayReferences,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Fully priced order ready to be persisted in `PENDING/PENDING`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub payment_method: String,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Conditions a status update must match to apply. `None` means "any".
#[derive(Debug, Clone, Copy)]
pub struct StatusGuard {
    pub order_id: Uuid,
    pub user_id: Option<Uuid>,
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl StatusGuard {
    pub fn order(order_id: Uuid) -> Self {
        Self {
            order_id,
            user_id: None,
            delivery_status: None,
            payment_status: None,
        }
    }

    pub fn owned_by(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn in_delivery(mut self, status: DeliveryStatus) -> Self {
        self.delivery_status = Some(status);
        self
    }

    pub fn in_payment(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub gateway: Option<GatewayReferences>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// An order with display fields of its referenced products.
#[derive(Debug, Clone)]
pub struct PopulatedOrder {
    pub order: Order,
    pub products: HashMap<Uuid, ProductSummary>,
}

/// `price * (1 - discount / 100)`, kept exact.
pub fn final_price(price: &BigDecimal, discount: &BigDecimal) -> BigDecimal {
    let one_percent = BigDecimal::new(BigInt::from(1), 2);
    let factor = (BigDecimal::from(100) - discount) * &one_percent;
    trimmed(price * &factor)
}

/// Strips trailing zeros, keeping the scale non-negative.
fn trimmed(value: BigDecimal) -> BigDecimal {
    let value = value.normalized();
    if value.as_bigint_and_exponent().1 < 0 {
        value.with_scale(0)
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub total_amount: BigDecimal,
    pub discount_amount: BigDecimal,
}

pub fn order_totals(items: &[OrderLineItem]) -> OrderTotals {
    let mut total_amount = BigDecimal::from(0);
    let mut discount_amount = BigDecimal::from(0);
    for item in items {
        let quantity = BigDecimal::from(item.quantity);
        total_amount += &item.final_price * &quantity;
        discount_amount += (&item.price - &item.final_price) * &quantity;
    }
    OrderTotals {
        total_amount: trimmed(total_amount),
        discount_amount: trimmed(discount_amount),
    }
}
