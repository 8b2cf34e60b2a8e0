use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    final_price, order_totals, GatewayReferences, NewOrder, Order, OrderLineItem,
    PopulatedOrder, ShippingAddress, StatusChange, StatusGuard,
};
use crate::domain::ports::{
    CartRepository, CatalogRepository, OrderRepository, PaymentSignatureVerifier,
};
use crate::domain::product::ProductSummary;
use crate::domain::query::{
    DateWindow, ListResult, OrderFilter, OrderStatistics, Page, RevenueSummary,
    TOP_PRODUCTS_LIMIT,
};
use crate::domain::status::{DeliveryStatus, PaymentStatus};

use super::reservation::{
    ReservationLedger, ReservedQuantity, StockReservation, StockRestoreReport,
};

// ── Commands ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RequestedItem {
    /// Raw product reference as sent by the client.
    pub product: String,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub items: Vec<RequestedItem>,
    pub payment_method: String,
    pub shipping_address: Option<ShippingAddress>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CancelledOrder {
    pub order: Order,
    pub stock_updates: StockRestoreReport,
}

/// Result of an admin status change. `stock_updates` is present when the
/// change cancelled the order.
#[derive(Debug, Clone)]
pub struct StatusUpdated {
    pub order: Order,
    pub stock_updates: Option<StockRestoreReport>,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<PopulatedOrder>,
    pub total: i64,
    pub page: Page,
}

#[derive(Debug, Clone)]
pub struct AdminOrderPage {
    pub orders: OrderPage,
    pub summary: RevenueSummary,
}

/// Width of `orders.payment_method`.
const PAYMENT_METHOD_MAX_LEN: usize = 50;

struct ValidatedOrder {
    lines: Vec<(Uuid, i32)>,
    payment_method: String,
    shipping_address: ShippingAddress,
    notes: Option<String>,
}

fn validate(command: PlaceOrder) -> Result<ValidatedOrder, DomainError> {
    if command.items.is_empty() {
        return Err(DomainError::Validation(
            "Items array is required and cannot be empty".to_string(),
        ));
    }
    let payment_method = command.payment_method.trim().to_string();
    let shipping_address = match command.shipping_address {
        Some(address) if !payment_method.is_empty() => address,
        _ => {
            return Err(DomainError::Validation(
                "Payment method and shipping address are required".to_string(),
            ))
        }
    };
    let missing = shipping_address.missing_fields();
    if !missing.is_empty() {
        return Err(DomainError::Validation(format!(
            "Shipping address is missing: {}",
            missing.join(", ")
        )));
    }
    if payment_method.chars().count() > PAYMENT_METHOD_MAX_LEN {
        return Err(DomainError::Validation(format!(
            "Payment method must be at most {PAYMENT_METHOD_MAX_LEN} characters"
        )));
    }
    if let Some((field, limit)) = shipping_address.oversized_fields().into_iter().next() {
        return Err(DomainError::Validation(format!(
            "Shipping address {field} must be at most {limit} characters"
        )));
    }

    let mut lines = Vec::with_capacity(command.items.len());
    for item in &command.items {
        let product_id = Uuid::parse_str(item.product.trim()).map_err(|_| {
            DomainError::Validation(format!("Invalid product ID: {}", item.product))
        })?;
        let quantity = i32::try_from(item.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "Invalid quantity for product {}. Must be a positive integer",
                    item.product
                ))
            })?;
        lines.push((product_id, quantity));
    }

    let mut seen = HashSet::with_capacity(lines.len());
    if !lines.iter().all(|(id, _)| seen.insert(*id)) {
        return Err(DomainError::Validation(
            "Duplicate products in order. Please combine quantities for the same product"
                .to_string(),
        ));
    }

    Ok(ValidatedOrder {
        lines,
        payment_method,
        shipping_address,
        notes: command.notes.filter(|n| !n.trim().is_empty()),
    })
}

/// Why `order` cannot accept a payment, reporting the axis that blocks it.
/// Delivery must still be PENDING; payment PENDING or FAILED (a retry).
fn payment_blocker(order: &Order) -> Option<DomainError> {
    if order.delivery_status != DeliveryStatus::Pending {
        return Some(DomainError::InvalidStateTransition {
            current: order.delivery_status.to_string(),
            requested: DeliveryStatus::Processing.to_string(),
        });
    }
    match order.payment_status {
        PaymentStatus::Pending | PaymentStatus::Failed => None,
        current => Some(DomainError::InvalidStateTransition {
            current: current.to_string(),
            requested: PaymentStatus::Completed.to_string(),
        }),
    }
}

// ── Service ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
    verifier: Arc<dyn PaymentSignatureVerifier>,
    reservations: StockReservation,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        carts: Arc<dyn CartRepository>,
        verifier: Arc<dyn PaymentSignatureVerifier>,
    ) -> Self {
        let reservations = StockReservation::new(catalog.clone());
        Self {
            orders,
            catalog,
            carts,
            verifier,
            reservations,
        }
    }

    /// Validates, reserves stock line by line, prices and persists the order.
    /// Any failure after the first reservation releases everything reserved.
    pub fn place_order(
        &self,
        user_id: Uuid,
        command: PlaceOrder,
    ) -> Result<PopulatedOrder, DomainError> {
        let validated = validate(command)?;
        let mut ledger = ReservationLedger::default();

        match self.reserve_and_persist(user_id, validated, &mut ledger) {
            Ok(order) => {
                log::info!(
                    "Order {} placed by user {} ({} lines, total {})",
                    order.id,
                    user_id,
                    order.items.len(),
                    order.total_amount
                );
                Ok(self.populate(order))
            }
            Err(err) => {
                if !ledger.is_empty() {
                    log::warn!(
                        "Rolling back {} stock reservations for failed order of user {}: {}",
                        ledger.len(),
                        user_id,
                        err
                    );
                    self.reservations.rollback(ledger);
                }
                Err(err)
            }
        }
    }

    fn reserve_and_persist(
        &self,
        user_id: Uuid,
        validated: ValidatedOrder,
        ledger: &mut ReservationLedger,
    ) -> Result<Order, DomainError> {
        let mut items = Vec::with_capacity(validated.lines.len());
        for (product_id, quantity) in validated.lines {
            let reserved = self.reservations.reserve(ledger, product_id, quantity)?;
            let product = reserved.product;
            items.push(OrderLineItem {
                product_id,
                quantity,
                final_price: final_price(&product.price, &product.discount),
                image: product.primary_image().map(str::to_string),
                price: product.price,
                discount: product.discount,
                name: product.name,
            });
        }

        let totals = order_totals(&items);
        if totals.total_amount <= BigDecimal::from(0) {
            return Err(DomainError::Validation(
                "Invalid order total amount".to_string(),
            ));
        }

        self.orders.create(NewOrder {
            user_id,
            items,
            total_amount: totals.total_amount,
            discount_amount: totals.discount_amount,
            payment_method: validated.payment_method,
            shipping_address: validated.shipping_address,
            notes: validated.notes,
            created_at: Utc::now(),
        })
    }

    /// Moves a PENDING order owned by `user_id` to CANCELLED and puts its
    /// stock back. Stock restore failures are reported, not raised.
    pub fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> Result<CancelledOrder, DomainError> {
        let guard = StatusGuard::order(order_id)
            .owned_by(user_id)
            .in_delivery(DeliveryStatus::Pending);
        let change = StatusChange {
            delivery_status: Some(DeliveryStatus::Cancelled),
            cancelled_at: Some(Utc::now()),
            ..Default::default()
        };

        let Some(order) = self.orders.transition(&guard, &change)? else {
            return Err(match self.orders.find_for_user(order_id, user_id)? {
                None => DomainError::order_not_found(),
                Some(existing) => DomainError::InvalidStateTransition {
                    current: existing.delivery_status.to_string(),
                    requested: DeliveryStatus::Cancelled.to_string(),
                },
            });
        };

        let stock_updates = self.restore_stock(&order);
        log::info!(
            "Order {} cancelled by user {} ({} of {} stock restores succeeded)",
            order.id,
            user_id,
            stock_updates.successful(),
            order.items.len()
        );
        Ok(CancelledOrder {
            order,
            stock_updates,
        })
    }

    fn restore_stock(&self, order: &Order) -> StockRestoreReport {
        let entries: Vec<ReservedQuantity> = order
            .items
            .iter()
            .map(|item| ReservedQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        let report = self.reservations.restore(&entries);
        if report.failed() > 0 {
            log::warn!(
                "Some stock updates failed during cancellation of order {}: {:?}",
                order.id,
                report.failures().collect::<Vec<_>>()
            );
        }
        report
    }

    /// Checks the gateway signature. A match completes payment and starts
    /// processing; a mismatch marks a pending payment FAILED.
    pub fn verify_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<Order, DomainError> {
        if [
            &confirmation.gateway_order_id,
            &confirmation.gateway_payment_id,
            &confirmation.signature,
        ]
        .iter()
        .any(|field| field.trim().is_empty())
        {
            return Err(DomainError::Validation(
                "Gateway order id, payment id and signature are required".to_string(),
            ));
        }

        let order = self
            .orders
            .find_for_user(order_id, user_id)?
            .ok_or_else(DomainError::order_not_found)?;

        if !self.verifier.verify(
            &confirmation.gateway_order_id,
            &confirmation.gateway_payment_id,
            &confirmation.signature,
        ) {
            let guard = StatusGuard::order(order_id)
                .owned_by(user_id)
                .in_payment(PaymentStatus::Pending);
            let change = StatusChange {
                payment_status: Some(PaymentStatus::Failed),
                ..Default::default()
            };
            self.orders.transition(&guard, &change)?;
            log::warn!("Payment signature mismatch for order {}", order_id);
            return Err(DomainError::SignatureMismatch);
        }

        if order
            .gateway
            .order_id
            .as_deref()
            .is_some_and(|bound| bound != confirmation.gateway_order_id)
        {
            return Err(DomainError::Validation(
                "Gateway order id does not match this order".to_string(),
            ));
        }
        if self
            .orders
            .payment_recorded_elsewhere(&confirmation.gateway_payment_id, order_id)?
        {
            log::warn!(
                "Gateway payment {} replayed against order {}",
                confirmation.gateway_payment_id,
                order_id
            );
            return Err(DomainError::DuplicatePayment(confirmation.gateway_payment_id));
        }
        if let Some(blocked) = payment_blocker(&order) {
            return Err(blocked);
        }

        let guard = StatusGuard::order(order_id)
            .owned_by(user_id)
            .in_delivery(DeliveryStatus::Pending)
            .in_payment(order.payment_status);
        let change = StatusChange {
            delivery_status: Some(DeliveryStatus::Processing),
            payment_status: Some(PaymentStatus::Completed),
            transaction_id: Some(confirmation.gateway_payment_id.clone()),
            gateway: Some(GatewayReferences {
                order_id: Some(confirmation.gateway_order_id),
                payment_id: Some(confirmation.gateway_payment_id),
                signature: Some(confirmation.signature),
            }),
            cancelled_at: None,
        };
        let Some(paid) = self.orders.transition(&guard, &change)? else {
            let latest = self
                .orders
                .find_for_user(order_id, user_id)?
                .ok_or_else(DomainError::order_not_found)?;
            return Err(payment_blocker(&latest).unwrap_or(DomainError::InvalidStateTransition {
                current: latest.payment_status.to_string(),
                requested: PaymentStatus::Completed.to_string(),
            }));
        };

        if let Err(err) = self.carts.clear(user_id) {
            log::warn!("Failed to clear cart of user {} after payment: {}", user_id, err);
        }
        log::info!("Payment verified for order {}", paid.id);
        Ok(paid)
    }

    /// Admin status change through the state machine, applied as a
    /// compare-and-set against the state it was validated on.
    pub fn update_status(
        &self,
        order_id: Uuid,
        update: StatusUpdate,
    ) -> Result<StatusUpdated, DomainError> {
        if update.delivery_status.is_none()
            && update.payment_status.is_none()
            && update.transaction_id.is_none()
        {
            return Err(DomainError::Validation(
                "Provide at least one of deliveryStatus, paymentStatus or transactionId".to_string(),
            ));
        }

        let current = self
            .orders
            .find_by_id(order_id)?
            .ok_or_else(DomainError::order_not_found)?;

        let mut change = StatusChange {
            transaction_id: update.transaction_id.clone(),
            ..Default::default()
        };
        if let Some(next) = update.delivery_status.filter(|s| *s != current.delivery_status) {
            if !current.delivery_status.can_transition_to(next) {
                return Err(DomainError::InvalidStateTransition {
                    current: current.delivery_status.to_string(),
                    requested: next.to_string(),
                });
            }
            change.delivery_status = Some(next);
            if next == DeliveryStatus::Cancelled {
                change.cancelled_at = Some(Utc::now());
            }
        }
        if let Some(next) = update.payment_status.filter(|s| *s != current.payment_status) {
            if !current.payment_status.can_transition_to(next) {
                return Err(DomainError::InvalidStateTransition {
                    current: current.payment_status.to_string(),
                    requested: next.to_string(),
                });
            }
            change.payment_status = Some(next);
        }

        let guard = StatusGuard::order(order_id)
            .in_delivery(current.delivery_status)
            .in_payment(current.payment_status);
        let Some(updated) = self.orders.transition(&guard, &change)? else {
            let latest = self
                .orders
                .find_by_id(order_id)?
                .ok_or_else(DomainError::order_not_found)?;
            let (current, requested) = match (update.delivery_status, update.payment_status) {
                (Some(next), _) => (latest.delivery_status.to_string(), next.to_string()),
                (None, Some(next)) => (latest.payment_status.to_string(), next.to_string()),
                (None, None) => (
                    latest.delivery_status.to_string(),
                    latest.delivery_status.to_string(),
                ),
            };
            return Err(DomainError::InvalidStateTransition { current, requested });
        };

        let stock_updates = (change.delivery_status == Some(DeliveryStatus::Cancelled))
            .then(|| self.restore_stock(&updated));
        log::info!(
            "Order {} status set to {}/{}",
            updated.id,
            updated.delivery_status,
            updated.payment_status
        );
        Ok(StatusUpdated {
            order: updated,
            stock_updates,
        })
    }

    pub fn delete_order(&self, order_id: Uuid) -> Result<(), DomainError> {
        if self.orders.delete(order_id)? {
            log::info!("Order {} purged", order_id);
            Ok(())
        } else {
            Err(DomainError::order_not_found())
        }
    }

    pub fn get_user_order(&self, order_id: Uuid, user_id: Uuid) -> Result<PopulatedOrder, DomainError> {
        let order = self
            .orders
            .find_for_user(order_id, user_id)?
            .ok_or_else(DomainError::order_not_found)?;
        Ok(self.populate(order))
    }

    pub fn get_order(&self, order_id: Uuid) -> Result<PopulatedOrder, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)?
            .ok_or_else(DomainError::order_not_found)?;
        Ok(self.populate(order))
    }

    pub fn list_user_orders(
        &self,
        user_id: Uuid,
        status: Option<DeliveryStatus>,
        page: Page,
    ) -> Result<OrderPage, DomainError> {
        let filter = OrderFilter {
            user_id: Some(user_id),
            delivery_status: status,
            ..Default::default()
        };
        let result = self.orders.list(&filter, page)?;
        Ok(self.page_of(result, page))
    }

    pub fn list_orders(&self, filter: OrderFilter, page: Page) -> Result<AdminOrderPage, DomainError> {
        check_range(filter.created_from, filter.created_to)?;
        let result = self.orders.list(&filter, page)?;
        let summary = self.orders.revenue_summary(&filter)?;
        Ok(AdminOrderPage {
            orders: self.page_of(result, page),
            summary,
        })
    }

    pub fn statistics(&self, window: DateWindow) -> Result<OrderStatistics, DomainError> {
        check_range(window.start, window.end)?;
        self.orders.statistics(window, TOP_PRODUCTS_LIMIT)
    }

    fn page_of(&self, result: ListResult, page: Page) -> OrderPage {
        OrderPage {
            items: self.populate_all(result.items),
            total: result.total,
            page,
        }
    }

    fn populate(&self, order: Order) -> PopulatedOrder {
        let index = self.product_index(std::slice::from_ref(&order));
        attach_products(order, &index)
    }

    fn populate_all(&self, orders: Vec<Order>) -> Vec<PopulatedOrder> {
        let index = self.product_index(&orders);
        orders
            .into_iter()
            .map(|order| attach_products(order, &index))
            .collect()
    }

    /// Read-after-write join of product display fields. A catalog outage
    /// only drops the enrichment.
    fn product_index(&self, orders: &[Order]) -> HashMap<Uuid, ProductSummary> {
        let ids: Vec<Uuid> = orders
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.product_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        match self.catalog.find_many(&ids) {
            Ok(products) => products.iter().map(|p| (p.id, p.summary())).collect(),
            Err(err) => {
                log::warn!("Could not load product details for orders: {}", err);
                HashMap::new()
            }
        }
    }
}

fn attach_products(order: Order, index: &HashMap<Uuid, ProductSummary>) -> PopulatedOrder {
    let products = order
        .items
        .iter()
        .filter_map(|i| index.get(&i.product_id).map(|p| (i.product_id, p.clone())))
        .collect();
    PopulatedOrder { order, products }
}

fn check_range(
    start: Option<chrono::DateTime<Utc>>,
    end: Option<chrono::DateTime<Utc>>,
) -> Result<(), DomainError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(DomainError::Validation(
            "startDate must not be after endDate".to_string(),
        )),
        _ => Ok(()),
    }
}
