//! In-memory ports for exercising the application layer and the HTTP
//! handlers without a database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, ShippingAddress, StatusChange, StatusGuard};
use crate::domain::ports::{CartRepository, CatalogRepository, OrderRepository};
use crate::domain::product::Product;
use crate::domain::query::{
    DateWindow, DayBucket, ListResult, OrderFilter, OrderStatistics, Page, RevenueSummary,
    StatusBucket, TopProduct,
};
use crate::domain::status::{DeliveryStatus, PaymentStatus};
use crate::infrastructure::gateway::HmacSignatureVerifier;

use super::order_service::{OrderService, PlaceOrder, RequestedItem};

pub const TEST_GATEWAY_SECRET: &str = "test-gateway-secret";

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal")
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<Mutex<HashMap<Uuid, Product>>>,
    failing_increments: Arc<Mutex<HashSet<Uuid>>>,
}

impl InMemoryCatalog {
    pub fn add(&self, name: &str, price: &str, discount: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.products.lock().unwrap().insert(
            id,
            Product {
                id,
                name: name.to_string(),
                price: dec(price),
                discount: dec(discount),
                stock,
                images: vec![format!("https://cdn.example.com/{name}.png")],
                is_active: true,
            },
        );
        id
    }

    pub fn stock(&self, id: Uuid) -> i32 {
        self.products.lock().unwrap()[&id].stock
    }

    pub fn set_price(&self, id: Uuid, price: &str, discount: &str) {
        let mut products = self.products.lock().unwrap();
        let product = products.get_mut(&id).unwrap();
        product.price = dec(price);
        product.discount = dec(discount);
    }

    pub fn deactivate(&self, id: Uuid) {
        self.products.lock().unwrap().get_mut(&id).unwrap().is_active = false;
    }

    pub fn remove(&self, id: Uuid) {
        self.products.lock().unwrap().remove(&id);
    }

    pub fn fail_increments_for(&self, id: Uuid) {
        self.failing_increments.lock().unwrap().insert(id);
    }
}

impl CatalogRepository for InMemoryCatalog {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        let products = self.products.lock().unwrap();
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    fn conditional_decrement_stock(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Product>, DomainError> {
        let mut products = self.products.lock().unwrap();
        match products.get_mut(&id) {
            Some(product) if product.is_active && product.stock >= quantity => {
                product.stock -= quantity;
                Ok(Some(product.clone()))
            }
            _ => Ok(None),
        }
    }

    fn increment_stock(&self, id: Uuid, quantity: i32) -> Result<Option<Product>, DomainError> {
        if self.failing_increments.lock().unwrap().contains(&id) {
            return Err(DomainError::Persistence("connection reset".to_string()));
        }
        let mut products = self.products.lock().unwrap();
        Ok(products.get_mut(&id).map(|product| {
            product.stock += quantity;
            product.clone()
        }))
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryOrders {
    orders: Arc<Mutex<Vec<Order>>>,
    fail_create: Arc<AtomicBool>,
}

impl InMemoryOrders {
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn force_delivery_status(&self, id: Uuid, status: DeliveryStatus) {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.iter_mut().find(|o| o.id == id).unwrap();
        order.delivery_status = status;
    }
}

fn guard_matches(guard: &StatusGuard, order: &Order) -> bool {
    order.id == guard.order_id
        && guard.user_id.map_or(true, |u| order.user_id == u)
        && guard.delivery_status.map_or(true, |s| order.delivery_status == s)
        && guard.payment_status.map_or(true, |s| order.payment_status == s)
}

impl OrderRepository for InMemoryOrders {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(DomainError::Persistence("insert failed".to_string()));
        }
        let created = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            items: order.items,
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            payment_status: PaymentStatus::Pending,
            delivery_status: DeliveryStatus::Pending,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address,
            transaction_id: None,
            gateway: Default::default(),
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.created_at,
            cancelled_at: None,
        };
        self.orders.lock().unwrap().push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id && o.user_id == user_id)
            .cloned())
    }

    fn list(&self, filter: &OrderFilter, page: Page) -> Result<ListResult, DomainError> {
        let mut matching: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(ListResult { items, total })
    }

    fn transition(
        &self,
        guard: &StatusGuard,
        change: &StatusChange,
    ) -> Result<Option<Order>, DomainError> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(payment_id) = change.gateway.as_ref().and_then(|g| g.payment_id.as_ref()) {
            let taken = orders.iter().any(|o| {
                o.id != guard.order_id && o.gateway.payment_id.as_ref() == Some(payment_id)
            });
            if taken {
                return Err(DomainError::DuplicatePayment(payment_id.clone()));
            }
        }
        let Some(order) = orders.iter_mut().find(|o| guard_matches(guard, o)) else {
            return Ok(None);
        };
        if let Some(status) = change.delivery_status {
            order.delivery_status = status;
        }
        if let Some(status) = change.payment_status {
            order.payment_status = status;
        }
        if let Some(transaction_id) = &change.transaction_id {
            order.transaction_id = Some(transaction_id.clone());
        }
        if let Some(gateway) = &change.gateway {
            order.gateway = gateway.clone();
        }
        if change.cancelled_at.is_some() {
            order.cancelled_at = change.cancelled_at;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    fn payment_recorded_elsewhere(
        &self,
        gateway_payment_id: &str,
        except: Uuid,
    ) -> Result<bool, DomainError> {
        Ok(self.orders.lock().unwrap().iter().any(|o| {
            o.id != except && o.gateway.payment_id.as_deref() == Some(gateway_payment_id)
        }))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let before = orders.len();
        orders.retain(|o| o.id != id);
        Ok(orders.len() != before)
    }

    fn revenue_summary(&self, filter: &OrderFilter) -> Result<RevenueSummary, DomainError> {
        let orders = self.orders.lock().unwrap();
        let completed = orders
            .iter()
            .filter(|o| filter.matches(o) && o.payment_status == PaymentStatus::Completed);
        let mut summary = RevenueSummary {
            total_revenue: BigDecimal::from(0),
            total_discount: BigDecimal::from(0),
        };
        for order in completed {
            summary.total_revenue += &order.total_amount;
            summary.total_discount += &order.discount_amount;
        }
        Ok(summary)
    }

    fn statistics(&self, window: DateWindow, top_n: i64) -> Result<OrderStatistics, DomainError> {
        let filter = OrderFilter {
            created_from: window.start,
            created_to: window.end,
            ..Default::default()
        };
        let orders = self.orders.lock().unwrap();
        let mut by_status: BTreeMap<String, (i64, BigDecimal)> = BTreeMap::new();
        let mut by_day: BTreeMap<String, (i64, BigDecimal)> = BTreeMap::new();
        let mut by_product: HashMap<Uuid, (String, i64, BigDecimal)> = HashMap::new();
        for order in orders.iter().filter(|o| filter.matches(o)) {
            let status = by_status
                .entry(order.delivery_status.to_string())
                .or_insert((0, BigDecimal::from(0)));
            status.0 += 1;
            status.1 += &order.total_amount;
            let day = by_day
                .entry(order.created_at.format("%Y-%m-%d").to_string())
                .or_insert((0, BigDecimal::from(0)));
            day.0 += 1;
            day.1 += &order.total_amount;
            for item in &order.items {
                let product = by_product
                    .entry(item.product_id)
                    .or_insert((item.name.clone(), 0, BigDecimal::from(0)));
                product.1 += i64::from(item.quantity);
                product.2 += &item.final_price * &BigDecimal::from(item.quantity);
            }
        }
        let mut top_products: Vec<TopProduct> = by_product
            .into_iter()
            .map(|(product_id, (name, total_quantity, total_revenue))| TopProduct {
                product_id,
                name,
                total_quantity,
                total_revenue,
            })
            .collect();
        top_products.sort_by(|a, b| {
            b.total_quantity
                .cmp(&a.total_quantity)
                .then(a.product_id.cmp(&b.product_id))
        });
        top_products.truncate(top_n as usize);
        Ok(OrderStatistics {
            orders_by_status: by_status
                .into_iter()
                .map(|(status, (count, revenue))| StatusBucket {
                    status,
                    count,
                    revenue,
                })
                .collect(),
            orders_by_day: by_day
                .into_iter()
                .map(|(date, (count, revenue))| DayBucket {
                    date,
                    count,
                    revenue,
                })
                .collect(),
            top_products,
        })
    }
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryCarts {
    cleared: Arc<Mutex<Vec<Uuid>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryCarts {
    pub fn cleared(&self) -> Vec<Uuid> {
        self.cleared.lock().unwrap().clone()
    }

    pub fn fail_clears(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl CartRepository for InMemoryCarts {
    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("cart store unavailable".to_string()));
        }
        self.cleared.lock().unwrap().push(user_id);
        Ok(())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub struct Harness {
    pub service: OrderService,
    pub catalog: InMemoryCatalog,
    pub orders: InMemoryOrders,
    pub carts: InMemoryCarts,
    pub signer: HmacSignatureVerifier,
}

impl Harness {
    pub fn new() -> Self {
        let catalog = InMemoryCatalog::default();
        let orders = InMemoryOrders::default();
        let carts = InMemoryCarts::default();
        let signer = HmacSignatureVerifier::new(TEST_GATEWAY_SECRET);
        let service = OrderService::new(
            Arc::new(orders.clone()),
            Arc::new(catalog.clone()),
            Arc::new(carts.clone()),
            Arc::new(signer.clone()),
        );
        Self {
            service,
            catalog,
            orders,
            carts,
            signer,
        }
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".to_string(),
        phone: "+44 20 7946 0000".to_string(),
        street: "12 Analytical Row".to_string(),
        city: "London".to_string(),
        state: "Greater London".to_string(),
        zip_code: "NW1 6XE".to_string(),
    }
}

pub fn checkout(items: &[(Uuid, i64)]) -> PlaceOrder {
    PlaceOrder {
        items: items
            .iter()
            .map(|(product, quantity)| RequestedItem {
                product: product.to_string(),
                quantity: *quantity,
            })
            .collect(),
        payment_method: "card".to_string(),
        shipping_address: Some(address()),
        notes: None,
    }
}
