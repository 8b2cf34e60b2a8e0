use uuid::Uuid;

use super::errors::DomainError;
use super::order::{NewOrder, Order, StatusChange, StatusGuard};
use super::product::Product;
use super::query::{DateWindow, ListResult, OrderFilter, OrderStatistics, Page, RevenueSummary};

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, filter: &OrderFilter, page: Page) -> Result<ListResult, DomainError>;
    /// Single conditional update; `None` when the guard matched no row.
    fn transition(
        &self,
        guard: &StatusGuard,
        change: &StatusChange,
    ) -> Result<Option<Order>, DomainError>;
    /// Whether an order other than `except` already records this gateway
    /// payment id.
    fn payment_recorded_elsewhere(
        &self,
        gateway_payment_id: &str,
        except: Uuid,
    ) -> Result<bool, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    fn revenue_summary(&self, filter: &OrderFilter) -> Result<RevenueSummary, DomainError>;
    fn statistics(&self, window: DateWindow, top_n: i64) -> Result<OrderStatistics, DomainError>;
}

/// Stock counters live in the catalog. Every mutation is a single atomic
/// update; there is no read-modify-write path.
pub trait CatalogRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
    /// Decrements `stock` by `quantity` iff the product is active and has at
    /// least `quantity` units. Returns the updated product.
    fn conditional_decrement_stock(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Product>, DomainError>;
    fn increment_stock(&self, id: Uuid, quantity: i32) -> Result<Option<Product>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn clear(&self, user_id: Uuid) -> Result<(), DomainError>;
}

pub trait PaymentSignatureVerifier: Send + Sync + 'static {
    fn verify(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool;
}
