use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Nullable, Timestamptz};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, StatusChange, StatusGuard};
use crate::domain::ports::OrderRepository;
use crate::domain::query::{DateWindow, ListResult, OrderFilter, OrderStatistics, Page, RevenueSummary};
use crate::domain::status::{DeliveryStatus, PaymentStatus};
use crate::schema::{order_items, orders};

use super::models::{
    DayBucketRow, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow, OrderStatusChangeset,
    StatusBucketRow, TopProductRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

const GATEWAY_PAYMENT_INDEX: &str = "idx_orders_gateway_payment_id";

/// Maps a clash on the gateway payment index to `DuplicatePayment`.
fn payment_conflict(err: DieselError, change: &StatusChange) -> DomainError {
    let clash = matches!(
        &err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(GATEWAY_PAYMENT_INDEX)
    );
    match change.gateway.as_ref().and_then(|g| g.payment_id.clone()) {
        Some(payment_id) if clash => DomainError::DuplicatePayment(payment_id),
        _ => err.into(),
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn filtered<'a>(filter: &OrderFilter) -> orders::BoxedQuery<'a, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(orders::user_id.eq(user_id));
    }
    if let Some(status) = filter.delivery_status {
        query = query.filter(orders::delivery_status.eq(status.as_str()));
    }
    if let Some(status) = filter.payment_status {
        query = query.filter(orders::payment_status.eq(status.as_str()));
    }
    if let Some(from) = filter.created_from {
        query = query.filter(orders::created_at.ge(from));
    }
    if let Some(to) = filter.created_to {
        query = query.filter(orders::created_at.le(to));
    }
    query
}

fn load_items(conn: &mut PgConnection, row: &OrderRow) -> QueryResult<Vec<OrderItemRow>> {
    OrderItemRow::belonging_to(row)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)
}

fn with_items(conn: &mut PgConnection, row: Option<OrderRow>) -> Result<Option<Order>, DomainError> {
    match row {
        Some(row) => {
            let items = load_items(conn, &row)?;
            Ok(Some(row.into_order(items)?))
        }
        None => Ok(None),
    }
}

const WINDOW: &str =
    "($1::timestamptz IS NULL OR o.created_at >= $1) AND ($2::timestamptz IS NULL OR o.created_at <= $2)";

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order_id = Uuid::new_v4();
            let address = order.shipping_address;
            let row = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id: order.user_id,
                    total_amount: order.total_amount,
                    discount_amount: order.discount_amount,
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    delivery_status: DeliveryStatus::Pending.as_str().to_string(),
                    payment_method: order.payment_method,
                    shipping_name: address.name,
                    shipping_phone: address.phone,
                    shipping_street: address.street,
                    shipping_city: address.city,
                    shipping_state: address.state,
                    shipping_zip_code: address.zip_code,
                    notes: order.notes,
                    created_at: order.created_at,
                    updated_at: order.created_at,
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let new_items: Vec<NewOrderItemRow> = order
                .items
                .into_iter()
                .zip(0..)
                .map(|(item, position)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    position,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                    discount: item.discount,
                    final_price: item.final_price,
                    name: item.name,
                    image: item.image,
                })
                .collect();
            let mut items: Vec<OrderItemRow> = diesel::insert_into(order_items::table)
                .values(&new_items)
                .returning(OrderItemRow::as_returning())
                .get_results(conn)?;
            items.sort_by_key(|item| item.position);

            row.into_order(items)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        with_items(&mut conn, row)
    }

    fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::id.eq(id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        with_items(&mut conn, row)
    }

    fn list(&self, filter: &OrderFilter, page: Page) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter).count().get_result(conn)?;

            let rows: Vec<OrderRow> = filtered(filter)
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .order(order_items::position.asc())
                .load::<OrderItemRow>(conn)?
                .grouped_by(&rows);

            let orders = rows
                .into_iter()
                .zip(items)
                .map(|(row, items)| row.into_order(items))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult {
                items: orders,
                total,
            })
        })
    }

    fn transition(
        &self,
        guard: &StatusGuard,
        change: &StatusChange,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut update = diesel::update(orders::table)
                .set(OrderStatusChangeset::from(change))
                .into_boxed::<Pg>()
                .filter(orders::id.eq(guard.order_id));
            if let Some(user_id) = guard.user_id {
                update = update.filter(orders::user_id.eq(user_id));
            }
            if let Some(status) = guard.delivery_status {
                update = update.filter(orders::delivery_status.eq(status.as_str()));
            }
            if let Some(status) = guard.payment_status {
                update = update.filter(orders::payment_status.eq(status.as_str()));
            }

            let row = update
                .returning(OrderRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| payment_conflict(e, change))?;
            with_items(conn, row)
        })
    }

    fn payment_recorded_elsewhere(
        &self,
        gateway_payment_id: &str,
        except: Uuid,
    ) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let clashes: i64 = orders::table
            .filter(orders::gateway_payment_id.eq(gateway_payment_id))
            .filter(orders::id.ne(except))
            .count()
            .get_result(&mut conn)?;
        Ok(clashes > 0)
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(orders::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn revenue_summary(&self, filter: &OrderFilter) -> Result<RevenueSummary, DomainError> {
        let mut conn = self.pool.get()?;

        let (revenue, discount): (Option<BigDecimal>, Option<BigDecimal>) = filtered(filter)
            .filter(orders::payment_status.eq(PaymentStatus::Completed.as_str()))
            .select((sum(orders::total_amount), sum(orders::discount_amount)))
            .get_result(&mut conn)?;

        Ok(RevenueSummary {
            total_revenue: revenue.unwrap_or_else(|| BigDecimal::from(0)),
            total_discount: discount.unwrap_or_else(|| BigDecimal::from(0)),
        })
    }

    fn statistics(&self, window: DateWindow, top_n: i64) -> Result<OrderStatistics, DomainError> {
        let mut conn = self.pool.get()?;
        let (start, end): (Option<DateTime<Utc>>, Option<DateTime<Utc>>) =
            (window.start, window.end);

        let by_status: Vec<StatusBucketRow> = diesel::sql_query(format!(
            "SELECT o.delivery_status AS status, COUNT(*) AS count, \
             COALESCE(SUM(o.total_amount), 0) AS revenue \
             FROM orders o WHERE {WINDOW} \
             GROUP BY o.delivery_status ORDER BY o.delivery_status"
        ))
        .bind::<Nullable<Timestamptz>, _>(start)
        .bind::<Nullable<Timestamptz>, _>(end)
        .load(&mut conn)?;

        let by_day: Vec<DayBucketRow> = diesel::sql_query(format!(
            "SELECT to_char(o.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date, \
             COUNT(*) AS count, COALESCE(SUM(o.total_amount), 0) AS revenue \
             FROM orders o WHERE {WINDOW} \
             GROUP BY 1 ORDER BY 1"
        ))
        .bind::<Nullable<Timestamptz>, _>(start)
        .bind::<Nullable<Timestamptz>, _>(end)
        .load(&mut conn)?;

        let top_products: Vec<TopProductRow> = diesel::sql_query(format!(
            "SELECT i.product_id, COALESCE(MAX(p.name), MAX(i.name)) AS name, \
             SUM(i.quantity)::BIGINT AS total_quantity, \
             SUM(i.final_price * i.quantity) AS total_revenue \
             FROM order_items i \
             JOIN orders o ON o.id = i.order_id \
             LEFT JOIN products p ON p.id = i.product_id \
             WHERE {WINDOW} \
             GROUP BY i.product_id \
             ORDER BY total_quantity DESC, i.product_id \
             LIMIT $3"
        ))
        .bind::<Nullable<Timestamptz>, _>(start)
        .bind::<Nullable<Timestamptz>, _>(end)
        .bind::<BigInt, _>(top_n)
        .load(&mut conn)?;

        Ok(OrderStatistics {
            orders_by_status: by_status.into_iter().map(Into::into).collect(),
            orders_by_day: by_day.into_iter().map(Into::into).collect(),
            top_products: top_products.into_iter().map(Into::into).collect(),
        })
    }
}
