pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_service::OrderService;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::gateway::HmacSignatureVerifier;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type MigrationError = Box<dyn std::error::Error + Send + Sync>;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::list_user_orders,
        handlers::orders::get_user_order,
        handlers::orders::cancel_order,
        handlers::payments::verify_payment,
        handlers::admin::list_orders,
        handlers::admin::order_statistics,
        handlers::admin::get_order,
        handlers::admin::update_order_status,
        handlers::admin::delete_order,
    ),
    tags(
        (name = "orders", description = "Customer order placement and history"),
        (name = "payments", description = "Payment gateway callbacks"),
        (name = "admin", description = "Order administration and reporting"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), MigrationError> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Wires the Postgres-backed repositories and the HMAC verifier into an
/// `OrderService`.
pub fn diesel_order_service(pool: DbPool, gateway_secret: &str) -> OrderService {
    OrderService::new(
        Arc::new(DieselOrderRepository::new(pool.clone())),
        Arc::new(DieselCatalogRepository::new(pool.clone())),
        Arc::new(DieselCartRepository::new(pool)),
        Arc::new(HmacSignatureVerifier::new(gateway_secret)),
    )
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    service: OrderService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/orders",
            "/user/orders",
            "/user/orders/{id}",
            "/user/orders/{id}/cancel",
            "/cart/verifypayment",
            "/admin/orders",
            "/admin/orders/statistics",
            "/admin/orders/{id}",
            "/admin/orders/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
