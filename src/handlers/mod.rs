pub mod admin;
pub mod dto;
pub mod orders;
pub mod payments;

use actix_web::web;

use crate::errors::AppError;

/// Registers every route plus extractor configs that turn malformed
/// bodies, queries and path segments into `VALIDATION_ERROR` responses.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .route("/orders", web::post().to(orders::create_order))
    .route("/cart/verifypayment", web::post().to(payments::verify_payment))
    .service(
        web::scope("/user/orders")
            .route("", web::get().to(orders::list_user_orders))
            .route("/{id}", web::get().to(orders::get_user_order))
            .route("/{id}/cancel", web::patch().to(orders::cancel_order)),
    )
    .service(
        web::scope("/admin/orders")
            .route("", web::get().to(admin::list_orders))
            // Registered ahead of `/{id}` so it is not parsed as an order id.
            .route("/statistics", web::get().to(admin::order_statistics))
            .route("/{id}", web::get().to(admin::get_order))
            .route("/{id}", web::delete().to(admin::delete_order))
            .route("/{id}/status", web::patch().to(admin::update_order_status)),
    );
}
