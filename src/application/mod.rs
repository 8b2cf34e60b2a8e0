pub mod order_service;
pub mod reservation;
#[cfg(test)]
pub mod testing;
