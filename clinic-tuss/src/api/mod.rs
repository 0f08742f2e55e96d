//! HTTP API handlers for clinic-tuss

pub mod codes;
pub mod health;
pub mod tuss;

pub use codes::code_routes;
pub use health::health_routes;
pub use tuss::tuss_routes;
