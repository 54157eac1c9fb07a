// HTTP server setup (Axum REST + agent tool protocol)
pub mod app;
pub mod mcp;
pub mod middleware;
pub mod routes;

pub use app::*;
