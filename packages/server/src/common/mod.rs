// Common types shared across domains and transports

pub mod errors;

pub use errors::AppError;
