// HTTP routes
pub mod audits;
pub mod health;
pub mod query;

pub use audits::*;
pub use health::*;
pub use query::*;
