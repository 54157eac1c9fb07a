// Business domains
pub mod audits;
