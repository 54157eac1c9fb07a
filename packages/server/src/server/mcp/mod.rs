//! Agent tool-invocation protocol (JSON-RPC 2.0).
//!
//! Two sub-transports share one dispatch path: a single-exchange HTTP
//! POST endpoint and a server-push SSE variant. Both call the same
//! orchestrator and query gateway as the REST adapter; the only
//! difference is rendering.

pub mod protocol;
pub mod routes;
pub mod tools;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use routes::McpSessions;
