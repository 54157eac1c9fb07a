//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::audits::Orchestrator;
use crate::kernel::{
    BaseCrawlerUnit, BaseSnapshotStore, HttpCrawlerUnit, HttpSnapshotStore, NoopSnapshotStore,
    ServerDeps,
};
use crate::server::mcp::{self, McpSessions};
use crate::server::middleware::bearer_auth_middleware;
use crate::server::routes::{
    get_handler, health_handler, issues_handler, list_handler, pages_handler, poll_handler,
    query_handler, submit_handler,
};
use crate::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub orchestrator: Arc<Orchestrator>,
    pub api_token: String,
    pub mcp_sessions: McpSessions,
}

/// Build the Axum application router from loaded configuration.
pub fn build_app(pool: PgPool, config: &Config) -> anyhow::Result<Router> {
    let crawler: Arc<dyn BaseCrawlerUnit> = Arc::new(HttpCrawlerUnit::new(
        config.crawler_base_url.clone(),
        config.crawler_timeout_secs,
    )?);

    let snapshots: Arc<dyn BaseSnapshotStore> = match &config.snapshot_base_url {
        Some(base_url) => Arc::new(HttpSnapshotStore::new(
            base_url.clone(),
            config.snapshot_token.clone(),
        )),
        None => {
            tracing::warn!("SNAPSHOT_BASE_URL not set, page snapshots disabled");
            Arc::new(NoopSnapshotStore)
        }
    };

    let deps = ServerDeps::new(
        pool.clone(),
        crawler,
        snapshots,
        config.default_max_pages,
        config.default_max_depth,
    );

    Ok(build_app_with_deps(deps, config.api_token.clone()))
}

/// Build the router from explicit dependencies. Tests inject fakes here.
pub fn build_app_with_deps(deps: ServerDeps, api_token: String) -> Router {
    let pool = deps.db_pool.clone();
    let orchestrator = Arc::new(Orchestrator::new(deps));

    let app_state = AppState {
        db_pool: pool,
        orchestrator,
        api_token: api_token.clone(),
        mcp_sessions: McpSessions::new(),
    };

    // CORS: the API serves agents and dashboards on other origins
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    // Data-plane REST routes, all behind the shared-secret bearer check
    let api = Router::new()
        .route("/audits", post(submit_handler).get(list_handler))
        .route("/audits/:job_id", get(get_handler))
        .route("/audits/:job_id/poll", get(poll_handler))
        .route("/audits/:job_id/issues", get(issues_handler))
        .route("/audits/:job_id/pages", get(pages_handler))
        .route("/query", post(query_handler))
        .route_layer(middleware::from_fn(move |req, next| {
            bearer_auth_middleware(api_token.clone(), req, next)
        }));

    // Tool-protocol routes carry the token in the path and check it
    // themselves (agent SSE clients cannot set headers)
    let tool_protocol = Router::new()
        .route("/mcp/:token", post(mcp::routes::rpc_handler))
        .route("/mcp/:token/sse", get(mcp::routes::sse_handler))
        .route("/mcp/:token/message", post(mcp::routes::message_handler));

    Router::new()
        .nest("/api", api)
        .merge(tool_protocol)
        // Health check (unauthenticated liveness)
        .route("/health", get(health_handler))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
