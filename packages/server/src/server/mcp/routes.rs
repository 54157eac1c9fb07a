//! HTTP endpoints for the tool protocol.
//!
//! The shared secret rides in the path (agent clients cannot always set
//! headers); a bad token is rejected with 403 before any business logic.
//!
//! Single exchange: `POST /mcp/{token}` with a JSON-RPC body.
//! Server push: `GET /mcp/{token}/sse` opens a session and streams
//! responses; requests arrive via `POST /mcp/{token}/message?session_id=`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use super::protocol::{self, JsonRpcRequest, JsonRpcResponse};
use super::tools;
use crate::server::app::AppState;

/// Open server-push sessions, keyed by session id. Each holds the sender
/// half of the SSE response channel. Entries are removed when the SSE
/// stream is dropped (client disconnect) or when a send fails.
#[derive(Clone, Default)]
pub struct McpSessions {
    inner: Arc<Mutex<HashMap<Uuid, mpsc::Sender<JsonRpcResponse>>>>,
}

impl McpSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, session_id: Uuid, sender: mpsc::Sender<JsonRpcResponse>) {
        self.inner.lock().unwrap().insert(session_id, sender);
    }

    fn sender(&self, session_id: Uuid) -> Option<mpsc::Sender<JsonRpcResponse>> {
        self.inner.lock().unwrap().get(&session_id).cloned()
    }

    fn close(&self, session_id: Uuid) {
        self.inner.lock().unwrap().remove(&session_id);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// Removes the session from the map when the SSE stream it rides in is
/// dropped, so abandoned connections cannot leak senders.
struct SessionGuard {
    sessions: McpSessions,
    session_id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::info!(session_id = %self.session_id, "Tool-protocol session closed");
        self.sessions.close(self.session_id);
    }
}

/// Response leg of a server-push session. Holding the guard inside the
/// stream ties the session's lifetime to the SSE connection.
fn message_stream(
    sessions: McpSessions,
    session_id: Uuid,
    receiver: mpsc::Receiver<JsonRpcResponse>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = SessionGuard {
        sessions,
        session_id,
    };

    ReceiverStream::new(receiver).map(move |response| {
        let _session = &guard;
        Ok(Event::default()
            .event("message")
            .data(serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())))
    })
}

fn check_token(state: &AppState, token: &str) -> Result<(), Response> {
    if token == state.api_token {
        Ok(())
    } else {
        tracing::debug!("Rejected tool-protocol call with bad path token");
        Err((
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "invalid token" })),
        )
            .into_response())
    }
}

/// POST /mcp/{token} — single-exchange transport.
pub async fn rpc_handler(
    Extension(state): Extension<AppState>,
    Path(token): Path<String>,
    body: String,
) -> Response {
    if let Err(rejection) = check_token(&state, &token) {
        return rejection;
    }

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                None,
                protocol::PARSE_ERROR,
                format!("invalid JSON-RPC request: {e}"),
            ))
            .into_response()
        }
    };

    Json(tools::dispatch(&state, request).await).into_response()
}

/// GET /mcp/{token}/sse — server-push transport.
///
/// Emits an `endpoint` event naming the message URL for this session,
/// then streams each dispatched response as a `message` event.
pub async fn sse_handler(
    Extension(state): Extension<AppState>,
    Path(token): Path<String>,
) -> Response {
    if let Err(rejection) = check_token(&state, &token) {
        return rejection;
    }

    let session_id = Uuid::new_v4();
    let (sender, receiver) = mpsc::channel::<JsonRpcResponse>(32);
    state.mcp_sessions.open(session_id, sender);

    tracing::info!(session_id = %session_id, "Tool-protocol session opened");

    let endpoint = stream::once(async move {
        Ok::<_, Infallible>(
            Event::default()
                .event("endpoint")
                .data(format!("/mcp/{token}/message?session_id={session_id}")),
        )
    });

    let messages = message_stream(state.mcp_sessions.clone(), session_id, receiver);

    Sse::new(endpoint.chain(messages))
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[derive(Deserialize)]
pub struct MessageQuery {
    pub session_id: Option<Uuid>,
}

/// POST /mcp/{token}/message — request leg of the server-push transport.
pub async fn message_handler(
    Extension(state): Extension<AppState>,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    if let Err(rejection) = check_token(&state, &token) {
        return rejection;
    }

    let Some(session_id) = query.session_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "session_id is required" })),
        )
            .into_response();
    };

    let Some(sender) = state.mcp_sessions.sender(session_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "unknown session" })),
        )
            .into_response();
    };

    let response = match serde_json::from_str::<JsonRpcRequest>(&body) {
        Ok(request) => tools::dispatch(&state, request).await,
        Err(e) => JsonRpcResponse::error(
            None,
            protocol::PARSE_ERROR,
            format!("invalid JSON-RPC request: {e}"),
        ),
    };

    if sender.send(response).await.is_err() {
        // Client hung up; drop the session.
        state.mcp_sessions.close(session_id);
        return (
            StatusCode::GONE,
            Json(serde_json::json!({ "error": "session closed" })),
        )
            .into_response();
    }

    StatusCode::ACCEPTED.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_the_stream_closes_the_session() {
        let sessions = McpSessions::new();
        let session_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel::<JsonRpcResponse>(32);
        sessions.open(session_id, sender);
        assert_eq!(sessions.len(), 1);

        let stream = message_stream(sessions.clone(), session_id, receiver);
        assert!(sessions.sender(session_id).is_some());

        // An abandoned connection drops the stream without a send ever
        // failing; the session entry must not outlive it.
        drop(stream);
        assert!(sessions.sender(session_id).is_none());
        assert_eq!(sessions.len(), 0);
    }

    #[tokio::test]
    async fn messages_flow_until_the_client_disconnects() {
        let sessions = McpSessions::new();
        let session_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel::<JsonRpcResponse>(32);
        sessions.open(session_id, sender);

        let mut stream = Box::pin(message_stream(sessions.clone(), session_id, receiver));

        let live_sender = sessions.sender(session_id).unwrap();
        live_sender
            .send(JsonRpcResponse::success(None, serde_json::json!({"ok": true})))
            .await
            .unwrap();

        assert!(stream.next().await.is_some());

        drop(stream);
        assert!(sessions.sender(session_id).is_none());
    }
}
