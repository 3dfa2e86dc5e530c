use crate::prelude::{eprintln, *};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

const MESSAGE_PATH: &str = "/message";

pub async fn run_sse(options: super::cli::SseOptions, global: crate::Global) -> Result<()> {
    let addr = format!("{}:{}", options.host, options.port);

    if global.verbose {
        eprintln!("Starting confluence-mcp with SSE transport on {addr}...");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app_router = router(Arc::new(global.clone())).layer(cors);

    if global.verbose {
        eprintln!("MCP server listening on http://{addr}");
        eprintln!("SSE endpoint: http://{addr}/sse");
        eprintln!("Message endpoint: http://{addr}{MESSAGE_PATH}");
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

fn router(global: Arc<crate::Global>) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .route(MESSAGE_PATH, post(message_handler))
        .with_state(global)
}

/// Announce where clients should POST their JSON-RPC messages
async fn sse_handler(
    State(_global): State<Arc<crate::Global>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::once(async { Ok(Event::default().event("endpoint").data(MESSAGE_PATH)) });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn message_handler(
    State(global): State<Arc<crate::Global>>,
    Json(request): Json<serde_json::Value>,
) -> Response {
    let request_str = request.to_string();
    match super::handle_request(&request_str, &global).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tests::empty_global;

    /// Serve the router on an ephemeral port and return its base URL
    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(empty_global())))
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_sse_announces_message_endpoint_first() {
        let base = spawn_server().await;

        let mut response = reqwest::get(format!("{base}/sse")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream")));

        let first = response.chunk().await.unwrap().unwrap();
        let first = String::from_utf8_lossy(&first);
        assert!(first.contains("event: endpoint"), "{first}");
        assert!(first.contains(&format!("data: {MESSAGE_PATH}")), "{first}");
    }

    #[tokio::test]
    async fn test_notification_post_is_accepted_without_body() {
        let base = spawn_server().await;

        let response = reqwest::Client::new()
            .post(format!("{base}{MESSAGE_PATH}"))
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        assert!(response.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_post_returns_json_rpc_response() {
        let base = spawn_server().await;

        let response = reqwest::Client::new()
            .post(format!("{base}{MESSAGE_PATH}"))
            .json(&serde_json::json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["id"], 3);
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 5);
    }
}
