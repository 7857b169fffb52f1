use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{ChatError, INTERNAL_SERVER_ERROR};
use crate::protocol::{ChatRequest, ChatResponse, ErrorBody};

pub struct ChatServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl ChatServer {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!("outfit-chat listening on {addr}");

        axum::serve(listener, router(&self.config, self.dispatcher.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server failed")
    }
}

pub fn router(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(config.static_dir.join("index.html")))
        .route_service(
            "/loader.gif",
            ServeFile::new(config.static_dir.join("loader.gif")),
        )
        .route("/chat", post(chat_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

async fn chat_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ChatError> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|error| {
        warn!("rejected chat body: {error}");
        ChatError::Validation(error.to_string())
    })?;
    let Some(query) = request.query() else {
        return Err(ChatError::Validation("userInput missing or empty".to_string()));
    };

    match dispatcher.respond_to(query).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(error) => {
            error!("error in chat endpoint: {error}");
            Err(error)
        }
    }
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("chat handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: INTERNAL_SERVER_ERROR.to_string(),
        }),
    )
        .into_response()
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
