//! WebSocket gateway for devloop.
//!
//! Each connection to `/ws` becomes a [`Session`]: the client starts
//! tasks, chats with the running agent, and receives every event the
//! agent records. `/health` reports liveness and the registered agent
//! kinds.
//!
//! Built on Axum.

pub mod message;
pub mod session;
pub mod ws;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::{IntoResponse, Json},
    routing::get,
};
use devloop_config::AppConfig;
use devloop_core::AgentRegistry;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, info, info_span};

pub use message::{ClientMessage, NO_AGENT, ServerMessage};
pub use session::{Session, SessionContext, SessionState, Transport};
pub use ws::WebSocketTransport;

type SharedContext = Arc<SessionContext>;

/// Build the Axum router with all gateway routes.
pub fn build_router(context: SharedContext) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(context)
}

/// Start the gateway server.
///
/// The backend and the registry are built once and shared by every
/// session.
pub async fn start(config: AppConfig, registry: AgentRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let backend = devloop_providers::build_from_config(&config)?;
    let context = Arc::new(SessionContext {
        config,
        registry: Arc::new(registry),
        backend,
    });
    let app = build_router(context);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    agents: Vec<String>,
}

async fn health_handler(State(context): State<SharedContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        agents: context.registry.names(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(context): State<SharedContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let session = Session::new(WebSocketTransport::new(socket), context);
        let span = info_span!("session", session_id = %session.id());
        session.run().instrument(span).await;
    })
}
