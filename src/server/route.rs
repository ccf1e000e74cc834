use crate::model::ConnectParams;
use crate::server::{websocket_listener, ConnectionHandler, RenderShell};
use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const CONNECT_PATH: &str = "/connect";

#[derive(Clone)]
pub struct AppState {
    pub connection_handler: ConnectionHandler,
    pub shell: Arc<dyn RenderShell>,
}

#[instrument(skip(connection_handler, shell))]
pub fn create_router(connection_handler: ConnectionHandler, shell: Arc<dyn RenderShell>) -> Router {
    debug!("Creating relay routes");
    Router::new()
        .route(CONNECT_PATH, any(connect))
        .route("/", get(page))
        .route("/script.js", get(script))
        .fallback(not_found)
        .with_state(AppState {
            connection_handler,
            shell,
        })
}

async fn connect(
    State(state): State<AppState>,
    query: Result<Query<ConnectParams>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(%rejection, "Rejecting connect request");
            return (StatusCode::BAD_REQUEST, "Upgrade failed").into_response();
        }
    };

    let identity = match query {
        Ok(Query(params)) => params.identity(),
        Err(rejection) => {
            debug!(%rejection, "Unreadable connect query, continuing without identity");
            None
        }
    };

    websocket_listener::handle_websocket(ws, identity, state.connection_handler)
}

async fn page(State(state): State<AppState>) -> Html<String> {
    Html(state.shell.page().to_owned())
}

async fn script(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        state.shell.script().to_owned(),
    )
        .into_response()
}

async fn not_found(State(state): State<AppState>) -> Response {
    (StatusCode::NOT_FOUND, Html(state.shell.not_found().to_owned())).into_response()
}
