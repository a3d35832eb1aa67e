use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ws::{self, CloseFrame, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{future, SinkExt, StreamExt};
use http::{header, HeaderValue};
use shapeql_engine::{
    websocket::{Frame, Protocol, Session},
    CacheHint, Executor, Request, Response, ServerError, SessionConfig,
};
use tokio::{net::TcpListener, signal, sync::mpsc};
use tower_http::cors::CorsLayer;

use crate::Config;

#[derive(Clone)]
struct ServerState {
    executor: Executor,
    session: SessionConfig,
}

/// Builds the router serving queries and mutations on `graph.path` and subscriptions on
/// `graph.websocket_path`.
pub fn router(executor: Executor, config: &Config) -> Router {
    let state = ServerState {
        executor,
        session: config.session_config(),
    };

    Router::new()
        .route(&config.graph.path, get(execute_get).post(execute_post))
        .route(&config.graph.websocket_path, get(websocket))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the executor until the process receives Ctrl+C or a termination signal.
pub async fn serve(config: Config, executor: Executor) -> crate::Result<()> {
    let addr = config.network.listen_address;
    let app = router(executor, &config);

    let listener = TcpListener::bind(addr).await.map_err(crate::Error::Server)?;

    tracing::info!("GraphQL endpoint exposed at http://{addr}{}", config.graph.path);
    tracing::info!("Subscriptions exposed at ws://{addr}{}", config.graph.websocket_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown())
        .await
        .map_err(crate::Error::Server)
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetParams {
    query: String,
    operation_name: Option<String>,
    /// A JSON-encoded object.
    variables: Option<String>,
}

async fn execute_get(
    State(state): State<ServerState>,
    params: Result<Query<GetParams>, QueryRejection>,
) -> axum::response::Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return respond(rejected(rejection.body_text())),
    };

    let variables = match params.variables.as_deref().map(serde_json::from_str).transpose() {
        Ok(variables) => variables,
        Err(err) => return respond(rejected(format!("invalid variables: {err}"))),
    };

    let request = Request {
        query: params.query,
        operation_name: params.operation_name,
        variables,
    };

    respond(state.executor.execute(request).await)
}

async fn execute_post(
    State(state): State<ServerState>,
    request: Result<Json<Request>, JsonRejection>,
) -> axum::response::Response {
    match request {
        Ok(Json(request)) => respond(state.executor.execute(request).await),
        Err(rejection) => respond(rejected(rejection.body_text())),
    }
}

fn rejected(message: String) -> Response {
    Response {
        errors: vec![ServerError::new(message)],
        ..Default::default()
    }
}

/// Errors travel in the body, so the status is always 200. Only responses without errors carry
/// a cache header.
fn respond(response: Response) -> axum::response::Response {
    let cache_control = match response.cache {
        _ if !response.is_ok() => None,
        CacheHint::MaxAge(seconds) => Some(format!("max-age={seconds}")),
        CacheHint::NoCache => Some("no-cache".to_string()),
        CacheHint::Inherit => None,
    };

    let mut http_response = Json(&response).into_response();

    if let Some(value) = cache_control.and_then(|value| HeaderValue::from_str(&value).ok()) {
        http_response.headers_mut().insert(header::CACHE_CONTROL, value);
    }

    http_response
}

async fn websocket(State(state): State<ServerState>, upgrade: WebSocketUpgrade) -> impl IntoResponse {
    upgrade
        .protocols(Protocol::names())
        .on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: ServerState) {
    let protocol = Protocol::negotiate(socket.protocol().and_then(|value| value.to_str().ok()));
    tracing::debug!("websocket connection using {}", protocol.name());

    let (mut sink, stream) = socket.split();
    let (frames, mut outgoing) = mpsc::channel::<Frame>(16);

    let writer = tokio::spawn(async move {
        while let Some(frame) = outgoing.recv().await {
            let message = match frame {
                Frame::Text(text) => ws::Message::Text(text),
                Frame::Close { code, reason } => ws::Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
            };

            if let Err(err) = sink.send(message).await {
                tracing::debug!("websocket send failed: {err}");
                break;
            }
        }
    });

    // The session ends on a close frame or a transport error. Pings are answered by axum.
    let incoming = stream
        .take_while(|message| future::ready(!matches!(message, Ok(ws::Message::Close(_)) | Err(_))))
        .filter_map(|message| {
            future::ready(match message {
                Ok(ws::Message::Text(text)) => Some(text),
                Ok(ws::Message::Binary(bytes)) => String::from_utf8(bytes).ok(),
                _ => None,
            })
        })
        .boxed();

    Session::new(state.executor, protocol, state.session)
        .run(incoming, frames)
        .await;

    writer.await.ok();
}

async fn graceful_shutdown() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down gracefully...");
}
