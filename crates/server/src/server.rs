use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use uuid::Uuid;

use std::sync::Arc;

use crate::{ServerError, TokenIssuer, auth, coins, health, info, merch};
use ledger::Ledger;

#[derive(Clone)]
pub struct ServerState {
    pub ledger: Arc<Ledger>,
    pub tokens: Arc<TokenIssuer>,
}

/// The caller, as proven by their bearer token.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub id: Uuid,
}

async fn require_bearer(
    State(state): State<ServerState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Ok(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ServerError::Unauthorized(
            "missing bearer token".to_string(),
        ));
    };
    let id = state.tokens.verify(bearer.token())?;

    request.extensions_mut().insert(AuthUser { id });
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/api/info", get(info::info))
        .route("/api/sendCoin", post(coins::send_coin))
        .route("/api/buy/{item}", get(merch::buy))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/api/auth", post(auth::authenticate))
        .route("/healthcheck", get(health::healthcheck))
        .merge(protected)
        .with_state(state)
}

pub async fn run(ledger: Ledger, tokens: TokenIssuer, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    run_with_listener(ledger, tokens, listener).await
}

pub async fn run_with_listener(
    ledger: Ledger,
    tokens: TokenIssuer,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        ledger: Arc::new(ledger),
        tokens: Arc::new(tokens),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    ledger: Ledger,
    tokens: TokenIssuer,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(ledger, tokens, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
