use api_types::error::ErrorResponse;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
};
use ledger::LedgerError;

pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};
pub use tokens::{Claims, TokenIssuer};

mod auth;
mod coins;
mod health;
mod info;
mod merch;
mod server;
mod tokens;

pub enum ServerError {
    Ledger(LedgerError),
    Unauthorized(String),
    BadRequest(String),
    Internal(String),
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
        LedgerError::DuplicateOwner(_) | LedgerError::DuplicateUsername(_) => StatusCode::CONFLICT,
        LedgerError::InvalidAmount(_) | LedgerError::InvalidInput(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LedgerError::Credential(_) | LedgerError::Storage(_) | LedgerError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::Credential(_) | LedgerError::Storage(_) | LedgerError::Database(_) => {
            tracing::error!("ledger failure: {err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, errors) = match self {
            ServerError::Ledger(err) => {
                (status_for_ledger_error(&err), message_for_ledger_error(err))
            }
            ServerError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err),
            ServerError::BadRequest(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Internal(err) => {
                tracing::error!("internal error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { errors })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}
