use axum::{Json, http::StatusCode, response::IntoResponse};
use ledger::LedgerError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

#[cfg(test)]
mod api_tests;
mod menu;
mod orders;
mod server;
mod students;
mod topups;
mod user;
mod wallet;

pub mod types {
    pub mod menu {
        pub use api_types::menu::{MenuItemNew, MenuItemUpdate, MenuItemView, MenuResponse};
    }

    pub mod student {
        pub use api_types::student::{StudentLink, StudentNew, StudentView, StudentsResponse};
    }

    pub mod order {
        pub use api_types::order::{
            OrderLineNew, OrderLineView, OrderNew, OrderStatusUpdate, OrderView, OrdersResponse,
        };
    }

    pub mod topup {
        pub use api_types::topup::{TopupNew, TopupView, TopupsResponse};
    }

    pub mod wallet {
        pub use api_types::wallet::{
            TransactionView, TransactionsResponse, WalletAudit, WalletView,
        };
    }
}

pub enum ServerError {
    Ledger(LedgerError),
    Forbidden(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::ExistingKey(_) | LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::TransientFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LedgerError::InsufficientFunds(_)
        | LedgerError::AmountMismatch(_)
        | LedgerError::InvalidState(_)
        | LedgerError::InvalidTransition(_)
        | LedgerError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Ledger(err) => {
                (status_for_ledger_error(&err), message_for_ledger_error(err))
            }
            ServerError::Forbidden(err) => (StatusCode::FORBIDDEN, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let res = ServerError::from(LedgerError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_kinds_map_to_409() {
        let res = ServerError::from(LedgerError::Conflict("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let res = ServerError::from(LedgerError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn transient_maps_to_503() {
        let res =
            ServerError::from(LedgerError::TransientFailure("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn validation_kinds_map_to_422() {
        for err in [
            LedgerError::InsufficientFunds("x".to_string()),
            LedgerError::AmountMismatch("x".to_string()),
            LedgerError::InvalidState("x".to_string()),
            LedgerError::InvalidTransition("x".to_string()),
            LedgerError::InvalidAmount("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn forbidden_maps_to_403() {
        let res = ServerError::Forbidden("forbidden".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
