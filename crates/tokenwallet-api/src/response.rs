//! Response envelope and error → HTTP status mapping.
//!
//! Every response body is `{success, message, data?}`. Failures carry the
//! error's plain-language message; operator detail goes to the log only.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokenwallet_types::{ErrorKind, WalletError};
use tracing::{error, warn};

/// The `{success, message, data?}` wrapper.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

/// Handler error: a [`WalletError`] rendered as an envelope.
#[derive(Debug)]
pub struct ApiError(pub WalletError);

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        Self(err)
    }
}

pub type ApiResult<T> = std::result::Result<Json<Envelope<T>>, ApiError>;

/// HTTP status for a wallet error.
#[must_use]
pub fn status_for(err: &WalletError) -> StatusCode {
    match err {
        WalletError::InvalidAmount { .. }
        | WalletError::InvalidRequest { .. }
        | WalletError::SelfTransfer(_) => StatusCode::BAD_REQUEST,
        WalletError::Unauthenticated => StatusCode::UNAUTHORIZED,
        WalletError::RecipientNotFound { .. }
        | WalletError::WalletNotFound(_)
        | WalletError::UserNotFound(_) => StatusCode::NOT_FOUND,
        WalletError::InsufficientBalance { .. }
        | WalletError::NoFundsAvailable { .. }
        | WalletError::DuplicateSubmission { .. }
        | WalletError::WalletExists(_)
        | WalletError::AddressInUse(_)
        | WalletError::EmailInUse(_) => StatusCode::CONFLICT,
        WalletError::Network(_) => StatusCode::BAD_GATEWAY,
        WalletError::BalanceOverflow(_)
        | WalletError::SupplyInvariantViolation { .. }
        | WalletError::Internal(_)
        | WalletError::Configuration(_)
        | WalletError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let kind = self.0.kind();
        if kind == ErrorKind::Unexpected || status.is_server_error() {
            error!(error = %self.0, %kind, "request failed");
        } else {
            warn!(error = %self.0, %kind, "request rejected");
        }
        let body = Envelope::<()> {
            success: false,
            message: self.0.user_message(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
