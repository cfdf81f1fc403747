//! HTTP routes for the wallet API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokenwallet_ledger::{RequestContext, WalletService};
use tokenwallet_types::{
    Amount, ExchangeDirection, RecentRecipient, ServerConfig, Transaction, TransactionType,
    UserId, UserProfile, UserSearchResult, WalletError, WalletView, constants,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{self, Authenticator, StaticTokens};
use crate::response::{ApiError, ApiResult, Envelope};

/// Header carrying the client's idempotency key on mutating requests.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WalletService>,
    pub auth: Arc<dyn Authenticator>,
    pub internal_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        service: Arc<WalletService>,
        auth: Arc<dyn Authenticator>,
        internal_token: Option<&str>,
    ) -> Self {
        Self {
            service,
            auth,
            internal_token: internal_token.map(Arc::from),
        }
    }

    /// State using the configured static tokens.
    pub fn from_config(service: Arc<WalletService>, config: &ServerConfig) -> Self {
        Self::new(
            service,
            Arc::new(StaticTokens::new(&config.tokens)),
            config.internal_token.as_deref(),
        )
    }

    fn context(&self, headers: &HeaderMap) -> Result<RequestContext, ApiError> {
        let principal = auth::principal(self.auth.as_ref(), headers)?;
        let ctx = RequestContext::new(principal);
        Ok(match headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            Some(key) => ctx.with_idempotency_key(key),
            None => ctx,
        })
    }

    fn require_internal(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        auth::require_internal(self.internal_token.as_deref(), headers)?;
        Ok(())
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/search", get(search_users))
        .route("/wallet/validate-address", get(validate_address))
        .route("/wallet/balance", get(balance))
        .route("/wallet/send", post(send))
        .route("/wallet/exchange/to-sendable", post(exchange_to_sendable))
        .route("/wallet/exchange/to-non-sendable", post(exchange_to_non_sendable))
        .route("/wallet/recent-recipients", get(recent_recipients))
        .route("/wallet/transactions", get(transactions))
        .route("/internal/users", post(register_user))
        .route("/internal/rewards", post(credit_reward))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default, alias = "query")]
    q: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct AddressQuery {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    #[serde(alias = "recipient", alias = "recipientAddress")]
    recipient_email: String,
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Deserialize)]
struct ExchangeBody {
    #[serde(default)]
    amount: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewardRequest {
    user_id: UserId,
    kind: TransactionType,
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    user_id: Option<UserId>,
    email: String,
    first_name: String,
    last_name: String,
}

fn bad_json(rejection: &JsonRejection) -> ApiError {
    warn!(detail = %rejection.body_text(), "rejected request body");
    ApiError(WalletError::InvalidRequest {
        reason: "the request body is missing or malformed".into(),
    })
}

fn bad_query(rejection: &QueryRejection) -> ApiError {
    warn!(detail = %rejection.body_text(), "rejected query string");
    ApiError(WalletError::InvalidRequest {
        reason: "the query parameters are invalid".into(),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> ApiResult<Value> {
    Ok(Envelope::ok(
        "ok",
        json!({"service": constants::SERVICE_NAME, "version": constants::VERSION}),
    ))
}

async fn search_users(
    State(s): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Vec<UserSearchResult>> {
    let ctx = s.context(&headers)?;
    let Query(q) = query.map_err(|r| bad_query(&r))?;
    let results = s.service.search_users(&ctx, &q.q, q.limit);
    Ok(Envelope::ok(format!("{} users found", results.len()), results))
}

async fn validate_address(
    State(s): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> ApiResult<UserSearchResult> {
    let ctx = s.context(&headers)?;
    let Query(q) = query.map_err(|r| bad_query(&r))?;
    let user = s.service.validate_address(&ctx, &q.address)?;
    Ok(Envelope::ok("Address is valid", user))
}

async fn balance(State(s): State<AppState>, headers: HeaderMap) -> ApiResult<WalletView> {
    let ctx = s.context(&headers)?;
    Ok(Envelope::ok("Balance retrieved", s.service.balance(&ctx)?))
}

async fn send(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<Transaction> {
    let ctx = s.context(&headers)?;
    let Json(req) = body.map_err(|r| bad_json(&r))?;
    let amount = match Amount::positive_from_json(&req.amount) {
        Ok(amount) => amount,
        Err(err) => {
            // An unknown recipient or a self-send is reported before the amount.
            s.service.resolve_recipient(&ctx, &req.recipient_email)?;
            return Err(err.into());
        }
    };
    let tx = s
        .service
        .send(&ctx, &req.recipient_email, amount, req.memo.as_deref())?;
    Ok(Envelope::ok(format!("Sent {} tokens", tx.amount), tx))
}

async fn exchange_to_sendable(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ExchangeBody>, JsonRejection>,
) -> ApiResult<Transaction> {
    exchange(&s, &headers, body, ExchangeDirection::ToSendable)
}

async fn exchange_to_non_sendable(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ExchangeBody>, JsonRejection>,
) -> ApiResult<Transaction> {
    exchange(&s, &headers, body, ExchangeDirection::ToNonSendable)
}

fn exchange(
    s: &AppState,
    headers: &HeaderMap,
    body: Result<Json<ExchangeBody>, JsonRejection>,
    direction: ExchangeDirection,
) -> ApiResult<Transaction> {
    let ctx = s.context(headers)?;
    let Json(req) = body.map_err(|r| bad_json(&r))?;
    let amount = Amount::positive_from_json(&req.amount)?;
    let tx = s.service.exchange(&ctx, direction, amount)?;
    Ok(Envelope::ok(format!("Exchanged {} tokens", tx.amount), tx))
}

async fn recent_recipients(
    State(s): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Vec<RecentRecipient>> {
    let ctx = s.context(&headers)?;
    let Query(q) = query.map_err(|r| bad_query(&r))?;
    let recipients = s.service.recent_recipients(&ctx, q.limit);
    Ok(Envelope::ok("Recent recipients retrieved", recipients))
}

async fn transactions(
    State(s): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Vec<Transaction>> {
    let ctx = s.context(&headers)?;
    let Query(q) = query.map_err(|r| bad_query(&r))?;
    Ok(Envelope::ok("Transactions retrieved", s.service.history(&ctx, q.limit)))
}

async fn register_user(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    s.require_internal(&headers)?;
    let Json(req) = body.map_err(|r| bad_json(&r))?;
    let id = req.user_id.unwrap_or_else(UserId::new);
    let profile = s
        .service
        .register_user_with_id(id, &req.email, &req.first_name, &req.last_name)?;
    Ok(Envelope::ok("User registered", profile))
}

async fn credit_reward(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RewardRequest>, JsonRejection>,
) -> ApiResult<Transaction> {
    s.require_internal(&headers)?;
    let Json(req) = body.map_err(|r| bad_json(&r))?;
    let amount = Amount::positive_from_json(&req.amount)?;
    let tx = s
        .service
        .credit_reward(req.user_id, req.kind, amount, req.description)?;
    Ok(Envelope::ok("Reward credited", tx))
}
