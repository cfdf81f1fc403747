//! Configuration types for the wallet core and the API server.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{Bucket, Result, UserId, WalletError, constants};

/// Which bucket a transfer recipient is credited in.
///
/// Received funds default to non-sendable: like mined rewards, they must be
/// exchanged before they can be sent on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceivePolicy {
    #[default]
    NonSendable,
    Sendable,
}

impl ReceivePolicy {
    #[must_use]
    pub fn bucket(self) -> Bucket {
        match self {
            Self::NonSendable => Bucket::NonSendable,
            Self::Sendable => Bucket::Sendable,
        }
    }
}

/// Tunables of the ledger core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalletConfig {
    /// Bucket credited on the recipient side of a transfer.
    pub receive_policy: ReceivePolicy,
    /// Prefix of wallet addresses (used for derivation and the address heuristic).
    pub address_prefix: String,
    /// Minimum length of a query treated as an address.
    pub min_address_len: usize,
    /// Search results returned when the caller gives no limit.
    pub default_search_limit: usize,
    /// Hard cap on search results.
    pub max_search_limit: usize,
    /// Shorter (trimmed) queries return nothing.
    pub min_search_query_len: usize,
    /// Number of idempotency keys remembered before the oldest is evicted.
    pub idempotency_cache_size: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            receive_policy: ReceivePolicy::default(),
            address_prefix: constants::DEFAULT_ADDRESS_PREFIX.to_string(),
            min_address_len: constants::DEFAULT_MIN_ADDRESS_LEN,
            default_search_limit: constants::DEFAULT_SEARCH_LIMIT,
            max_search_limit: constants::MAX_SEARCH_LIMIT,
            min_search_query_len: constants::MIN_SEARCH_QUERY_LEN,
            idempotency_cache_size: constants::IDEMPOTENCY_CACHE_SIZE,
        }
    }
}

impl WalletConfig {
    /// Reject configurations the core cannot run with.
    ///
    /// # Errors
    /// `Configuration` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.address_prefix.is_empty() {
            return Err(WalletError::Configuration("addressPrefix must not be empty".into()));
        }
        if self.min_address_len <= self.address_prefix.len() {
            return Err(WalletError::Configuration(
                "minAddressLen must exceed the address prefix length".into(),
            ));
        }
        if self.max_search_limit == 0 || self.default_search_limit == 0 {
            return Err(WalletError::Configuration("search limits must be positive".into()));
        }
        if self.default_search_limit > self.max_search_limit {
            return Err(WalletError::Configuration(
                "defaultSearchLimit must not exceed maxSearchLimit".into(),
            ));
        }
        if self.idempotency_cache_size == 0 {
            return Err(WalletError::Configuration("idempotencyCacheSize must be > 0".into()));
        }
        Ok(())
    }

    /// Clamp a caller-supplied search limit into `1..=max_search_limit`.
    #[must_use]
    pub fn search_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_search_limit)
            .clamp(1, self.max_search_limit)
    }
}

/// A bearer token accepted by the API, and the user it authenticates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    pub user_id: UserId,
}

/// Configuration for the API server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address to listen on for the REST API.
    pub listen_addr: SocketAddr,
    /// Server-side bound on every request.
    pub request_timeout_ms: u64,
    /// Ledger core tunables.
    pub wallet: WalletConfig,
    /// Static bearer tokens (stand-in for the external session service).
    pub tokens: Vec<TokenGrant>,
    /// Token the external reward engine presents on `/internal/*`.
    pub internal_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], constants::DEFAULT_API_PORT)),
            request_timeout_ms: constants::DEFAULT_REQUEST_TIMEOUT_MS,
            wallet: WalletConfig::default(),
            tokens: Vec::new(),
            internal_token: None,
        }
    }
}

impl ServerConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// `Configuration` if the JSON is malformed or fails validation.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw)
            .map_err(|e| WalletError::Configuration(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// `Configuration` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.wallet.validate()?;
        if self.request_timeout_ms == 0 {
            return Err(WalletError::Configuration("requestTimeoutMs must be > 0".into()));
        }
        if self.tokens.iter().any(|grant| grant.token.is_empty()) {
            return Err(WalletError::Configuration("tokens must not be empty strings".into()));
        }
        if self.internal_token.as_deref() == Some("") {
            return Err(WalletError::Configuration("internalToken must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_config_defaults() {
        let cfg = WalletConfig::default();
        assert_eq!(cfg.receive_policy, ReceivePolicy::NonSendable);
        assert_eq!(cfg.address_prefix, "0x");
        assert_eq!(cfg.default_search_limit, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn search_limit_is_clamped() {
        let cfg = WalletConfig::default();
        assert_eq!(cfg.search_limit(None), 10);
        assert_eq!(cfg.search_limit(Some(0)), 1);
        assert_eq!(cfg.search_limit(Some(500)), 50);
        assert_eq!(cfg.search_limit(Some(5)), 5);
    }

    #[test]
    fn invalid_wallet_config_rejected() {
        let cfg = WalletConfig {
            default_search_limit: 100,
            ..WalletConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(WalletError::Configuration(_))));

        let cfg = WalletConfig {
            min_address_len: 2,
            ..WalletConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn server_config_from_partial_json() {
        let user = UserId::new();
        let raw = format!(
            r#"{{
                "listenAddr": "127.0.0.1:9000",
                "wallet": {{ "receivePolicy": "sendable" }},
                "tokens": [{{ "token": "abc", "userId": "{user}" }}]
            }}"#
        );
        let cfg = ServerConfig::from_json_str(&raw).unwrap();
        assert_eq!(cfg.listen_addr.port(), 9000);
        assert_eq!(cfg.wallet.receive_policy, ReceivePolicy::Sendable);
        assert_eq!(cfg.wallet.address_prefix, "0x");
        assert_eq!(cfg.tokens[0].user_id, user);
        assert_eq!(cfg.request_timeout_ms, constants::DEFAULT_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn server_config_rejects_garbage() {
        assert!(ServerConfig::from_json_str("{not json").is_err());
        assert!(ServerConfig::from_json_str(r#"{"requestTimeoutMs": 0}"#).is_err());
    }

    #[test]
    fn receive_policy_bucket() {
        assert_eq!(ReceivePolicy::NonSendable.bucket(), Bucket::NonSendable);
        assert_eq!(ReceivePolicy::Sendable.bucket(), Bucket::Sendable);
    }
}
