//! Bearer-token authentication seam.
//!
//! Session management lives outside this service. The API only needs to
//! turn a bearer token into a [`UserId`]; [`StaticTokens`] does that from
//! the configured token list and any other session backend can implement
//! [`Authenticator`].

use std::collections::HashMap;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use tokenwallet_types::{Result, TokenGrant, UserId, WalletError};

/// Resolves a bearer token to the authenticated user.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<UserId>;
}

/// Fixed token → user table loaded from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticTokens {
    tokens: HashMap<String, UserId>,
}

impl StaticTokens {
    #[must_use]
    pub fn new(grants: &[TokenGrant]) -> Self {
        Self {
            tokens: grants
                .iter()
                .map(|grant| (grant.token.clone(), grant.user_id))
                .collect(),
        }
    }
}

impl Authenticator for StaticTokens {
    fn authenticate(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).copied()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// # Errors
/// `Unauthenticated` if the header is missing or malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(WalletError::Unauthenticated)?
        .to_str()
        .map_err(|_| WalletError::Unauthenticated)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(WalletError::Unauthenticated)?;
    if token.is_empty() {
        return Err(WalletError::Unauthenticated);
    }
    Ok(token)
}

/// Authenticate the caller of a user-facing endpoint.
///
/// # Errors
/// `Unauthenticated` if the token is missing or unknown.
pub fn principal(auth: &dyn Authenticator, headers: &HeaderMap) -> Result<UserId> {
    auth.authenticate(bearer_token(headers)?)
        .ok_or(WalletError::Unauthenticated)
}

/// Check the internal service token on `/internal/*` endpoints. With no
/// internal token configured, internal endpoints are closed.
///
/// # Errors
/// `Unauthenticated` if the token is missing, wrong, or not configured.
pub fn require_internal(expected: Option<&str>, headers: &HeaderMap) -> Result<()> {
    let expected = expected.ok_or(WalletError::Unauthenticated)?;
    let presented = bearer_token(headers)?;
    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(WalletError::Unauthenticated)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert!(bearer_token(&headers("Basic abc")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn static_tokens_resolve_users() {
        let user = UserId::new();
        let auth = StaticTokens::new(&[TokenGrant {
            token: "t-1".into(),
            user_id: user,
        }]);
        assert_eq!(principal(&auth, &headers("Bearer t-1")).unwrap(), user);
        assert!(matches!(
            principal(&auth, &headers("Bearer t-2")),
            Err(WalletError::Unauthenticated)
        ));
    }

    #[test]
    fn internal_token_required() {
        assert!(require_internal(Some("secret"), &headers("Bearer secret")).is_ok());
        assert!(require_internal(Some("secret"), &headers("Bearer secreT")).is_err());
        assert!(require_internal(None, &headers("Bearer secret")).is_err());
    }
}
