//! Globally unique identifiers used throughout TokenWallet.
//!
//! Entity IDs use UUIDv7 for time-ordered lexicographic sorting. Wallet
//! addresses are opaque strings; freshly opened wallets get an address
//! derived deterministically from the owning user.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Unique identifier for a user (and therefore for their single wallet).
///
/// `Ord` is significant: multi-wallet mutations lock wallets in ascending
/// `UserId` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Globally unique transaction identifier. Uses UUIDv7 so ledger rows sort
/// by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// WalletAddress
// ---------------------------------------------------------------------------

/// A wallet's public address string (e.g. `0x3f9a…`).
///
/// Lookups are case-insensitive; the stored form is lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Wrap an address string, normalising it to trimmed lowercase.
    #[must_use]
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_ascii_lowercase())
    }

    /// Deterministic address for a user: `prefix || hex(sha256(tag || user))[..40]`.
    ///
    /// The same user always gets the same address for a given prefix.
    #[must_use]
    pub fn derive(user_id: UserId, prefix: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"tokenwallet:address:v1:");
        hasher.update(user_id.0.as_bytes());
        let hash = hex::encode(hasher.finalize());
        Self::new(format!(
            "{prefix}{}",
            &hash[..constants::ADDRESS_BODY_HEX_LEN]
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Client heuristic for "this query is an address, not a name":
    /// recognised prefix and at least `min_len` characters.
    #[must_use]
    pub fn looks_like_address(candidate: &str, prefix: &str, min_len: usize) -> bool {
        let candidate = candidate.trim();
        candidate.len() >= min_len
            && candidate
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_uniqueness_and_ordering() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn transaction_id_display() {
        let a = TransactionId::new();
        assert_ne!(a, TransactionId::new());
        assert_eq!(a.to_string(), format!("tx:{}", a.0));
    }

    #[test]
    fn user_id_parses_from_display() {
        let id = UserId::new();
        let back: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, back);
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn derived_address_is_deterministic() {
        let user = UserId::new();
        let a = WalletAddress::derive(user, "0x");
        let b = WalletAddress::derive(user, "0x");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("0x"));
        assert_eq!(a.as_str().len(), 2 + constants::ADDRESS_BODY_HEX_LEN);
        assert_ne!(a, WalletAddress::derive(UserId::new(), "0x"));
    }

    #[test]
    fn address_normalised_to_lowercase() {
        let addr = WalletAddress::new("  0xABCdef  ");
        assert_eq!(addr.as_str(), "0xabcdef");
        assert_eq!(addr, WalletAddress::new("0xabcDEF"));
    }

    #[test]
    fn address_heuristic() {
        let long = format!("0x{}", "a".repeat(40));
        assert!(WalletAddress::looks_like_address(&long, "0x", 26));
        assert!(WalletAddress::looks_like_address(&long.to_uppercase(), "0x", 26));
        assert!(!WalletAddress::looks_like_address("0xabc", "0x", 26));
        assert!(!WalletAddress::looks_like_address("john.doe@example.com", "0x", 10));
        assert!(!WalletAddress::looks_like_address("", "0x", 0));
    }

    #[test]
    fn ids_serialize_transparently() {
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, format!("\"{}\"", uid.0));
    }
}
