//! User directory records and the read-only projections built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, UserId, WalletAddress};

/// A registered user as known to the recipient resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub wallet_address: WalletAddress,
}

impl UserProfile {
    #[must_use]
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        wallet_address: WalletAddress,
    ) -> Self {
        Self {
            id,
            email: email.into().trim().to_string(),
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            wallet_address,
        }
    }

    /// `"First Last"`, trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Canonical search result shape. Produced by the resolver, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResult {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub wallet_address: WalletAddress,
}

impl From<&UserProfile> for UserSearchResult {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            wallet_address: profile.wallet_address.clone(),
        }
    }
}

/// A previous transfer recipient, annotated with the latest transfer to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecipient {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub wallet_address: WalletAddress,
    pub last_transaction_date: DateTime<Utc>,
    pub last_transaction_amount: Amount,
}

impl RecentRecipient {
    #[must_use]
    pub fn new(profile: &UserProfile, last_date: DateTime<Utc>, last_amount: Amount) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            wallet_address: profile.wallet_address.clone(),
            last_transaction_date: last_date,
            last_transaction_amount: last_amount,
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl UserProfile {
    /// A profile with a fresh id, derived `0x` address and a unique email.
    pub fn dummy(first_name: &str, last_name: &str) -> Self {
        use rand::Rng;
        let id = UserId::new();
        let tag: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Self::new(
            id,
            format!(
                "{}.{}{tag}@example.com",
                first_name.to_ascii_lowercase(),
                last_name.to_ascii_lowercase()
            ),
            first_name,
            last_name,
            WalletAddress::derive(id, crate::constants::DEFAULT_ADDRESS_PREFIX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_trims_fields() {
        let id = UserId::new();
        let p = UserProfile::new(id, " a@b.io ", " Ann ", " Lee ", WalletAddress::derive(id, "0x"));
        assert_eq!(p.email, "a@b.io");
        assert_eq!(p.full_name(), "Ann Lee");
    }

    #[test]
    fn search_result_projection() {
        let p = UserProfile::dummy("John", "Smith");
        let r = UserSearchResult::from(&p);
        assert_eq!(r.id, p.id);
        assert_eq!(r.wallet_address, p.wallet_address);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["firstName"], "John");
        assert!(json["walletAddress"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn recent_recipient_wire_shape() {
        let p = UserProfile::dummy("Jane", "Doe");
        let r = RecentRecipient::new(&p, Utc::now(), Amount::tokens(2));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["lastTransactionAmount"], "2.0000");
        assert!(json.get("lastTransactionDate").is_some());
    }
}
