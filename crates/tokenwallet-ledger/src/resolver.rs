//! Recipient resolver: maps a human query or address string to a user.
//!
//! Stateless per call. The caller is always excluded from its own search
//! results; client-side filtering is not a security boundary.

use std::sync::Arc;

use tokenwallet_types::{
    Result, UserId, UserProfile, UserSearchResult, WalletAddress, WalletConfig, WalletError,
};
use tracing::debug;

use crate::directory::UserDirectory;

/// How well a profile matches a query. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Relevance {
    /// Exact email or wallet address.
    Exact,
    /// Exact first, last or full name.
    Name,
    /// Prefix of a name, the email, or the address.
    Prefix,
    /// Substring of the full name or email.
    Contains,
}

/// Resolves recipients for search, address validation and transfers.
pub struct RecipientResolver {
    directory: Arc<UserDirectory>,
    config: WalletConfig,
}

impl RecipientResolver {
    #[must_use]
    pub fn new(directory: Arc<UserDirectory>, config: WalletConfig) -> Self {
        Self { directory, config }
    }

    /// Fuzzy, case-insensitive search over name, email and address.
    ///
    /// Returns at most `limit` results (clamped to the configured maximum),
    /// ordered by relevance, then last name, first name and email. The
    /// caller never appears in the results.
    #[must_use]
    pub fn search(&self, caller: UserId, query: &str, limit: Option<usize>) -> Vec<UserSearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < self.config.min_search_query_len {
            return Vec::new();
        }
        let limit = self.config.search_limit(limit);

        let mut hits: Vec<(Relevance, SortKey, UserSearchResult)> = self.directory.scan(|profiles| {
            profiles
                .filter(|profile| profile.id != caller)
                .filter_map(|profile| {
                    relevance(profile, &needle)
                        .map(|rank| (rank, SortKey::of(profile), UserSearchResult::from(profile)))
                })
                .collect()
        });
        hits.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        hits.truncate(limit);

        debug!(caller = %caller, query = %needle, results = hits.len(), "user search");
        hits.into_iter().map(|(_, _, result)| result).collect()
    }

    /// Exact lookup by wallet address.
    ///
    /// # Errors
    /// `RecipientNotFound` if no wallet has this address.
    pub fn validate_address(&self, address: &str) -> Result<UserSearchResult> {
        let address = WalletAddress::new(address);
        self.directory
            .find_by_address(&address)
            .map(|profile| UserSearchResult::from(&profile))
            .ok_or_else(|| WalletError::RecipientNotFound {
                reference: address.to_string(),
            })
    }

    /// Whether `candidate` should be treated as an address.
    #[must_use]
    pub fn looks_like_address(&self, candidate: &str) -> bool {
        WalletAddress::looks_like_address(
            candidate,
            &self.config.address_prefix,
            self.config.min_address_len,
        )
    }

    /// Resolve a transfer recipient given as an email or a wallet address.
    ///
    /// # Errors
    /// `RecipientNotFound` if the reference matches nobody.
    pub fn resolve(&self, reference: &str) -> Result<UserProfile> {
        let reference = reference.trim();
        let found = if self.looks_like_address(reference) {
            self.directory.find_by_address(&WalletAddress::new(reference))
        } else if reference.contains('@') {
            self.directory.find_by_email(reference)
        } else {
            None
        };
        debug!(reference, found = found.is_some(), "resolve recipient");
        found.ok_or_else(|| WalletError::RecipientNotFound {
            reference: reference.to_string(),
        })
    }
}

/// Alphabetical tie-break: last name, first name, email, then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey(String, String, String, UserId);

impl SortKey {
    fn of(profile: &UserProfile) -> Self {
        Self(
            profile.last_name.to_lowercase(),
            profile.first_name.to_lowercase(),
            profile.email.to_lowercase(),
            profile.id,
        )
    }
}

fn relevance(profile: &UserProfile, needle: &str) -> Option<Relevance> {
    let email = profile.email.to_lowercase();
    let first = profile.first_name.to_lowercase();
    let last = profile.last_name.to_lowercase();
    let full = profile.full_name().to_lowercase();
    let address = profile.wallet_address.as_str();

    if email == needle || address == needle {
        Some(Relevance::Exact)
    } else if first == needle || last == needle || full == needle {
        Some(Relevance::Name)
    } else if first.starts_with(needle)
        || last.starts_with(needle)
        || full.starts_with(needle)
        || email.starts_with(needle)
        || address.starts_with(needle)
    {
        Some(Relevance::Prefix)
    } else if full.contains(needle) || email.contains(needle) {
        Some(Relevance::Contains)
    } else {
        None
    }
}
