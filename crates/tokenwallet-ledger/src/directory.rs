//! In-memory user directory backing the recipient resolver.
//!
//! Indexes profiles by id, lowercase email and wallet address. Profiles are
//! immutable once registered.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokenwallet_types::{Result, UserId, UserProfile, WalletAddress, WalletError};

#[derive(Default)]
struct DirectoryIndex {
    profiles: HashMap<UserId, UserProfile>,
    by_email: HashMap<String, UserId>,
    by_address: HashMap<WalletAddress, UserId>,
}

/// Registered users, looked up by id, email or address.
pub struct UserDirectory {
    index: RwLock<DirectoryIndex>,
}

impl UserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: RwLock::new(DirectoryIndex::default()),
        }
    }

    /// Register a profile. Id, email (case-insensitive) and address must
    /// all be unused.
    ///
    /// # Errors
    /// `InvalidRequest`, `WalletExists`, `EmailInUse` or `AddressInUse`.
    pub fn register(&self, profile: UserProfile) -> Result<()> {
        if profile.email.is_empty() || !profile.email.contains('@') {
            return Err(WalletError::InvalidRequest {
                reason: "a valid email is required".into(),
            });
        }
        let email_key = profile.email.to_lowercase();
        let mut index = self.index.write();
        if index.profiles.contains_key(&profile.id) {
            return Err(WalletError::WalletExists(profile.id));
        }
        if index.by_email.contains_key(&email_key) {
            return Err(WalletError::EmailInUse(profile.email));
        }
        if index.by_address.contains_key(&profile.wallet_address) {
            return Err(WalletError::AddressInUse(profile.wallet_address));
        }
        index.by_email.insert(email_key, profile.id);
        index.by_address.insert(profile.wallet_address.clone(), profile.id);
        index.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Remove a profile (used to roll back a half-finished registration).
    pub fn remove(&self, user_id: UserId) -> Option<UserProfile> {
        let mut index = self.index.write();
        let profile = index.profiles.remove(&user_id)?;
        index.by_email.remove(&profile.email.to_lowercase());
        index.by_address.remove(&profile.wallet_address);
        Some(profile)
    }

    #[must_use]
    pub fn get(&self, user_id: UserId) -> Option<UserProfile> {
        self.index.read().profiles.get(&user_id).cloned()
    }

    /// Case-insensitive exact email lookup.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<UserProfile> {
        let index = self.index.read();
        index
            .by_email
            .get(&email.trim().to_lowercase())
            .and_then(|id| index.profiles.get(id))
            .cloned()
    }

    /// Exact (case-insensitive) address lookup.
    #[must_use]
    pub fn find_by_address(&self, address: &WalletAddress) -> Option<UserProfile> {
        let index = self.index.read();
        index
            .by_address
            .get(address)
            .and_then(|id| index.profiles.get(id))
            .cloned()
    }

    /// Run `f` over every profile under one read lock.
    pub fn scan<T>(&self, f: impl FnOnce(&mut dyn Iterator<Item = &UserProfile>) -> T) -> T {
        let index = self.index.read();
        let mut iter = index.profiles.values();
        f(&mut iter)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().profiles.is_empty()
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let dir = UserDirectory::new();
        let p = UserProfile::dummy("John", "Smith");
        dir.register(p.clone()).unwrap();
        assert_eq!(dir.get(p.id), Some(p.clone()));
        assert_eq!(dir.find_by_email(&p.email.to_uppercase()), Some(p.clone()));
        assert_eq!(
            dir.find_by_address(&WalletAddress::new(p.wallet_address.as_str().to_uppercase())),
            Some(p)
        );
    }

    #[test]
    fn duplicate_email_rejected() {
        let dir = UserDirectory::new();
        let p = UserProfile::dummy("Ann", "Lee");
        dir.register(p.clone()).unwrap();
        let mut q = UserProfile::dummy("Ann", "Other");
        q.email = p.email.to_uppercase();
        assert!(matches!(dir.register(q), Err(WalletError::EmailInUse(_))));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn duplicate_address_rejected() {
        let dir = UserDirectory::new();
        let p = UserProfile::dummy("Ann", "Lee");
        dir.register(p.clone()).unwrap();
        let mut q = UserProfile::dummy("Bo", "Ng");
        q.wallet_address = p.wallet_address.clone();
        assert!(matches!(dir.register(q), Err(WalletError::AddressInUse(_))));
    }

    #[test]
    fn invalid_email_rejected() {
        let dir = UserDirectory::new();
        let mut p = UserProfile::dummy("Ann", "Lee");
        p.email = "not-an-email".into();
        assert!(matches!(dir.register(p), Err(WalletError::InvalidRequest { .. })));
        assert!(dir.is_empty());
    }

    #[test]
    fn remove_clears_indexes() {
        let dir = UserDirectory::new();
        let p = UserProfile::dummy("Ann", "Lee");
        dir.register(p.clone()).unwrap();
        assert!(dir.remove(p.id).is_some());
        assert!(dir.find_by_email(&p.email).is_none());
        assert!(dir.find_by_address(&p.wallet_address).is_none());
        dir.register(p).unwrap();
    }

    #[test]
    fn scan_sees_every_profile() {
        let dir = UserDirectory::new();
        for name in ["A", "B", "C"] {
            dir.register(UserProfile::dummy(name, "X")).unwrap();
        }
        assert_eq!(dir.scan(|it| it.count()), 3);
    }
}
