//! In-memory identity provider

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use eventhub_core::identity::{
    IdentityError, IdentityFuture, IdentityService, Principal, PrincipalChange,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    principal: Principal,
}

/// In-memory email/password identity provider.
///
/// Accounts are keyed by email. Signing in and out announces a
/// [`PrincipalChange`] on the subscription channel.
#[derive(Clone, Debug)]
pub struct InMemoryIdentityService {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    current: Arc<Mutex<Option<Principal>>>,
    changes: broadcast::Sender<PrincipalChange>,
    unavailable: Arc<AtomicBool>,
}

impl Default for InMemoryIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityService {
    /// Create a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            current: Arc::new(Mutex::new(None)),
            changes,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Seed an account with a known uid.
    #[must_use]
    pub fn with_account(self, uid: &str, email: &str, password: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                principal: Principal {
                    uid: uid.to_string(),
                    email: email.to_string(),
                    display_name: None,
                },
            },
        );
        self
    }

    /// Make every call fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("identity provider offline".to_string()));
        }
        Ok(())
    }

    fn announce(&self, change: PrincipalChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

impl IdentityService for InMemoryIdentityService {
    fn authenticate<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, Principal> {
        Box::pin(async move {
            self.check_available()?;

            let principal = {
                let accounts = self.accounts.lock().unwrap();
                match accounts.get(email) {
                    Some(account) if account.password == password => account.principal.clone(),
                    _ => return Err(IdentityError::InvalidCredentials),
                }
            };

            *self.current.lock().unwrap() = Some(principal.clone());
            self.announce(PrincipalChange::SignedIn(principal.clone()));
            Ok(principal)
        })
    }

    fn create_principal<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        display_name: Option<&'a str>,
    ) -> IdentityFuture<'a, Principal> {
        Box::pin(async move {
            self.check_available()?;

            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(IdentityError::WeakPassword(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }

            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(IdentityError::EmailInUse(email.to_string()));
            }

            let principal = Principal {
                uid: uuid::Uuid::new_v4().to_string(),
                email: email.to_string(),
                display_name: display_name.map(str::to_string),
            };
            accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    principal: principal.clone(),
                },
            );
            Ok(principal)
        })
    }

    fn current_principal(&self) -> Option<Principal> {
        self.current.lock().unwrap().clone()
    }

    fn sign_out(&self) -> IdentityFuture<'_, ()> {
        Box::pin(async move {
            self.check_available()?;
            let previous = self.current.lock().unwrap().take();
            if previous.is_some() {
                self.announce(PrincipalChange::SignedOut);
            }
            Ok(())
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<PrincipalChange> {
        self.changes.subscribe()
    }
}
