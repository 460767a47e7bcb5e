//! Identity service trait.
//!
//! The identity provider is an opaque credential store: it turns an
//! email/password pair into a session principal and announces when the
//! signed-in principal changes. Profiles live in the document store, keyed
//! by the principal's `uid`.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::broadcast;

/// Boxed future returned by [`IdentityService`] methods.
pub type IdentityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IdentityError>> + Send + 'a>>;

/// Errors reported by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration attempted with an email that already has a principal.
    #[error("Email already in use: {0}")]
    EmailInUse(String),

    /// Password rejected by the provider's policy.
    #[error("Weak password: {0}")]
    WeakPassword(String),

    /// Provider unreachable or failed.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Provider-assigned unique id; also the key of the user's profile document.
    pub uid: String,
    /// Sign-in email.
    pub email: String,
    /// Display name set at registration.
    pub display_name: Option<String>,
}

/// Notification that the current principal changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalChange {
    /// A principal signed in (or was restored).
    SignedIn(Principal),
    /// The current principal signed out.
    SignedOut,
}

/// Identity provider abstraction.
///
/// Dyn-compatible so it can be held as `Arc<dyn IdentityService>`.
pub trait IdentityService: Send + Sync {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials`: unknown email or wrong password
    /// - `Unavailable`: provider failure
    fn authenticate<'a>(&'a self, email: &'a str, password: &'a str) -> IdentityFuture<'a, Principal>;

    /// Register a new principal. The new principal is not signed in.
    ///
    /// # Errors
    ///
    /// - `EmailInUse`: the email is already registered
    /// - `WeakPassword`: the password was rejected
    /// - `Unavailable`: provider failure
    fn create_principal<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        display_name: Option<&'a str>,
    ) -> IdentityFuture<'a, Principal>;

    /// The principal currently signed in, if any.
    fn current_principal(&self) -> Option<Principal>;

    /// Sign out the current principal.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: provider failure
    fn sign_out(&self) -> IdentityFuture<'_, ()>;

    /// Subscribe to principal changes.
    ///
    /// Changes are delivered asynchronously; a receiver only sees changes
    /// that happen after it subscribed.
    fn subscribe(&self) -> broadcast::Receiver<PrincipalChange>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_in_use_display() {
        let error = IdentityError::EmailInUse("a@example.com".to_string());
        assert_eq!(format!("{error}"), "Email already in use: a@example.com");
    }
}
