//! Authenticated session: login, registration, logout and profile edits.
//!
//! The identity provider owns credentials; the profile lives in the `users`
//! collection under the principal's uid. A principal without a profile is
//! not a usable session and is signed out again.

use crate::directory::UserDirectory;
use crate::error::SessionError;
use crate::types::{OrganizerDetails, RequesterDetails, RoleDetails, UserId, UserProfile};
use eventhub_core::document_store::encode;
use eventhub_core::environment::Clock;
use eventhub_core::identity::{IdentityService, Principal, PrincipalChange};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

/// Sign-up form for an organizer.
#[derive(Debug, Clone)]
pub struct OrganizerRegistration {
    /// Sign-in email
    pub email: String,
    /// Sign-in password
    pub password: String,
    /// Public name
    pub username: String,
    /// Company name
    pub organization_name: String,
    /// Contact number
    pub mobile_number: String,
}

/// Sign-up form for a requester.
#[derive(Debug, Clone)]
pub struct RequesterRegistration {
    /// Sign-in email
    pub email: String,
    /// Sign-in password
    pub password: String,
    /// Full name
    pub name: String,
    /// Job title
    pub position: Option<String>,
}

/// Partial profile edit. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Organizer public name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Organizer company name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Organizer contact number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    /// Requester full name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Requester job title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// The signed-in user, kept in step with the identity provider.
#[derive(Clone)]
pub struct AuthSession {
    identity: Arc<dyn IdentityService>,
    directory: UserDirectory,
    clock: Arc<dyn Clock>,
    current: Arc<RwLock<Option<UserProfile>>>,
}

impl AuthSession {
    /// Session with nobody signed in.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityService>, directory: UserDirectory, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity,
            directory,
            clock,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Sign in and load the user's profile.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidCredentials`]: wrong email or password
    /// - [`SessionError::ProfileMissing`]: the principal has no profile; it is signed out again
    /// - [`SessionError::Upstream`]: the provider or the store failed
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        let principal = self.identity.authenticate(email, password).await.map_err(|e| {
            tracing::warn!(error = %e, "Login refused");
            SessionError::from(e)
        })?;

        let profile = self.resolve(&principal).await?;
        tracing::info!(user_id = %profile.id, role = profile.role().as_str(), "Login successful");
        Ok(profile)
    }

    /// Register an organizer. The new account is not signed in.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Rejected`]: email taken or password too weak
    /// - [`SessionError::Upstream`]: the provider or the store failed
    pub async fn register_organizer(&self, registration: OrganizerRegistration) -> Result<UserProfile, SessionError> {
        let details = RoleDetails::Organizer(OrganizerDetails {
            username: registration.username.clone(),
            organization_name: registration.organization_name,
            mobile_number: registration.mobile_number,
            rating: 0.0,
            review_count: 0,
        });
        self.register(&registration.email, &registration.password, &registration.username, details)
            .await
    }

    /// Register a requester. The new account is not signed in.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Rejected`]: email taken or password too weak
    /// - [`SessionError::Upstream`]: the provider or the store failed
    pub async fn register_requester(&self, registration: RequesterRegistration) -> Result<UserProfile, SessionError> {
        let details = RoleDetails::Requester(RequesterDetails {
            name: registration.name.clone(),
            position: registration.position.unwrap_or_default(),
        });
        self.register(&registration.email, &registration.password, &registration.name, details)
            .await
    }

    #[tracing::instrument(skip(self, password, details))]
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        details: RoleDetails,
    ) -> Result<UserProfile, SessionError> {
        let principal = self
            .identity
            .create_principal(email, password, Some(display_name))
            .await?;

        let profile = UserProfile {
            id: UserId::from(principal.uid),
            email: None,
            created_at: Some(self.clock.now()),
            details,
        };
        self.directory.create_profile(&profile).await?;

        tracing::info!(user_id = %profile.id, role = profile.role().as_str(), "Registration successful");
        Ok(profile)
    }

    /// Sign out and forget the current user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Upstream`] if the provider fails; the user
    /// stays signed in.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.identity.sign_out().await?;
        *self.current.write().await = None;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Merge `update` into the current user's profile.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotAuthenticated`]: nobody is signed in
    /// - [`SessionError::Upstream`]: the store failed
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, SessionError> {
        let id = self
            .current
            .read()
            .await
            .as_ref()
            .map(|profile| profile.id.clone())
            .ok_or(SessionError::NotAuthenticated)?;

        let mut updated = self.directory.merge_profile(&id, encode(&update)?).await?;
        if updated.email.is_none() {
            updated.email = self.identity.current_principal().map(|p| p.email);
        }

        *self.current.write().await = Some(updated.clone());
        Ok(updated)
    }

    /// Copy of the signed-in user's profile.
    pub async fn current_user(&self) -> Option<UserProfile> {
        self.current.read().await.clone()
    }

    /// Whether someone is signed in.
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Follow principal changes from the provider until it goes away.
    ///
    /// A principal that signs in elsewhere is loaded the same way as a
    /// login; one without a profile is signed out.
    pub fn watch_principal_changes(&self) -> JoinHandle<()> {
        let session = self.clone();
        let mut changes = self.identity.subscribe();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(PrincipalChange::SignedIn(principal)) => {
                        if let Err(e) = session.resolve(&principal).await {
                            tracing::warn!(error = %e, "Could not restore session");
                        }
                    },
                    Ok(PrincipalChange::SignedOut) => {
                        *session.current.write().await = None;
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Principal watcher lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Principal watcher stopped");
        })
    }

    /// Load the profile for `principal` and make it current.
    async fn resolve(&self, principal: &Principal) -> Result<UserProfile, SessionError> {
        let id = UserId::from(principal.uid.as_str());
        let mut profile = match self.directory.load_profile(&id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!(user_id = %id, "Principal has no profile; signing out");
                *self.current.write().await = None;
                self.identity.sign_out().await?;
                return Err(SessionError::ProfileMissing);
            },
            Err(e) => {
                *self.current.write().await = None;
                return Err(e.into());
            },
        };

        profile.email = Some(principal.email.clone());
        *self.current.write().await = Some(profile.clone());
        Ok(profile)
    }
}
