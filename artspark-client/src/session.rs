//! Session - current identity, admin gate and per-session view markers
//!
//! The identity itself comes from the external identity provider. This
//! module only asks the store for the matching profile row, with a hard
//! deadline, and derives whether the caller may perform admin actions.
//!
//! Admin access hard-fails: when the profile cannot be fetched the session
//! is not admin. There is no local admin credential.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use shared::models::Profile;

use crate::error::{ClientError, ClientResult};
use crate::gateway::StoreGateway;

/// Authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// How the last sign-in resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No identity supplied
    Anonymous,
    /// Profile fetched (or absent) in time
    SignedIn { admin: bool },
    /// Profile could not be fetched in time; anonymous non-admin session
    Degraded { reason: String },
}

#[derive(Debug)]
struct SessionState {
    identity: Option<Identity>,
    profile: Option<Profile>,
    outcome: BootstrapOutcome,
}

#[derive(Debug)]
pub struct SessionContext {
    state: RwLock<SessionState>,
    /// Stable per-process key used for anonymous ratings
    anonymous_key: String,
    viewed: Mutex<HashSet<String>>,
    sign_in_attempt: AtomicU64,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self {
            state: RwLock::new(SessionState {
                identity: None,
                profile: None,
                outcome: BootstrapOutcome::Anonymous,
            }),
            anonymous_key: format!("anon-{}", uuid::Uuid::new_v4()),
            viewed: Mutex::new(HashSet::new()),
            sign_in_attempt: AtomicU64::new(0),
        }
    }

    /// Anonymous session, then sign in `identity` if given
    pub async fn bootstrap(
        gateway: &dyn StoreGateway,
        identity: Option<Identity>,
        timeout: Duration,
    ) -> Self {
        let session = Self::anonymous();
        if let Some(identity) = identity {
            session.sign_in(gateway, identity, timeout).await;
        }
        session
    }

    /// Fetch the caller's profile within `timeout` and update the session.
    ///
    /// Never fails and never waits longer than `timeout`. If a newer sign-in
    /// or a sign-out happens meanwhile, this result is discarded.
    pub async fn sign_in(
        &self,
        gateway: &dyn StoreGateway,
        identity: Identity,
        timeout: Duration,
    ) -> BootstrapOutcome {
        let attempt = self.sign_in_attempt.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = tokio::time::timeout(timeout, gateway.fetch_profile(&identity.user_id)).await;

        let (identity, profile, outcome) = match fetched {
            Ok(Ok(Some(profile))) => {
                let admin = profile.is_admin() && profile.email_matches(&identity.email);
                if profile.is_admin() && !admin {
                    tracing::warn!(
                        target: "security",
                        user_id = %identity.user_id,
                        "Admin profile email does not match identity, admin access denied"
                    );
                }
                (Some(identity), Some(profile), BootstrapOutcome::SignedIn { admin })
            }
            Ok(Ok(None)) => {
                tracing::info!(user_id = %identity.user_id, "No profile row, signed in as visitor");
                (Some(identity), None, BootstrapOutcome::SignedIn { admin: false })
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    target: "security",
                    user_id = %identity.user_id,
                    error = %e,
                    "Profile fetch failed, continuing as anonymous"
                );
                (None, None, BootstrapOutcome::Degraded { reason: e.to_string() })
            }
            Err(_) => {
                let reason = format!("profile fetch exceeded {} ms", timeout.as_millis());
                tracing::warn!(
                    target: "security",
                    user_id = %identity.user_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Profile bootstrap timed out, continuing as anonymous"
                );
                (None, None, BootstrapOutcome::Degraded { reason })
            }
        };

        if self.sign_in_attempt.load(Ordering::SeqCst) != attempt {
            tracing::debug!("Discarding superseded sign-in result");
            return self.outcome();
        }

        let mut state = self.state.write();
        state.identity = identity;
        state.profile = profile;
        state.outcome = outcome.clone();
        outcome
    }

    pub fn sign_out(&self) {
        self.sign_in_attempt.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write();
        state.identity = None;
        state.profile = None;
        state.outcome = BootstrapOutcome::Anonymous;
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.read().identity.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.read().profile.clone()
    }

    pub fn outcome(&self) -> BootstrapOutcome {
        self.state.read().outcome.clone()
    }

    /// User id for per-user rows (ratings); anonymous sessions get a stable key
    pub fn user_key(&self) -> String {
        self.state
            .read()
            .identity
            .as_ref()
            .map(|i| i.user_id.clone())
            .unwrap_or_else(|| self.anonymous_key.clone())
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self.state.read().outcome,
            BootstrapOutcome::SignedIn { admin: true }
        )
    }

    pub fn require_admin(&self) -> ClientResult<()> {
        if self.is_admin() {
            return Ok(());
        }
        tracing::warn!(target: "security", "Admin operation rejected for non-admin session");
        Err(ClientError::PermissionDenied("admin role required".into()))
    }

    // ========== View markers ==========

    /// Mark an artwork as viewed; false if it already was this session
    pub fn mark_viewed(&self, artwork_id: &str) -> bool {
        self.viewed.lock().insert(artwork_id.to_string())
    }

    pub fn unmark_viewed(&self, artwork_id: &str) {
        self.viewed.lock().remove(artwork_id);
    }

    pub fn has_viewed(&self, artwork_id: &str) -> bool {
        self.viewed.lock().contains(artwork_id)
    }
}
