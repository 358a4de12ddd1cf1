use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::ExpenseBackend;
use crate::service::ExpenseService;

/// Authentication state as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// Still restoring a previous session
    #[default]
    Unknown,
    SignedIn { user_id: String },
    SignedOut,
}

#[derive(Debug, Default)]
pub struct Session {
    status: AuthStatus,
    signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    /// Record a sign-in. The user id is trusted as given.
    pub fn sign_in(&mut self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        info!(user_id = %user_id, "Signed in");
        self.status = AuthStatus::SignedIn { user_id };
        self.signed_in_at = Some(Utc::now());
    }

    /// Sign out and drop every cached list.
    pub fn sign_out<B: ExpenseBackend>(&mut self, service: &ExpenseService<B>) {
        service.invalidate_cache(None);
        if let AuthStatus::SignedIn { ref user_id } = self.status {
            info!(user_id = %user_id, "Signed out");
        }
        self.status = AuthStatus::SignedOut;
        self.signed_in_at = None;
    }

    /// Get the user ID if signed in
    pub fn user_id(&self) -> Option<&str> {
        match self.status {
            AuthStatus::SignedIn { ref user_id } => Some(user_id.as_str()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.signed_in_at
    }
}
