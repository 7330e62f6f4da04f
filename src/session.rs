//! Explicit authentication state.
//!
//! Every protected operation takes a [`SessionContext`] and fails with
//! [`CoachError::Unauthenticated`] when it is signed out.

use async_trait::async_trait;

use crate::error::{CoachError, CoachResult};
use crate::interview::{NewUserProfile, UserProfile};
use crate::storage::DocumentStore;

/// Display name used when the identity provider has none.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Email used when the identity provider has none.
pub const DEFAULT_EMAIL: &str = "N/A";

/// The user as reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub image_url: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Full name, else first name, else [`DEFAULT_DISPLAY_NAME`].
    pub fn display_name(&self) -> &str {
        [&self.full_name, &self.first_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    fn new_profile(&self) -> NewUserProfile {
        NewUserProfile {
            id: self.id.clone(),
            display_name: self.display_name().to_string(),
            email: self
                .email
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or(DEFAULT_EMAIL)
                .to_string(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Source of the signed-in user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user, or `None` when nobody is signed in.
    async fn current_user(&self) -> CoachResult<Option<CurrentUser>>;
}

/// Identity fixed at construction, e.g. from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<CurrentUser>,
}

impl StaticIdentity {
    pub fn signed_in(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> CoachResult<Option<CurrentUser>> {
        Ok(self.user.clone())
    }
}

/// Whether, and as whom, the user is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionContext {
    #[default]
    SignedOut,
    SignedIn(CurrentUser),
}

impl SessionContext {
    /// Asks `identity` for the user and makes sure a profile exists.
    ///
    /// The profile is written once, on the first sign-in, and never updated.
    pub async fn sign_in(
        identity: &dyn IdentityProvider,
        store: &dyn DocumentStore,
    ) -> CoachResult<Self> {
        let user = identity
            .current_user()
            .await?
            .ok_or(CoachError::Unauthenticated)?;

        ensure_profile(&user, store).await?;
        tracing::info!(user = %user.id, "Signed in");
        Ok(SessionContext::SignedIn(user))
    }

    pub fn sign_out(&mut self) {
        if let SessionContext::SignedIn(user) = self {
            tracing::info!(user = %user.id, "Signed out");
        }
        *self = SessionContext::SignedOut;
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionContext::SignedIn(user) => Some(user),
            SessionContext::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user().is_some()
    }

    /// The signed-in user, or [`CoachError::Unauthenticated`].
    pub fn require_user(&self) -> CoachResult<&CurrentUser> {
        self.user().ok_or(CoachError::Unauthenticated)
    }
}

async fn ensure_profile(user: &CurrentUser, store: &dyn DocumentStore) -> CoachResult<UserProfile> {
    if let Some(existing) = store.get_user(&user.id).await? {
        return Ok(existing);
    }
    let profile = store.insert_user(user.new_profile()).await.map_err(|e| {
        tracing::error!(user = %user.id, error = %e, "Error storing the user data");
        e
    })?;
    tracing::debug!(user = %user.id, "User profile created");
    Ok(profile)
}
