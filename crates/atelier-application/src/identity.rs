//! External identity/session collaborator.
//!
//! Authentication is delegated to an external provider; the core never
//! touches it. These types are consumed read-only by presentation code.
//! A local stub stands in until a real provider is wired up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use atelier_core::Result;

/// Optional profile details supplied by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// The authenticated user as exposed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// An active authentication session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: UserProfile,
}

/// An abstract identity/session provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the active session, if signed in.
    async fn session(&self) -> Option<AuthSession>;

    /// Signs in with Google and returns the new session.
    async fn sign_in_with_google(&self) -> Result<AuthSession>;

    /// Signs the current user out.
    async fn sign_out(&self) -> Result<()>;
}

/// Local stub provider holding a fabricated session in memory.
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    session: RwLock<Option<AuthSession>>,
}

impl LocalIdentityProvider {
    /// Creates a signed-out stub provider.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    async fn sign_in_with_google(&self) -> Result<AuthSession> {
        let session = AuthSession {
            user: UserProfile {
                id: "local-user".to_string(),
                email: "studio@localhost".to_string(),
                created_at: Utc::now(),
                user_metadata: UserMetadata {
                    avatar_url: None,
                    full_name: Some("Local User".to_string()),
                },
            },
        };
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_sign_in_and_out() {
        let provider = LocalIdentityProvider::new();
        assert!(provider.session().await.is_none());

        let session = provider.sign_in_with_google().await.unwrap();
        assert_eq!(session.user.email, "studio@localhost");
        assert!(provider.session().await.is_some());

        provider.sign_out().await.unwrap();
        assert!(provider.session().await.is_none());
    }
}
