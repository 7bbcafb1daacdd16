use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;
use tracing::{debug, info};

use super::directory::{Directory, UserLookup};
use super::extractors::AuthRejection;

pub const USER_ID_KEY: &str = "user_id";
pub const ROLE_ID_KEY: &str = "role_id";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no user matches {0}")]
    UnknownUser(UserLookup),
    #[error("session store: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("user lookup failed: {0}")]
    Store(#[from] anyhow::Error),
}

/// Authenticated identity of one browsing session.
///
/// Anonymous when `user_id` is `None`. Handlers receive it by value through
/// the session extractors and persist changes with [`SessionContext::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Option<i64>,
    pub role_id: Option<i64>,
}

impl SessionContext {
    #[cfg(test)]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Resolves the user and records its id and role id.
    pub async fn authenticate(
        &mut self,
        directory: &dyn Directory,
        lookup: UserLookup,
    ) -> Result<i64, AuthError> {
        let user = directory
            .find_user(&lookup)
            .await?
            .ok_or(AuthError::UnknownUser(lookup))?;
        self.user_id = Some(user.id);
        self.role_id = Some(user.role.id);
        info!(user_id = user.id, role_id = user.role.id, "session authenticated");
        Ok(user.id)
    }

    /// Back to anonymous. Clearing an anonymous context is a no-op.
    pub fn clear_authentication(&mut self) {
        if let Some(user_id) = self.user_id {
            debug!(user_id, "session cleared");
        }
        self.user_id = None;
        self.role_id = None;
    }

    pub fn require_authenticated(&self) -> Result<i64, AuthRejection> {
        self.user_id.ok_or(AuthRejection::Unauthenticated)
    }

    /// Case-sensitive comparison of the session role's name with `role_name`.
    pub async fn require_role(
        &self,
        directory: &dyn Directory,
        role_name: &str,
    ) -> Result<i64, AuthRejection> {
        let user_id = self.require_authenticated()?;
        let forbidden = || AuthRejection::Forbidden {
            required: role_name.to_string(),
        };

        let role_id = self.role_id.ok_or_else(forbidden)?;
        let actual = directory
            .role_name(role_id)
            .await
            .map_err(|e| AuthRejection::Unavailable(e.to_string()))?;

        match actual {
            Some(name) if name == role_name => Ok(user_id),
            _ => Err(forbidden()),
        }
    }

    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(Self {
            user_id: session.get::<i64>(USER_ID_KEY).await?,
            role_id: session.get::<i64>(ROLE_ID_KEY).await?,
        })
    }

    /// Writes the context back; anonymous removes both keys.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        match (self.user_id, self.role_id) {
            (Some(user_id), role_id) => {
                session.insert(USER_ID_KEY, user_id).await?;
                match role_id {
                    Some(role_id) => session.insert(ROLE_ID_KEY, role_id).await?,
                    None => {
                        session.remove::<i64>(ROLE_ID_KEY).await?;
                    }
                }
            }
            (None, _) => {
                session.remove::<i64>(USER_ID_KEY).await?;
                session.remove::<i64>(ROLE_ID_KEY).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::auth::directory::FakeDirectory;

    fn directory() -> FakeDirectory {
        FakeDirectory::new()
            .with_role(1, "admin")
            .with_role(2, "customer")
            .with_user(10, "root", 1)
            .with_user(11, "alice", 2)
    }

    #[tokio::test]
    async fn authenticate_then_clear() {
        let dir = directory();
        let mut ctx = SessionContext::anonymous();
        assert!(!ctx.is_authenticated());

        ctx.authenticate(&dir, UserLookup::Id(11)).await.unwrap();
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.user_id, Some(11));
        assert_eq!(ctx.role_id, Some(2));

        ctx.clear_authentication();
        assert!(!ctx.is_authenticated());
        ctx.clear_authentication();
        assert_eq!(ctx, SessionContext::anonymous());
    }

    #[tokio::test]
    async fn authenticate_by_username() {
        let dir = directory();
        let mut ctx = SessionContext::anonymous();
        let id = ctx
            .authenticate(&dir, UserLookup::Username("root".into()))
            .await
            .unwrap();
        assert_eq!(id, 10);
        assert_eq!(ctx.role_id, Some(1));
    }

    #[tokio::test]
    async fn authenticate_unknown_user_fails_and_stays_anonymous() {
        let dir = directory();
        let mut ctx = SessionContext::anonymous();
        let err = ctx.authenticate(&dir, UserLookup::Id(99)).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser(UserLookup::Id(99))));
        assert!(!ctx.is_authenticated());
    }

    #[tokio::test]
    async fn require_role_denies_other_role() {
        let dir = directory();
        let ctx = SessionContext {
            user_id: Some(11),
            role_id: Some(2),
        };
        let err = ctx.require_role(&dir, "admin").await.unwrap_err();
        assert!(matches!(err, AuthRejection::Forbidden { ref required } if required == "admin"));
    }

    #[tokio::test]
    async fn require_role_without_role_id_is_denied() {
        let dir = directory();
        let ctx = SessionContext {
            user_id: Some(11),
            role_id: None,
        };
        let err = ctx.require_role(&dir, "admin").await.unwrap_err();
        assert!(matches!(err, AuthRejection::Forbidden { .. }));
    }

    #[tokio::test]
    async fn require_role_is_case_sensitive() {
        let dir = directory();
        let ctx = SessionContext {
            user_id: Some(10),
            role_id: Some(1),
        };
        assert_eq!(ctx.require_role(&dir, "admin").await.unwrap(), 10);
        assert!(ctx.require_role(&dir, "Admin").await.is_err());
    }

    #[tokio::test]
    async fn require_role_on_anonymous_is_unauthenticated() {
        let dir = directory();
        let err = SessionContext::anonymous()
            .require_role(&dir, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthRejection::Unauthenticated));
    }

    #[tokio::test]
    async fn save_and_load_through_session_store() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let ctx = SessionContext {
            user_id: Some(5),
            role_id: Some(1),
        };
        ctx.save(&session).await.unwrap();
        assert_eq!(SessionContext::load(&session).await.unwrap(), ctx);

        SessionContext::anonymous().save(&session).await.unwrap();
        SessionContext::anonymous().save(&session).await.unwrap();
        assert_eq!(
            SessionContext::load(&session).await.unwrap(),
            SessionContext::anonymous()
        );
    }
}
