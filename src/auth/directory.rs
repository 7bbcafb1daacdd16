use std::fmt;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::roles::repo::Role;
use crate::users::repo::User;

/// How `authenticate` identifies the user: exactly one of id or username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(i64),
    Username(String),
}

impl fmt::Display for UserLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserLookup::Id(id) => write!(f, "id {id}"),
            UserLookup::Username(name) => write!(f, "username [{name}]"),
        }
    }
}

/// User and role lookups needed by the session gates.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, lookup: &UserLookup) -> anyhow::Result<Option<User>>;
    async fn role_name(&self, role_id: i64) -> anyhow::Result<Option<String>>;
}

#[derive(Clone)]
pub struct PgDirectory {
    db: PgPool,
}

impl PgDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_user(&self, lookup: &UserLookup) -> anyhow::Result<Option<User>> {
        match lookup {
            UserLookup::Id(id) => User::get_by_id(&self.db, *id).await,
            UserLookup::Username(name) => User::get_by_username(&self.db, name).await,
        }
    }

    async fn role_name(&self, role_id: i64) -> anyhow::Result<Option<String>> {
        Ok(Role::get_by_id(&self.db, role_id)
            .await?
            .map(|role| role.role_name))
    }
}

#[cfg(test)]
pub use fake::FakeDirectory;

#[cfg(test)]
mod fake {
    use time::OffsetDateTime;

    use super::*;

    /// In-memory directory for auth and router tests.
    #[derive(Default, Clone)]
    pub struct FakeDirectory {
        roles: Vec<Role>,
        users: Vec<User>,
    }

    impl FakeDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_role(mut self, id: i64, role_name: &str) -> Self {
            let now = OffsetDateTime::now_utc();
            self.roles.push(Role {
                id,
                role_name: role_name.into(),
                description: String::new(),
                created_at: now,
                updated_at: now,
            });
            self
        }

        /// The role must have been added first.
        pub fn with_user(mut self, id: i64, username: &str, role_id: i64) -> Self {
            let role = self
                .roles
                .iter()
                .find(|r| r.id == role_id)
                .cloned()
                .expect("role registered before user");
            let now = OffsetDateTime::now_utc();
            self.users.push(User {
                id,
                username: username.into(),
                password: String::new(),
                role,
                created_at: now,
                updated_at: now,
            });
            self
        }
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn find_user(&self, lookup: &UserLookup) -> anyhow::Result<Option<User>> {
            Ok(self
                .users
                .iter()
                .find(|u| match lookup {
                    UserLookup::Id(id) => u.id == *id,
                    UserLookup::Username(name) => &u.username == name,
                })
                .cloned())
        }

        async fn role_name(&self, role_id: i64) -> anyhow::Result<Option<String>> {
            Ok(self
                .roles
                .iter()
                .find(|r| r.id == role_id)
                .map(|r| r.role_name.clone()))
        }
    }
}
