use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;

use super::dto::{LoginRequest, NewUser, RegisterRequest, UserUpdate};
use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::mapper;
use crate::outcome::Outcome;
use crate::roles::repo::{Role, RoleColumns, ROLE_COLUMNS};

/// User with its role resolved by join.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String, // argon2 PHC hash
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub(crate) const USER_COLUMNS: &str = r#"
    "user".id AS "user.id",
    "user".username AS "user.username",
    "user".password AS "user.password",
    "user".created_at AS "user.created_at",
    "user".updated_at AS "user.updated_at""#;

/// `"user.*"` and `"role.*"` columns of a `user ⟕ role` row.
#[derive(Debug, FromRow)]
pub(crate) struct UserColumns {
    #[sqlx(rename = "user.id")]
    pub(crate) id: i64,
    #[sqlx(rename = "user.username")]
    pub(crate) username: String,
    #[sqlx(rename = "user.password")]
    pub(crate) password: String,
    #[sqlx(rename = "user.created_at")]
    pub(crate) created_at: OffsetDateTime,
    #[sqlx(rename = "user.updated_at")]
    pub(crate) updated_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub(crate) role: RoleColumns,
}

impl From<UserColumns> for User {
    fn from(c: UserColumns) -> Self {
        Self {
            id: c.id,
            username: c.username,
            password: c.password,
            role: c.role.into(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

fn select_users(filter: &str) -> String {
    format!(
        r#"SELECT {USER_COLUMNS}, {ROLE_COLUMNS}
        FROM "user"
        JOIN role ON role.id = "user".role_id
        {filter}
        ORDER BY "user".id"#
    )
}

impl User {
    pub async fn get_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserColumns>(&select_users(""))
            .fetch_all(db)
            .await
            .context("list users")?;
        Ok(mapper::all(rows))
    }

    pub async fn get_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let rows = sqlx::query_as::<_, UserColumns>(&select_users(r#"WHERE "user".id = $1"#))
            .bind(id)
            .fetch_all(db)
            .await
            .context("get user by id")?;
        Ok(mapper::first(rows))
    }

    pub async fn get_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let rows =
            sqlx::query_as::<_, UserColumns>(&select_users(r#"WHERE "user".username = $1"#))
                .bind(username)
                .fetch_all(db)
                .await
                .context("get user by username")?;
        Ok(mapper::first(rows))
    }

    /// Hashes the password, then inserts. Plaintext never reaches the table.
    pub async fn register(db: &PgPool, new_user: &NewUser) -> anyhow::Result<i64> {
        let hash = hash_password(&new_user.password)?;
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO "user" (username, password, role_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&new_user.username)
        .bind(&hash)
        .bind(new_user.role_id)
        .fetch_one(db)
        .await
        .context("insert user")?;
        debug!(user_id = id, username = %new_user.username, "user registered");
        Ok(id)
    }

    pub async fn update(db: &PgPool, id: i64, update: &UserUpdate) -> anyhow::Result<bool> {
        let hash = update
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;
        let res = sqlx::query(
            r#"
            UPDATE "user"
               SET username = $1,
                   password = COALESCE($2, password),
                   role_id = $3,
                   updated_at = now()
             WHERE id = $4
            "#,
        )
        .bind(&update.username)
        .bind(hash)
        .bind(update.role_id)
        .bind(id)
        .execute(db)
        .await
        .context("update user")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn validate_login(db: &PgPool, creds: &LoginRequest) -> anyhow::Result<Outcome> {
        let user = User::get_by_username(db, &creds.username).await?;
        Ok(check_login(user.as_ref(), creds)?)
    }

    pub async fn validate_register(
        db: &PgPool,
        candidate: &RegisterRequest,
    ) -> anyhow::Result<Outcome> {
        let taken = User::get_by_username(db, &candidate.username)
            .await?
            .is_some();
        Ok(check_register(taken, candidate))
    }
}

pub fn check_login(user: Option<&User>, creds: &LoginRequest) -> Result<Outcome, PasswordError> {
    let Some(user) = user else {
        return Ok(Outcome::error(format!(
            "No user with username [{}] exists in our database.",
            creds.username
        )));
    };
    if verify_password(&creds.password, &user.password)? {
        Ok(Outcome::success())
    } else {
        Ok(Outcome::error("Wrong password."))
    }
}

pub fn check_register(username_taken: bool, candidate: &RegisterRequest) -> Outcome {
    let mut outcome = Outcome::success();
    if username_taken {
        outcome.push_error(username_taken_message(&candidate.username));
    }
    if candidate.password != candidate.confirm_password {
        outcome.push_error("Passwords don't match.");
    }
    outcome
}

pub(crate) fn username_taken_message(username: &str) -> String {
    format!("User already exists with username [{username}]")
}
