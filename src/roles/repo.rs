use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub role_name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleForm {
    pub role_name: String,
    #[serde(default)]
    pub description: String,
}

/// Select list for a joined `role`, one `"role.column"` alias per field.
pub(crate) const ROLE_COLUMNS: &str = r#"
    role.id AS "role.id",
    role.role_name AS "role.role_name",
    role.description AS "role.description",
    role.created_at AS "role.created_at",
    role.updated_at AS "role.updated_at""#;

#[derive(Debug, FromRow)]
pub(crate) struct RoleColumns {
    #[sqlx(rename = "role.id")]
    pub(crate) id: i64,
    #[sqlx(rename = "role.role_name")]
    pub(crate) role_name: String,
    #[sqlx(rename = "role.description")]
    pub(crate) description: String,
    #[sqlx(rename = "role.created_at")]
    pub(crate) created_at: OffsetDateTime,
    #[sqlx(rename = "role.updated_at")]
    pub(crate) updated_at: OffsetDateTime,
}

impl From<RoleColumns> for Role {
    fn from(c: RoleColumns) -> Self {
        Self {
            id: c.id,
            role_name: c.role_name,
            description: c.description,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl Role {
    pub async fn get_all(db: &PgPool) -> anyhow::Result<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT id, role_name, description, created_at, updated_at
            FROM role
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await
        .context("list roles")
    }

    pub async fn get_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Role>> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT id, role_name, description, created_at, updated_at
            FROM role
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get role by id")
    }

    pub async fn get_by_name(db: &PgPool, role_name: &str) -> anyhow::Result<Option<Role>> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT id, role_name, description, created_at, updated_at
            FROM role
            WHERE role_name = $1
            "#,
        )
        .bind(role_name)
        .fetch_optional(db)
        .await
        .context("get role by name")
    }

    pub async fn create(db: &PgPool, form: &RoleForm) -> anyhow::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO role (role_name, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&form.role_name)
        .bind(&form.description)
        .fetch_one(db)
        .await
        .context("insert role")
    }

    pub async fn update(db: &PgPool, id: i64, form: &RoleForm) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE role
               SET role_name = $1, description = $2, updated_at = now()
             WHERE id = $3
            "#,
        )
        .bind(&form.role_name)
        .bind(&form.description)
        .bind(id)
        .execute(db)
        .await
        .context("update role")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM role WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete role")?;
        Ok(res.rows_affected() > 0)
    }
}
