use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::mapper;
use crate::products::repo::{Product, ProductColumns, PRODUCT_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub quantity: i32,
    pub order_id: i64,
    pub product: Product,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemForm {
    pub quantity: i32,
    pub product_id: i64,
    pub order_id: i64,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    #[sqlx(rename = "order_item.id")]
    id: i64,
    #[sqlx(rename = "order_item.quantity")]
    quantity: i32,
    #[sqlx(rename = "order_item.order_id")]
    order_id: i64,
    #[sqlx(rename = "order_item.created_at")]
    created_at: OffsetDateTime,
    #[sqlx(rename = "order_item.updated_at")]
    updated_at: OffsetDateTime,
    #[sqlx(flatten)]
    product: ProductColumns,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: r.id,
            quantity: r.quantity,
            order_id: r.order_id,
            product: r.product.into(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn select_items(filter: &str) -> String {
    format!(
        r#"SELECT
            order_item.id AS "order_item.id",
            order_item.quantity AS "order_item.quantity",
            order_item.order_id AS "order_item.order_id",
            order_item.created_at AS "order_item.created_at",
            order_item.updated_at AS "order_item.updated_at",
            {PRODUCT_COLUMNS}
        FROM order_item
        JOIN product ON product.id = order_item.product_id
        {filter}
        ORDER BY order_item.id"#
    )
}

impl OrderItem {
    pub async fn get_all(db: &PgPool) -> anyhow::Result<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(&select_items(""))
            .fetch_all(db)
            .await
            .context("list order items")?;
        Ok(mapper::all(rows))
    }

    pub async fn get_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(&select_items("WHERE order_item.id = $1"))
            .bind(id)
            .fetch_all(db)
            .await
            .context("get order item by id")?;
        Ok(mapper::first(rows))
    }

    pub async fn create(db: &PgPool, form: &OrderItemForm) -> anyhow::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO order_item (quantity, product_id, order_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(form.quantity)
        .bind(form.product_id)
        .bind(form.order_id)
        .fetch_one(db)
        .await
        .context("insert order item")
    }

    pub async fn update(db: &PgPool, id: i64, form: &OrderItemForm) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE order_item
               SET quantity = $1, product_id = $2, order_id = $3, updated_at = now()
             WHERE id = $4
            "#,
        )
        .bind(form.quantity)
        .bind(form.product_id)
        .bind(form.order_id)
        .bind(id)
        .execute(db)
        .await
        .context("update order item")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM order_item WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete order item")?;
        Ok(res.rows_affected() > 0)
    }
}
