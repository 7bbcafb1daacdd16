use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::items::OrderItem;
use crate::mapper::{self, GroupedRow, HasChildren};
use crate::products::repo::{Product, PRODUCT_COLUMNS};
use crate::roles::repo::ROLE_COLUMNS;
use crate::users::repo::{User, UserColumns, USER_COLUMNS};

/// An order with its purchaser and every line item.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub user: User,
    pub items: Vec<OrderItem>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl HasChildren for Order {
    type Child = OrderItem;

    fn children_mut(&mut self) -> &mut Vec<OrderItem> {
        &mut self.items
    }
}

/// One row of `order ⟕ user ⟕ role ⟕ order_item ⟕ product`.
///
/// Item and product columns are NULL for an order that has no items yet.
#[derive(Debug, FromRow)]
struct OrderRow {
    #[sqlx(rename = "order.id")]
    id: i64,
    #[sqlx(rename = "order.created_at")]
    created_at: OffsetDateTime,
    #[sqlx(rename = "order.updated_at")]
    updated_at: OffsetDateTime,
    #[sqlx(flatten)]
    user: UserColumns,
    #[sqlx(rename = "order_item.id")]
    item_id: Option<i64>,
    #[sqlx(rename = "order_item.quantity")]
    item_quantity: Option<i32>,
    #[sqlx(rename = "order_item.created_at")]
    item_created_at: Option<OffsetDateTime>,
    #[sqlx(rename = "order_item.updated_at")]
    item_updated_at: Option<OffsetDateTime>,
    #[sqlx(rename = "product.id")]
    product_id: Option<i64>,
    #[sqlx(rename = "product.name")]
    product_name: Option<String>,
    #[sqlx(rename = "product.price")]
    product_price: Option<Decimal>,
    #[sqlx(rename = "product.reference")]
    product_reference: Option<String>,
    #[sqlx(rename = "product.created_at")]
    product_created_at: Option<OffsetDateTime>,
    #[sqlx(rename = "product.updated_at")]
    product_updated_at: Option<OffsetDateTime>,
}

impl OrderRow {
    fn item(&mut self) -> Option<OrderItem> {
        let product = Product {
            id: self.product_id?,
            name: self.product_name.take()?,
            price: self.product_price?,
            reference: self.product_reference.take()?,
            created_at: self.product_created_at?,
            updated_at: self.product_updated_at?,
        };
        Some(OrderItem {
            id: self.item_id?,
            quantity: self.item_quantity?,
            order_id: self.id,
            product,
            created_at: self.item_created_at?,
            updated_at: self.item_updated_at?,
        })
    }
}

impl GroupedRow for OrderRow {
    type Key = i64;
    type Parent = Order;
    type Child = OrderItem;

    fn into_parts(mut self) -> (i64, Order, Option<OrderItem>) {
        let item = self.item();
        let order = Order {
            id: self.id,
            user: self.user.into(),
            items: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (order.id, order, item)
    }
}

fn select_orders(filter: &str) -> String {
    format!(
        r#"SELECT
            "order".id AS "order.id",
            "order".created_at AS "order.created_at",
            "order".updated_at AS "order.updated_at",
            {USER_COLUMNS},
            {ROLE_COLUMNS},
            order_item.id AS "order_item.id",
            order_item.quantity AS "order_item.quantity",
            order_item.created_at AS "order_item.created_at",
            order_item.updated_at AS "order_item.updated_at",
            {PRODUCT_COLUMNS}
        FROM "order"
        JOIN "user" ON "user".id = "order".user_id
        JOIN role ON role.id = "user".role_id
        LEFT JOIN order_item ON order_item.order_id = "order".id
        LEFT JOIN product ON product.id = order_item.product_id
        {filter}
        ORDER BY "order".id, order_item.id"#
    )
}

impl Order {
    pub async fn get_all(db: &PgPool) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&select_orders(""))
            .fetch_all(db)
            .await
            .context("list orders")?;
        Ok(mapper::group(rows))
    }

    pub async fn get_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&select_orders(r#"WHERE "order".id = $1"#))
            .bind(id)
            .fetch_all(db)
            .await
            .context("get order by id")?;
        Ok(mapper::group(rows).into_iter().next())
    }

    pub async fn create(db: &PgPool, user_id: i64) -> anyhow::Result<i64> {
        sqlx::query_scalar::<_, i64>(r#"INSERT INTO "order" (user_id) VALUES ($1) RETURNING id"#)
            .bind(user_id)
            .fetch_one(db)
            .await
            .context("insert order")
    }

    pub async fn update(db: &PgPool, id: i64, user_id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE "order" SET user_id = $1, updated_at = now() WHERE id = $2"#,
        )
        .bind(user_id)
        .bind(id)
        .execute(db)
        .await
        .context("update order")?;
        Ok(res.rows_affected() > 0)
    }

    /// Items go with the order (`ON DELETE CASCADE`).
    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM "order" WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await
            .context("delete order")?;
        Ok(res.rows_affected() > 0)
    }
}
