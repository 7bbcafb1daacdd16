use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::mapper;
use crate::products::repo::{Product, ProductColumns, PRODUCT_COLUMNS};

#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub id: i64,
    pub quantity: i32,
    pub product: Product,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryForm {
    pub quantity: i32,
    pub product_id: i64,
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    #[sqlx(rename = "inventory.id")]
    id: i64,
    #[sqlx(rename = "inventory.quantity")]
    quantity: i32,
    #[sqlx(rename = "inventory.created_at")]
    created_at: OffsetDateTime,
    #[sqlx(rename = "inventory.updated_at")]
    updated_at: OffsetDateTime,
    #[sqlx(flatten)]
    product: ProductColumns,
}

impl From<InventoryRow> for Inventory {
    fn from(r: InventoryRow) -> Self {
        Self {
            id: r.id,
            quantity: r.quantity,
            product: r.product.into(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn select_inventory(filter: &str) -> String {
    format!(
        r#"SELECT
            inventory.id AS "inventory.id",
            inventory.quantity AS "inventory.quantity",
            inventory.created_at AS "inventory.created_at",
            inventory.updated_at AS "inventory.updated_at",
            {PRODUCT_COLUMNS}
        FROM inventory
        JOIN product ON product.id = inventory.product_id
        {filter}
        ORDER BY inventory.id"#
    )
}

impl Inventory {
    pub async fn get_all(db: &PgPool) -> anyhow::Result<Vec<Inventory>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&select_inventory(""))
            .fetch_all(db)
            .await
            .context("list inventory")?;
        Ok(mapper::all(rows))
    }

    pub async fn get_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Inventory>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&select_inventory("WHERE inventory.id = $1"))
            .bind(id)
            .fetch_all(db)
            .await
            .context("get inventory by id")?;
        Ok(mapper::first(rows))
    }

    pub async fn create(db: &PgPool, form: &InventoryForm) -> anyhow::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inventory (quantity, product_id)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(form.quantity)
        .bind(form.product_id)
        .fetch_one(db)
        .await
        .context("insert inventory")
    }

    pub async fn update(db: &PgPool, id: i64, form: &InventoryForm) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE inventory
               SET quantity = $1, product_id = $2, updated_at = now()
             WHERE id = $3
            "#,
        )
        .bind(form.quantity)
        .bind(form.product_id)
        .bind(id)
        .execute(db)
        .await
        .context("update inventory")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete inventory")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::products::dto::ProductForm;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn inventory_embeds_its_product(db: PgPool) {
        let product_id = Product::create(
            &db,
            &ProductForm {
                name: "Crate".into(),
                price: Decimal::new(1250, 2),
                reference: "C-9".into(),
            },
        )
        .await
        .unwrap();
        let id = Inventory::create(&db, &InventoryForm { quantity: 4, product_id })
            .await
            .unwrap();

        let inv = Inventory::get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(inv.quantity, 4);
        assert_eq!(inv.product.id, product_id);
        assert_eq!(inv.product.reference, "C-9");
        assert!(Inventory::get_by_id(&db, id + 1).await.unwrap().is_none());
    }
}
