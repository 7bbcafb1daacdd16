use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::dto::ProductForm;
use crate::pagination::{paginate, Page, PageRequest};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub reference: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    product.id AS "product.id",
    product.name AS "product.name",
    product.price AS "product.price",
    product.reference AS "product.reference",
    product.created_at AS "product.created_at",
    product.updated_at AS "product.updated_at""#;

#[derive(Debug, FromRow)]
pub(crate) struct ProductColumns {
    #[sqlx(rename = "product.id")]
    id: i64,
    #[sqlx(rename = "product.name")]
    name: String,
    #[sqlx(rename = "product.price")]
    price: Decimal,
    #[sqlx(rename = "product.reference")]
    reference: String,
    #[sqlx(rename = "product.created_at")]
    created_at: OffsetDateTime,
    #[sqlx(rename = "product.updated_at")]
    updated_at: OffsetDateTime,
}

impl From<ProductColumns> for Product {
    fn from(c: ProductColumns) -> Self {
        Self {
            id: c.id,
            name: c.name,
            price: c.price,
            reference: c.reference,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl Product {
    pub async fn get_all(db: &PgPool) -> anyhow::Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, reference, created_at, updated_at
            FROM product
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await
        .context("list products")
    }

    /// Reads the whole table and slices the requested page out of it.
    pub async fn get_all_pagination(
        db: &PgPool,
        request: PageRequest,
    ) -> anyhow::Result<Option<Page<Product>>> {
        let Some(rows_per_page) = request.rows_per_page() else {
            return Ok(None);
        };
        let all = Product::get_all(db).await?;
        Ok(Some(paginate(all, request.page_number, rows_per_page)))
    }

    pub async fn get_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, reference, created_at, updated_at
            FROM product
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get product by id")
    }

    pub async fn get_by_reference(db: &PgPool, reference: &str) -> anyhow::Result<Option<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, reference, created_at, updated_at
            FROM product
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(db)
        .await
        .context("get product by reference")
    }

    /// No validation here; the `reference` UNIQUE constraint still applies.
    pub async fn create(db: &PgPool, form: &ProductForm) -> anyhow::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO product (name, price, reference)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&form.name)
        .bind(form.price)
        .bind(&form.reference)
        .fetch_one(db)
        .await
        .context("insert product")
    }

    pub async fn update(db: &PgPool, id: i64, form: &ProductForm) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE product
               SET name = $1, price = $2, reference = $3, updated_at = now()
             WHERE id = $4
            "#,
        )
        .bind(&form.name)
        .bind(form.price)
        .bind(&form.reference)
        .bind(id)
        .execute(db)
        .await
        .context("update product")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete product")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn create_then_find_by_reference(db: PgPool) {
        let form = ProductForm {
            name: "Widget".into(),
            price: Decimal::new(999, 2),
            reference: "W-1".into(),
        };
        let id = Product::create(&db, &form).await.unwrap();

        let found = Product::get_by_reference(&db, "W-1").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.name, "Widget");
        assert_eq!(found.price, Decimal::new(999, 2));
        assert_eq!(found.reference, "W-1");
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn duplicate_reference_hits_unique_constraint(db: PgPool) {
        let form = ProductForm {
            name: "Gadget".into(),
            price: Decimal::ZERO,
            reference: "G-1".into(),
        };
        Product::create(&db, &form).await.unwrap();
        let err = Product::create(&db, &form).await.unwrap_err();
        assert!(crate::error::is_unique_violation(&err));
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn product_on_an_order_cannot_be_deleted(db: PgPool) {
        use crate::orders::items::{OrderItem, OrderItemForm};
        use crate::orders::repo::Order;
        use crate::users::{dto::NewUser, repo::User};

        let product_id = Product::create(
            &db,
            &ProductForm {
                name: "Lamp".into(),
                price: Decimal::new(4500, 2),
                reference: "L-1".into(),
            },
        )
        .await
        .unwrap();
        let user_id = User::register(
            &db,
            &NewUser {
                username: "lena".into(),
                password: "pw".into(),
                role_id: 2,
            },
        )
        .await
        .unwrap();
        let order_id = Order::create(&db, user_id).await.unwrap();
        OrderItem::create(
            &db,
            &OrderItemForm {
                quantity: 1,
                product_id,
                order_id,
            },
        )
        .await
        .unwrap();

        let err = Product::delete(&db, product_id).await.unwrap_err();
        assert!(crate::error::is_foreign_key_violation(&err));

        let err = OrderItem::create(
            &db,
            &OrderItemForm {
                quantity: 1,
                product_id: product_id + 1000,
                order_id,
            },
        )
        .await
        .unwrap_err();
        assert!(crate::error::is_foreign_key_violation(&err));
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn missing_rows_are_none_not_errors(db: PgPool) {
        assert!(Product::get_by_id(&db, 4242).await.unwrap().is_none());
        assert!(Product::get_by_reference(&db, "nope").await.unwrap().is_none());
        assert!(!Product::delete(&db, 4242).await.unwrap());
    }
}
