use async_trait::async_trait;
use sqlx::{query, query_as, types::Json, PgPool};
use uuid::Uuid;

use crate::{
    models::{product::SqlxProduct, NewProduct, Product, ProductUpdate, Review},
    Result,
};

#[async_trait]
pub trait ProductRepository {
    async fn find_all(pool: &PgPool) -> Result<Vec<Product>>;
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Product>;
    async fn create(new_product: &NewProduct, pool: &PgPool) -> Result<Product>;
    async fn update(id: Uuid, update: &ProductUpdate, pool: &PgPool) -> Result<Product>;
    async fn delete(id: Uuid, pool: &PgPool) -> Result<()>;
    async fn add_review(id: Uuid, review: &Review, pool: &PgPool) -> Result<Product>;
}

pub struct ProductDatabase;

#[async_trait]
impl ProductRepository for ProductDatabase {
    #[tracing::instrument(skip(pool), fields(repository = "product"))]
    async fn find_all(pool: &PgPool) -> Result<Vec<Product>> {
        let products = query_as::<_, SqlxProduct>(
            r#"
            SELECT * FROM products ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(products.into_iter().map(Product::from).collect())
    }

    #[tracing::instrument(skip(pool), fields(repository = "product"))]
    async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Product> {
        let product = query_as::<_, SqlxProduct>(
            r#"
            SELECT * FROM products WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(product.into())
    }

    #[tracing::instrument(skip(pool, new_product), fields(repository = "product"))]
    async fn create(new_product: &NewProduct, pool: &PgPool) -> Result<Product> {
        let product = query_as::<_, SqlxProduct>(
            r#"
            INSERT INTO products
                (id, title, description, price, stock, ingredients, usage, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_product.title.trim())
        .bind(&new_product.description)
        .bind(new_product.price)
        .bind(new_product.stock())
        .bind(&new_product.ingredients)
        .bind(&new_product.usage)
        .bind(&new_product.images)
        .fetch_one(pool)
        .await?;
        Ok(product.into())
    }

    #[tracing::instrument(skip(pool, update), fields(repository = "product"))]
    async fn update(id: Uuid, update: &ProductUpdate, pool: &PgPool) -> Result<Product> {
        let product = query_as::<_, SqlxProduct>(
            r#"
            UPDATE products SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                ingredients = COALESCE($6, ingredients),
                usage = COALESCE($7, usage),
                images = COALESCE($8, images),
                last_modified = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(&update.description)
        .bind(update.price)
        .bind(update.stock)
        .bind(&update.ingredients)
        .bind(&update.usage)
        .bind(update.images.clone())
        .fetch_one(pool)
        .await?;
        Ok(product.into())
    }

    #[tracing::instrument(skip(pool), fields(repository = "product"))]
    async fn delete(id: Uuid, pool: &PgPool) -> Result<()> {
        let deleted = query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }
        Ok(())
    }

    #[tracing::instrument(skip(pool, review), fields(repository = "product"))]
    async fn add_review(id: Uuid, review: &Review, pool: &PgPool) -> Result<Product> {
        let product = query_as::<_, SqlxProduct>(
            r#"
            UPDATE products
            SET reviews = reviews || $2::jsonb, last_modified = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(vec![review.clone()]))
        .fetch_one(pool)
        .await?;
        Ok(product.into())
    }
}
