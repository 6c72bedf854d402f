use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    database::ProductRepository,
    models::{NewReview, Review},
    EmporiumError, Result,
};

pub const DEFAULT_STOCK: i32 = 0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub ingredients: Option<String>,
    pub usage: Option<String>,
    pub images: Vec<String>,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub ingredients: Option<String>,
    pub usage: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqlxProduct {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub ingredients: Option<String>,
    pub usage: Option<String>,
    pub images: Vec<String>,
    pub reviews: Json<Vec<Review>>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl From<SqlxProduct> for Product {
    fn from(row: SqlxProduct) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            stock: row.stock,
            ingredients: row.ingredients,
            usage: row.usage,
            images: row.images,
            reviews: row.reviews.0,
            created_at: row.created_at,
            last_modified: row.last_modified,
        }
    }
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(EmporiumError::BadRequest(
            "price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<()> {
    if stock < 0 {
        return Err(EmporiumError::BadRequest(
            "stock cannot be negative".to_string(),
        ));
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(EmporiumError::BadRequest("title is required".to_string()));
        }
        validate_price(self.price)?;
        validate_stock(self.stock())
    }

    pub fn stock(&self) -> i32 {
        self.stock.unwrap_or(DEFAULT_STOCK)
    }
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(EmporiumError::BadRequest("title cannot be blank".to_string()));
            }
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }
}

impl Product {
    #[tracing::instrument(skip(pool), fields(model = "Product"))]
    pub async fn find_all<DB: ProductRepository>(pool: &PgPool) -> Result<Vec<Self>> {
        DB::find_all(pool).await
    }

    #[tracing::instrument(skip(pool), fields(model = "Product"))]
    pub async fn find_by_id<DB: ProductRepository>(id: Uuid, pool: &PgPool) -> Result<Self> {
        DB::find_by_id(id, pool).await
    }

    #[tracing::instrument(name = "new_product", skip(pool, new_product), fields(model = "Product"))]
    pub async fn new<DB: ProductRepository>(new_product: NewProduct, pool: &PgPool) -> Result<Self> {
        new_product.validate()?;
        DB::create(&new_product, pool).await
    }

    #[tracing::instrument(skip(pool, update), fields(model = "Product"))]
    pub async fn update<DB: ProductRepository>(
        id: Uuid,
        update: ProductUpdate,
        pool: &PgPool,
    ) -> Result<Self> {
        update.validate()?;
        DB::update(id, &update, pool).await
    }

    #[tracing::instrument(skip(pool), fields(model = "Product"))]
    pub async fn delete<DB: ProductRepository>(id: Uuid, pool: &PgPool) -> Result<()> {
        DB::delete(id, pool).await
    }

    #[tracing::instrument(skip(pool, new_review), fields(model = "Product"))]
    pub async fn add_review<DB: ProductRepository>(
        id: Uuid,
        new_review: NewReview,
        reviewer: Option<String>,
        pool: &PgPool,
    ) -> Result<Self> {
        let review = Review::new(new_review, reviewer)?;
        DB::add_review(id, &review, pool).await
    }
}
