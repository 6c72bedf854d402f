use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    database::CustomerRepository,
    models::{NewReview, Review},
    EmporiumError, Result,
};

pub const UNKNOWN_CUSTOMER: &str = "unknown customer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub orders: Vec<Uuid>,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Partial update, `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqlxCustomer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub orders: Vec<Uuid>,
    pub reviews: Json<Vec<Review>>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl From<SqlxCustomer> for Customer {
    fn from(row: SqlxCustomer) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            street: row.street,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            country: row.country,
            orders: row.orders,
            reviews: row.reviews.0,
            created_at: row.created_at,
            last_modified: row.last_modified,
        }
    }
}

/// Emails are unique per customer and compared case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl NewCustomer {
    /// Validates and normalizes the record before it's written
    pub fn normalized(mut self) -> Result<Self> {
        self.email = normalize_email(&self.email);
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(EmporiumError::BadRequest(
                "a valid email is required".to_string(),
            ));
        }
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        Ok(self)
    }
}

impl Customer {
    #[tracing::instrument(skip(pool), fields(model = "Customer"))]
    pub async fn find_all<DB: CustomerRepository>(pool: &PgPool) -> Result<Vec<Self>> {
        DB::find_all(pool).await
    }

    #[tracing::instrument(skip(pool), fields(model = "Customer"))]
    pub async fn find_by_id<DB: CustomerRepository>(id: Uuid, pool: &PgPool) -> Result<Self> {
        DB::find_by_id(id, pool).await
    }

    /// Returns the customer registered under the email, creating it when absent.
    ///
    /// An existing record is reused as is, the new details are not merged in.
    #[tracing::instrument(skip(pool, new_customer), fields(model = "Customer"))]
    pub async fn find_or_create<DB: CustomerRepository>(
        new_customer: NewCustomer,
        pool: &PgPool,
    ) -> Result<Self> {
        let new_customer = new_customer.normalized()?;
        DB::find_or_create(&new_customer, pool).await
    }

    #[tracing::instrument(name = "new_customer", skip(pool, new_customer), fields(model = "Customer"))]
    pub async fn new<DB: CustomerRepository>(
        new_customer: NewCustomer,
        pool: &PgPool,
    ) -> Result<Self> {
        let new_customer = new_customer.normalized()?;
        DB::create(&new_customer, pool).await
    }

    #[tracing::instrument(skip(pool, update), fields(model = "Customer"))]
    pub async fn update<DB: CustomerRepository>(
        id: Uuid,
        mut update: CustomerUpdate,
        pool: &PgPool,
    ) -> Result<Self> {
        update.email = update.email.map(|email| normalize_email(&email));
        DB::update(id, &update, pool).await
    }

    #[tracing::instrument(skip(pool), fields(model = "Customer"))]
    pub async fn delete<DB: CustomerRepository>(id: Uuid, pool: &PgPool) -> Result<()> {
        DB::delete(id, pool).await
    }

    #[tracing::instrument(skip(pool, new_review), fields(model = "Customer"))]
    pub async fn add_review<DB: CustomerRepository>(
        id: Uuid,
        new_review: NewReview,
        reviewer: Option<String>,
        pool: &PgPool,
    ) -> Result<Self> {
        let review = Review::new(new_review, reviewer)?;
        DB::add_review(id, &review, pool).await
    }

    /// Appends every order id missing from its customer's list, returning how
    /// many customers changed
    #[tracing::instrument(skip(pool), fields(model = "Customer"))]
    pub async fn link_missing_orders<DB: CustomerRepository>(pool: &PgPool) -> Result<u64> {
        DB::append_missing_orders(pool).await
    }

    /// Display name, falling back to a neutral label when both names are blank
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            UNKNOWN_CUSTOMER.to_string()
        } else {
            name.to_string()
        }
    }
}
