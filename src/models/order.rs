use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
    database::{CustomerRepository, OrderRepository},
    models::Customer,
    EmporiumError, Result,
};

pub const DEFAULT_SHIPPING_COST: f64 = 0.0;
pub const DEFAULT_SHIPPING_METHOD: &str = "standard";
/// Orders created from a paid checkout skip straight past `Pending`
pub const PAID_ORDER_STATUS: OrderStatus = OrderStatus::Processing;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Position in the fulfilment sequence, `None` for `Cancelled`
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Orders only move forward through fulfilment, and can only be cancelled
    /// before they've shipped
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(current), Some(next)) => next > current,
            (Some(current), None) => current <= 1,
            (None, _) => false,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "payment_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

/// A snapshot of a purchased item, independent of later catalog changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// An order's customer, either as a bare id or with the record loaded.
///
/// Orders are always read as `Reference`, expansion has to be asked for
/// explicitly with [`Order::expand_customer`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CustomerRef {
    Reference(Uuid),
    Expanded(Box<Customer>),
}

impl CustomerRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Reference(id) => *id,
            Self::Expanded(customer) => customer.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer: CustomerRef,
    pub items: Vec<OrderItem>,
    pub shipping_method: String,
    pub shipping_cost: f64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment: PaymentOutcome,
    pub session_id: String,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_method: String,
    pub shipping_cost: f64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment: PaymentOutcome,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqlxOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Json<Vec<OrderItem>>,
    pub shipping_method: String,
    pub shipping_cost: f64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment: PaymentOutcome,
    pub session_id: String,
    pub tracking_number: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl From<SqlxOrder> for Order {
    fn from(row: SqlxOrder) -> Self {
        Self {
            id: row.id,
            customer: CustomerRef::Reference(row.customer_id),
            items: row.items.0,
            shipping_method: row.shipping_method,
            shipping_cost: row.shipping_cost,
            total_amount: row.total_amount,
            status: row.status,
            payment: row.payment,
            session_id: row.session_id,
            tracking_number: row.tracking_number,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            last_modified: row.last_modified,
        }
    }
}

/// Sum of item subtotals plus shipping, rounded to whole cents
pub fn compute_total(items: &[OrderItem], shipping_cost: f64) -> f64 {
    let total: f64 = items.iter().map(OrderItem::subtotal).sum::<f64>() + shipping_cost;
    (total * 100.0).round() / 100.0
}

impl NewOrder {
    /// An order for a checkout session the payment processor reported as paid
    pub fn from_paid_checkout(
        customer_id: Uuid,
        session_id: String,
        items: Vec<OrderItem>,
        shipping_method: Option<String>,
        shipping_cost: Option<f64>,
    ) -> Self {
        let shipping_cost = shipping_cost.unwrap_or(DEFAULT_SHIPPING_COST);
        let total_amount = compute_total(&items, shipping_cost);
        Self {
            customer_id,
            items,
            shipping_method: shipping_method
                .filter(|method| !method.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SHIPPING_METHOD.to_string()),
            shipping_cost,
            total_amount,
            status: PAID_ORDER_STATUS,
            payment: PaymentOutcome::Completed,
            session_id,
        }
    }
}

impl Order {
    #[tracing::instrument(skip(pool), fields(model = "Order"))]
    pub async fn find_all<DB: OrderRepository>(pool: &PgPool) -> Result<Vec<Self>> {
        DB::find_all(pool).await
    }

    #[tracing::instrument(skip(pool), fields(model = "Order"))]
    pub async fn find_by_id<DB: OrderRepository>(id: Uuid, pool: &PgPool) -> Result<Self> {
        DB::find_by_id(id, pool).await
    }

    #[tracing::instrument(skip(pool), fields(model = "Order"))]
    pub async fn find_by_customer<DB: OrderRepository>(
        customer_id: Uuid,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        DB::find_by_customer(customer_id, pool).await
    }

    /// Persists the order unless one already exists for its session, linking
    /// it to its customer in the same write.
    ///
    /// Returns `None` when the session was already recorded, so a redelivered
    /// payment event never produces a second order.
    #[tracing::instrument(skip(pool, new_order), fields(model = "Order", session_id = %new_order.session_id))]
    pub async fn create_once<DB: OrderRepository>(
        mut new_order: NewOrder,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        new_order.total_amount = compute_total(&new_order.items, new_order.shipping_cost);
        DB::insert_and_link(&new_order, pool).await
    }

    #[tracing::instrument(skip(pool, change), fields(model = "Order"))]
    pub async fn change_status<DB: OrderRepository>(
        id: Uuid,
        change: StatusChange,
        pool: &PgPool,
    ) -> Result<Self> {
        let mut order = DB::find_by_id(id, pool).await?;
        order.apply_status_change(change)?;
        DB::save(&order, pool).await
    }

    /// Loads the customer record in place of its id
    #[tracing::instrument(skip(self, pool), fields(model = "Order", id = %self.id))]
    pub async fn expand_customer<DB: CustomerRepository>(mut self, pool: &PgPool) -> Result<Self> {
        if let CustomerRef::Reference(customer_id) = self.customer {
            let customer = DB::find_by_id(customer_id, pool).await?;
            self.customer = CustomerRef::Expanded(Box::new(customer));
        }
        Ok(self)
    }

    pub fn recompute_total(&mut self) {
        self.total_amount = compute_total(&self.items, self.shipping_cost);
    }

    pub fn apply_status_change(&mut self, change: StatusChange) -> Result<()> {
        if !self.status.can_transition_to(change.status) {
            return Err(EmporiumError::BadRequest(format!(
                "order cannot move from {} to {}",
                self.status, change.status
            )));
        }
        if change.status == OrderStatus::Cancelled {
            let reason = change
                .cancellation_reason
                .filter(|reason| !reason.trim().is_empty())
                .ok_or_else(|| {
                    EmporiumError::BadRequest("a cancellation reason is required".to_string())
                })?;
            self.cancellation_reason = Some(reason);
        }
        if let Some(tracking_number) = change.tracking_number {
            self.tracking_number = Some(tracking_number);
        }
        self.status = change.status;
        self.recompute_total();
        Ok(())
    }
}
