mod checkout;
mod customers;
mod health_check;
mod orders;
mod products;
mod users;
mod webhooks;

pub use checkout::create_session;
pub use customers::{
    add_customer_review, create_customer, customer_by_id, delete_customer, list_customers,
    update_customer,
};
pub use health_check::health_check;
pub use orders::{change_order_status, list_orders, order_by_id};
pub use products::{
    add_product_review, create_product, delete_product, list_products, product_by_id,
    update_product,
};
pub use users::{
    add_address, forgot_password, list_users, log_in, log_out, me, register, remove_address,
    reset_password,
};
pub use webhooks::stripe_webhook;

use serde::Deserialize;

/// `?expand=a,b` on routes that can inline related records
#[derive(Debug, Default, Deserialize)]
pub struct ExpandQuery {
    #[serde(default)]
    pub expand: Option<String>,
}

impl ExpandQuery {
    pub fn includes(&self, field: &str) -> bool {
        self.expand
            .as_deref()
            .map(|expand| expand.split(',').any(|f| f.trim() == field))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_matches_listed_fields_only() {
        let query = ExpandQuery {
            expand: Some("orders, reviews".into()),
        };
        assert!(query.includes("orders"));
        assert!(query.includes("reviews"));
        assert!(!query.includes("customer"));
        assert!(!ExpandQuery::default().includes("orders"));
    }
}
