pub mod customer;
pub mod order;
pub mod product;
pub mod review;
pub mod user;

pub use customer::{normalize_email, Customer, CustomerUpdate, NewCustomer, UNKNOWN_CUSTOMER};
pub use order::{
    compute_total, CustomerRef, NewOrder, Order, OrderItem, OrderStatus, PaymentOutcome,
    StatusChange, DEFAULT_SHIPPING_COST, DEFAULT_SHIPPING_METHOD,
};
pub use product::{NewProduct, Product, ProductUpdate, DEFAULT_STOCK};
pub use review::{NewReview, Review};
pub use user::{Address, AuthUser, NewUser, Registration, ResetState, Role, User};
