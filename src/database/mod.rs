mod customer;
mod order;
mod product;
mod user;

pub use customer::{CustomerDatabase, CustomerRepository};
pub use order::{OrderDatabase, OrderRepository};
pub use product::{ProductDatabase, ProductRepository};
pub use user::{UserDatabase, UserRepository};
