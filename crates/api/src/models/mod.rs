//! Domain models returned by the repositories and serialized by the routes.

pub mod basket;
pub mod order;
pub mod subscription;
pub mod user;

pub use basket::Basket;
pub use order::Order;
pub use subscription::{Subscription, SubscriptionDetails};
pub use user::{Address, User};
