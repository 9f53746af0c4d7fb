//! Background services for the API.
//!
//! # Services
//!
//! - `notifications` - Best-effort order status notifications

pub mod notifications;

pub use notifications::{
    LogSink, NotificationDispatcher, NotificationError, NotificationMessage, NotificationSink,
    OrderNotification, SubscriptionLookup,
};
