//! Role and status enums stored as text columns.
//!
//! Values are written lowercase (`snake_case`) but parsed case-insensitively:
//! older rows and seed files mix `"Active"` and `"active"`, `"Processing"`
//! and `"processing"`.

use core::fmt;

/// Error returned when a text value does not name any variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?} (expected one of: {expected})")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Accepted values.
    pub expected: &'static str,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical stored representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                        expected: concat!($($text, " "),+),
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }
    };
}

text_enum! {
    /// What a user account is allowed to do.
    Role, "role" {
        /// Lists baskets and issues delivery orders.
        Seller => "seller",
        /// Subscribes to baskets.
        Consumer => "consumer",
        /// Reads everything through the admin routes.
        Admin => "admin",
    }
}

text_enum! {
    /// How often a subscribed basket is delivered.
    Frequency, "frequency" {
        Weekly => "weekly",
        Biweekly => "biweekly",
        Monthly => "monthly",
    }
}

text_enum! {
    /// Lifecycle of a subscription.
    SubscriptionStatus, "subscription status" {
        Active => "active",
        Paused => "paused",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Delivery progress of an order.
    OrderStatus, "order status" {
        Processing => "processing",
        Preparing => "preparing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Role {
    /// Whether this role may use the admin routes.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl OrderStatus {
    /// Statuses a new order may start in.
    #[must_use]
    pub const fn is_create_status(&self) -> bool {
        !matches!(self, Self::Preparing)
    }

    /// Statuses a seller may move an existing order into.
    #[must_use]
    pub const fn is_update_target(&self) -> bool {
        matches!(self, Self::Preparing | Self::Shipped | Self::Delivered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "Active".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Active
        );
        assert_eq!(
            "active".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Active
        );
        assert_eq!(
            "Processing".parse::<OrderStatus>().unwrap(),
            OrderStatus::Processing
        );
        assert_eq!(" SELLER ".parse::<Role>().unwrap(), Role::Seller);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "daily".parse::<Frequency>().unwrap_err();
        assert_eq!(err.kind, "frequency");
        assert_eq!(err.value, "daily");
        assert!(err.to_string().contains("weekly"));
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let json = serde_json::to_string(&Frequency::Biweekly).unwrap();
        assert_eq!(json, "\"biweekly\"");

        let parsed: OrderStatus = serde_json::from_str("\"Shipped\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
        assert!(serde_json::from_str::<Role>("\"owner\"").is_err());
    }

    #[test]
    fn test_display_matches_as_str() {
        for role in Role::ALL {
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn test_order_update_targets() {
        assert!(OrderStatus::Shipped.is_update_target());
        assert!(!OrderStatus::Processing.is_update_target());
        assert!(!OrderStatus::Cancelled.is_update_target());
    }

    #[test]
    fn test_order_create_statuses() {
        assert!(OrderStatus::Processing.is_create_status());
        assert!(OrderStatus::Cancelled.is_create_status());
        assert!(!OrderStatus::Preparing.is_create_status());
    }

    #[test]
    fn test_default_subscription_status() {
        assert_eq!(SubscriptionStatus::default(), SubscriptionStatus::Active);
    }
}
