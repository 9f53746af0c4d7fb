//! User account domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hoby_loop_core::{Email, Role, UserId};

/// Postal address attached to a user.
///
/// Every part may be empty; sellers and consumers fill it in after signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

/// A seller, consumer, or administrator account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, unique across all users.
    pub email: Email,
    /// Stored credential. Never serialized.
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Business tax ID, sellers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    /// Individual tax ID, consumers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    /// Disabled accounts keep their rows but cannot act.
    pub is_active: bool,
    /// Free-form permission set for admin accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
