//! Typed seed batches.
//!
//! ## File Format
//!
//! JSON (or YAML, by file extension) with three optional collections:
//!
//! ```json
//! {
//!   "users": [
//!     {
//!       "id": 1, "role": "seller", "name": "Horta da Ana",
//!       "email": "ana@hoby.com.br", "password": "cestas123",
//!       "cnpj": "11.222.333/0001-81",
//!       "address": { "street": "Rua das Flores", "number": "42",
//!                    "city": "Campinas", "state": "SP", "zip_code": "13010-000" }
//!     }
//!   ],
//!   "baskets": [
//!     { "id": 1, "seller_id": 1, "name": "Cesta Orgânica",
//!       "description": "Verduras da semana", "price": 89.90 }
//!   ],
//!   "subscriptions": [
//!     { "id": 1, "user_id": 2, "basket_id": 1, "frequency": "weekly" }
//!   ]
//! }
//! ```
//!
//! Unknown fields are rejected so a typo cannot silently drop data.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use hoby_loop_core::document::{validate_cnpj, validate_cpf};
use hoby_loop_core::{
    BasketId, Email, Frequency, Price, Role, SubscriptionId, SubscriptionStatus, UserId,
};

use super::SeedError;
use crate::models::Address;

/// A batch of records to reconcile into the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedBatch {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub baskets: Vec<SeedBasket>,
    #[serde(default)]
    pub subscriptions: Vec<SeedSubscription>,
}

/// A user record. Matched by ID first, then by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub id: UserId,
    pub role: Role,
    pub name: String,
    pub email: Email,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(default)]
    pub address: Address,
}

const fn active_by_default() -> bool {
    true
}

/// A basket record. Matched by ID only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedBasket {
    pub id: BasketId,
    pub seller_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
}

/// A subscription record. Matched by ID only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub basket_id: BasketId,
    pub frequency: Frequency,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

impl SeedBatch {
    /// Decode a JSON batch.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Decode` if the input is not a well-formed batch.
    pub fn from_json(input: &str) -> Result<Self, SeedError> {
        serde_json::from_str(input).map_err(|e| SeedError::Decode(e.to_string()))
    }

    /// Decode a YAML batch.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Decode` if the input is not a well-formed batch.
    pub fn from_yaml(input: &str) -> Result<Self, SeedError> {
        serde_yaml::from_str(input).map_err(|e| SeedError::Decode(e.to_string()))
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len() + self.baskets.len() + self.subscriptions.len()
    }

    /// Whether the batch holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read and decode a batch file.
///
/// `.yaml` and `.yml` files are decoded as YAML, anything else as JSON.
///
/// # Errors
///
/// Returns `SeedError::Io` if the file cannot be read, or
/// `SeedError::Decode` if its contents are not a well-formed batch.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_batch(path: impl AsRef<Path>) -> Result<SeedBatch, SeedError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        SeedBatch::from_yaml(&content)
    } else {
        SeedBatch::from_json(&content)
    }
}

/// Problems that make a batch unusable.
///
/// Prices are not checked here: [`Price`] already refuses zero and
/// negative amounts while decoding.
#[must_use]
pub fn validate_batch(batch: &SeedBatch) -> Vec<String> {
    let mut problems = Vec::new();

    let mut user_ids = HashSet::new();
    let mut emails = HashSet::new();
    for user in &batch.users {
        if !user.id.is_positive() {
            problems.push(format!("user {}: id must be positive", user.id));
        }
        if !user_ids.insert(user.id) {
            problems.push(format!("user id {} appears more than once", user.id));
        }
        if !emails.insert(user.email.as_str()) {
            problems.push(format!("email {} appears more than once", user.email));
        }
    }

    let mut basket_ids = HashSet::new();
    for basket in &batch.baskets {
        if !basket.id.is_positive() {
            problems.push(format!("basket {}: id must be positive", basket.id));
        }
        if !basket_ids.insert(basket.id) {
            problems.push(format!("basket id {} appears more than once", basket.id));
        }
        if !basket.seller_id.is_positive() {
            problems.push(format!("basket {}: seller_id must be positive", basket.id));
        }
    }

    let mut subscription_ids = HashSet::new();
    for subscription in &batch.subscriptions {
        if !subscription.id.is_positive() {
            problems.push(format!("subscription {}: id must be positive", subscription.id));
        }
        if !subscription_ids.insert(subscription.id) {
            problems.push(format!(
                "subscription id {} appears more than once",
                subscription.id
            ));
        }
        if !subscription.user_id.is_positive() || !subscription.basket_id.is_positive() {
            problems.push(format!(
                "subscription {}: user_id and basket_id must be positive",
                subscription.id
            ));
        }
    }

    problems
}

/// Suspicious but loadable records, reported as warnings.
#[must_use]
pub fn lint_batch(batch: &SeedBatch) -> Vec<String> {
    let mut warnings = Vec::new();

    for user in &batch.users {
        if let Some(cpf) = &user.cpf
            && !validate_cpf(cpf)
        {
            warnings.push(format!("user {}: CPF {cpf:?} fails check digits", user.id));
        }
        if let Some(cnpj) = &user.cnpj
            && !validate_cnpj(cnpj)
        {
            warnings.push(format!("user {}: CNPJ {cnpj:?} fails check digits", user.id));
        }
        match user.role {
            Role::Seller if user.cnpj.is_none() => {
                warnings.push(format!("user {}: seller without CNPJ", user.id));
            }
            Role::Consumer if user.cpf.is_none() => {
                warnings.push(format!("user {}: consumer without CPF", user.id));
            }
            _ => {}
        }
    }

    warnings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BATCH: &str = r#"{
        "users": [
            {"id": 1, "role": "seller", "name": "Ana", "email": "ana@hoby.com.br",
             "password": "x", "cnpj": "11.222.333/0001-81"},
            {"id": 2, "role": "Consumer", "name": "Bruno", "email": "bruno@hoby.com.br",
             "password": "y", "cpf": "529.982.247-25", "is_active": false,
             "address": {"street": "Rua A", "number": "10", "city": "Campinas",
                         "state": "SP", "zip_code": "13010-000"}}
        ],
        "baskets": [
            {"id": 1, "seller_id": 1, "name": "Cesta", "price": 89.9}
        ],
        "subscriptions": [
            {"id": 1, "user_id": 2, "basket_id": 1, "frequency": "weekly"}
        ]
    }"#;

    #[test]
    fn test_from_json_applies_defaults() {
        let batch = SeedBatch::from_json(BATCH).unwrap();
        assert_eq!(batch.len(), 4);

        let ana = &batch.users[0];
        assert!(ana.is_active);
        assert_eq!(ana.address, Address::default());

        let bruno = &batch.users[1];
        assert_eq!(bruno.role, Role::Consumer);
        assert!(!bruno.is_active);
        assert_eq!(bruno.address.city, "Campinas");

        assert_eq!(batch.baskets[0].description, "");
        assert_eq!(batch.subscriptions[0].status, SubscriptionStatus::Active);
        assert!(validate_batch(&batch).is_empty());
        assert!(lint_batch(&batch).is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "users:\n  - id: 3\n    role: admin\n    name: Root\n    email: root@hoby.com.br\n    password: z\n";
        let batch = SeedBatch::from_yaml(yaml).unwrap();
        assert_eq!(batch.users.len(), 1);
        assert!(batch.baskets.is_empty());
    }

    #[test]
    fn test_decode_rejects_unknown_fields() {
        let err = SeedBatch::from_json(r#"{"users": [], "orders": []}"#).unwrap_err();
        assert!(matches!(err, SeedError::Decode(_)));

        let err = SeedBatch::from_json(
            r#"{"baskets": [{"id": 1, "seller_id": 1, "name": "x", "price": 1, "cost": 2}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_bad_values() {
        for input in [
            r#"{"baskets": [{"id": 1, "seller_id": 1, "name": "x", "price": 0}]}"#,
            r#"{"subscriptions": [{"id": 1, "user_id": 1, "basket_id": 1, "frequency": "daily"}]}"#,
            r#"{"users": [{"id": 1, "role": "seller", "name": "x", "email": "nope", "password": ""}]}"#,
        ] {
            assert!(SeedBatch::from_json(input).is_err(), "{input}");
        }
    }

    #[test]
    fn test_validate_batch_reports_duplicates_and_bad_ids() {
        let mut batch = SeedBatch::from_json(BATCH).unwrap();
        let mut dup = batch.users[0].clone();
        dup.id = UserId::new(0);
        batch.users.push(dup);
        batch.baskets.push(batch.baskets[0].clone());

        let problems = validate_batch(&batch);
        assert!(problems.iter().any(|p| p == "user 0: id must be positive"));
        assert!(problems.iter().any(|p| p == "email ana@hoby.com.br appears more than once"));
        assert!(problems.iter().any(|p| p == "basket id 1 appears more than once"));
    }

    #[test]
    fn test_lint_batch_flags_tax_ids() {
        let mut batch = SeedBatch::from_json(BATCH).unwrap();
        batch.users[0].cnpj = None;
        batch.users[1].cpf = Some("111.111.111-11".to_owned());

        let warnings = lint_batch(&batch);
        assert_eq!(
            warnings,
            vec![
                "user 1: seller without CNPJ".to_owned(),
                "user 2: CPF \"111.111.111-11\" fails check digits".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn test_load_batch_missing_file() {
        let err = load_batch("/nonexistent/seed.json").await.unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }
}
