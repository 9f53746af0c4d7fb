//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use hoby_loop_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::{Address, User};

macro_rules! user_columns {
    () => {
        "id, email, password, role, name, cnpj, cpf, is_active, permissions, \
         address_street, address_number, address_city, address_state, address_zip, \
         created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `users` queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password: String,
    role: String,
    name: String,
    cnpj: Option<String>,
    cpf: Option<String>,
    is_active: bool,
    permissions: Option<String>,
    address_street: String,
    address_number: String,
    address_city: String,
    address_state: String,
    address_zip: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role: Role = row.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            password: row.password,
            role,
            name: row.name,
            cnpj: row.cnpj,
            cpf: row.cpf,
            is_active: row.is_active,
            permissions: row.permissions,
            address: Address {
                street: row.address_street,
                number: row.address_number,
                city: row.address_city,
                state: row.address_state,
                zip_code: row.address_zip,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password: String,
    pub role: Role,
    pub name: String,
    pub cnpj: Option<String>,
    pub cpf: Option<String>,
    pub address: Address,
}

/// Profile changes. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub cnpj: Option<String>,
    pub cpf: Option<String>,
    pub address: Option<Address>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List every user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Load several users at once, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(UserId::as_i32).collect();
        let rows = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (email, password, role, name, cnpj, cpf, ",
            "address_street, address_number, address_city, address_state, address_zip) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) ",
            "RETURNING ",
            user_columns!()
        ))
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(&user.name)
        .bind(&user.cnpj)
        .bind(&user.cpf)
        .bind(&user.address.street)
        .bind(&user.address.number)
        .bind(&user.address.city)
        .bind(&user.address.state)
        .bind(&user.address.zip_code)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "user"))?;

        row.try_into()
    }

    /// Apply a profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this ID.
    /// Returns `RepositoryError::Conflict` if the new email is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let address = update.address.as_ref();
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET ",
            "name = COALESCE($2, name), ",
            "email = COALESCE($3, email), ",
            "cnpj = COALESCE($4, cnpj), ",
            "cpf = COALESCE($5, cpf), ",
            "address_street = COALESCE($6, address_street), ",
            "address_number = COALESCE($7, address_number), ",
            "address_city = COALESCE($8, address_city), ",
            "address_state = COALESCE($9, address_state), ",
            "address_zip = COALESCE($10, address_zip), ",
            "updated_at = NOW() ",
            "WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.cnpj)
        .bind(&update.cpf)
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.number.as_str()))
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.state.as_str()))
        .bind(address.map(|a| a.zip_code.as_str()))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "user"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}
