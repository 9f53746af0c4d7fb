//! Login and registration.
//!
//! There are no sessions: login only confirms the email belongs to a user
//! and returns it, and clients send the ID back as `X-User-ID`.

use axum::extract::State;
use serde::Deserialize;
use tracing::{info, instrument};

use hoby_loop_core::{Cnpj, Cpf, Email, Role};

use super::{ApiJson, non_blank};
use crate::db::UserRepository;
use crate::db::users::NewUser;
use crate::error::{ApiResponse, AppError, Result};
use crate::models::{Address, User};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub address: Address,
}

// =============================================================================
// Handlers
// =============================================================================

/// Find the user registered under an email.
///
/// # Errors
///
/// 400 for a malformed email, 401 when no user has it.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiResponse<User>> {
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::invalid("Valid email is required", e))?;

    let user = UserRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(ApiResponse::ok(user))
}

/// Register a seller or consumer.
///
/// Sellers must supply a valid CNPJ and consumers a valid CPF. The number is
/// stored with canonical punctuation.
///
/// # Errors
///
/// 400 for invalid fields, 409 if the email is taken.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<User>> {
    let new_user = validate_registration(request)?;
    let user = UserRepository::new(state.pool()).create(&new_user).await?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(ApiResponse::ok(user))
}

fn validate_registration(request: RegisterRequest) -> Result<NewUser> {
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::invalid("Valid email is required", e))?;
    if request.password.is_empty() {
        return Err(AppError::bad_request("Password is required"));
    }
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }

    let (cnpj, cpf) = match request.role {
        Role::Seller => {
            let raw = non_blank(request.cnpj)
                .ok_or_else(|| AppError::bad_request("CNPJ is required for sellers"))?;
            let cnpj = Cnpj::parse(&raw).map_err(|e| AppError::invalid("Invalid CNPJ", e))?;
            (Some(cnpj.formatted()), None)
        }
        Role::Consumer => {
            let raw = non_blank(request.cpf)
                .ok_or_else(|| AppError::bad_request("CPF is required for consumers"))?;
            let cpf = Cpf::parse(&raw).map_err(|e| AppError::invalid("Invalid CPF", e))?;
            (None, Some(cpf.formatted()))
        }
        Role::Admin => {
            return Err(AppError::bad_request(
                "Role must be either seller or consumer",
            ));
        }
    };

    Ok(NewUser {
        email,
        password: request.password,
        role: request.role,
        name,
        cnpj,
        cpf,
        address: request.address,
    })
}
