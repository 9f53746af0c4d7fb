//! Profile updates.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use hoby_loop_core::{Cnpj, Cpf, Email, UserId};

use super::{ApiJson, ApiPath, non_blank};
use crate::db::{RepositoryError, UserRepository};
use crate::db::users::ProfileUpdate;
use crate::error::{ApiResponse, AppError, Result};
use crate::models::{Address, User};
use crate::state::AppState;

/// Fields a user may change. Absent or blank fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cnpj: Option<String>,
    pub cpf: Option<String>,
    pub address: Option<Address>,
}

/// Update a user's profile.
///
/// # Errors
///
/// 404 for an unknown user, 400 for a malformed email or tax ID, 409 if the
/// new email belongs to someone else.
#[instrument(skip(state, request))]
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<ApiResponse<User>> {
    let update = profile_update(request)?;

    let user = UserRepository::new(state.pool())
        .update_profile(id, &update)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".into()),
            other => other.into(),
        })?;

    Ok(ApiResponse::ok(user))
}

fn profile_update(request: UpdateUserRequest) -> Result<ProfileUpdate> {
    let email = non_blank(request.email)
        .map(|raw| Email::parse(&raw))
        .transpose()
        .map_err(|e| AppError::invalid("Valid email is required", e))?;
    let cnpj = non_blank(request.cnpj)
        .map(|raw| Cnpj::parse(&raw).map(|c| c.formatted()))
        .transpose()
        .map_err(|e| AppError::invalid("Invalid CNPJ", e))?;
    let cpf = non_blank(request.cpf)
        .map(|raw| Cpf::parse(&raw).map(|c| c.formatted()))
        .transpose()
        .map_err(|e| AppError::invalid("Invalid CPF", e))?;

    Ok(ProfileUpdate {
        name: non_blank(request.name).map(|n| n.trim().to_string()),
        email,
        cnpj,
        cpf,
        address: request.address,
    })
}
