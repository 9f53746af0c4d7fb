//! Header-based identity for the API.
//!
//! Clients identify themselves with an `X-User-ID` header. This is a
//! placeholder, not an authentication scheme: the header is trusted as-is.
//!
//! [`identity_middleware`] runs on every request. Without the header the
//! request continues anonymously; a header that is not a number or names no
//! user is rejected with 401 before any handler runs.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use hoby_loop_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// The HTTP header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user resolved from `X-User-ID`, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve `X-User-ID` to a user.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the header is malformed or unknown.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(value) = request.headers().get(USER_ID_HEADER) {
        let id = value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .map(UserId::new)
            .ok_or(AppError::Unauthorized)?;

        let user = UserRepository::new(state.pool())
            .get_by_id(id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        request.extensions_mut().insert(CurrentUser(user));
    }

    Ok(next.run(request).await)
}

/// Extractor that requires an admin caller.
///
/// No identified user is 401; a user without the `admin` role is 403.
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        if !user.role.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::response::IntoResponse;
    use chrono::Utc;

    use hoby_loop_core::{Email, Role};

    use super::*;
    use crate::models::Address;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(1),
            email: Email::parse("root@example.com").unwrap(),
            password: String::new(),
            role,
            name: "Root".to_string(),
            cnpj: None,
            cpf: None,
            is_active: true,
            permissions: None,
            address: Address::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn parts_with(user: Option<User>) -> Parts {
        let (mut parts, ()) = HttpRequest::builder()
            .uri("/admin/users")
            .body(())
            .unwrap()
            .into_parts();
        if let Some(user) = user {
            parts.extensions.insert(CurrentUser(user));
        }
        parts
    }

    #[tokio::test]
    async fn test_require_admin_without_user() {
        let mut parts = parts_with(None);
        let err = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin_rejects_other_roles() {
        let mut parts = parts_with(Some(user(Role::Seller)));
        let err = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_admin_accepts_admin() {
        let mut parts = parts_with(Some(user(Role::Admin)));
        let RequireAdmin(admin) = RequireAdmin::from_request_parts(&mut parts, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
