use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, repo_types::Role};
use crate::error::AppError;

/// Caller identity taken from the bearer token alone; the user record is not re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Only the creator of a club may mutate it.
    pub fn require_owner(&self, created_by: Uuid) -> Result<(), AppError> {
        if self.user_id != created_by {
            warn!(user_id = %self.user_id, owner = %created_by, "ownership check failed");
            return Err(AppError::forbidden(
                "Unauthorized - Only club creator can modify this club",
            ));
        }
        Ok(())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Token missing".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Token missing".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized("Invalid token".into()));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Token missing".into()));
    }
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = JwtKeys::from_ref(state).verify(token)?;
        Ok(AuthUser {
            user_id: claims.user_id,
            role: claims.role,
        })
    }
}

/// An [`AuthUser`] whose token carries `role = admin`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = %user.user_id, "admin route refused");
            return Err(AppError::forbidden("Admin access only"));
        }
        Ok(AdminUser(user))
    }
}
