use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{present, LoginRequest, ProfileResponse, SignupRequest, TokenResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{NewUser, Role},
    },
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<ApiResponse<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let (Some(name), Some(email), Some(password), Some(role)) = (
        present(payload.name),
        present(payload.email),
        present(payload.password),
        present(payload.role),
    ) else {
        return Err(AppError::bad_request("All fields are required"));
    };

    let role: Role = role.parse().map_err(AppError::BadRequest)?;
    if role == Role::Admin && !state.config.allow_admin_signup {
        warn!(email = %email, "admin signup refused");
        return Err(AppError::forbidden("Admin accounts cannot be created by signup"));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&password).await?;
    // The unique index still wins a race between two signups.
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?;

    let token = JwtKeys::from_ref(&state).sign(user.id, user.role)?;

    info!(user_id = %user.id, role = %user.role, "user signed up");
    Ok(ApiResponse::created(
        "User registered successfully",
        TokenResponse { token },
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let (Some(email), Some(password)) = (present(payload.email), present(payload.password))
    else {
        return Err(AppError::bad_request("Email and password required"));
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::not_found("User not found"));
    };

    if !verify_password(&password, &user.password_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id, user.role)?;

    info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok("Login successful", TokenResponse { token }))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<ProfileResponse>, AppError> {
    let user = state
        .users
        .find_by_id_hydrated(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(ApiResponse::ok("Profile fetched", ProfileResponse { user }))
}
