use axum::{
    extract::{
        multipart::MultipartRejection, rejection::PathRejection, DefaultBodyLimit, Multipart,
        Path, State,
    },
    routing::{get, post, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    clubs::{
        dto::{
            ClubDetailsResponse, ClubForm, ClubListResponse, ClubResponse, MembersResponse,
            MyClubsResponse,
        },
        membership, services,
    },
    error::AppError,
    response::{ApiResponse, Empty},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/clubs/all", get(list_clubs))
        .route("/clubs/my-clubs", get(my_clubs))
        .route("/clubs/members/:club_id", get(club_members))
        .route("/clubs/:club_id", get(get_club).delete(delete_club))
        .route("/clubs/join/:club_id", post(join_club))
        .route("/clubs/leave/:club_id", post(leave_club))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/clubs/create", post(create_club))
        .route("/clubs/update/:club_id", put(update_club))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn club_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(id) = path?;
    Ok(id)
}

#[instrument(skip(state, mp))]
pub async fn create_club(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ClubResponse>, AppError> {
    let form = ClubForm::from_multipart(mp?).await?;
    let club = services::create_club(&state, caller, form).await?;
    Ok(ApiResponse::created(
        "Club created successfully",
        ClubResponse { club },
    ))
}

#[instrument(skip(state))]
pub async fn list_clubs(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<ApiResponse<ClubListResponse>, AppError> {
    let clubs = state.clubs.find_all().await?;
    Ok(ApiResponse::ok("Clubs fetched", ClubListResponse { clubs }))
}

#[instrument(skip(state, path))]
pub async fn get_club(
    State(state): State<AppState>,
    _caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<ClubDetailsResponse>, AppError> {
    let club_id = club_id(path)?;
    let club = state
        .clubs
        .find_by_id_hydrated(club_id)
        .await?
        .ok_or_else(|| AppError::not_found("Club not found"))?;
    Ok(ApiResponse::ok("Club fetched", ClubDetailsResponse { club }))
}

#[instrument(skip(state, path))]
pub async fn club_members(
    State(state): State<AppState>,
    _admin: AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<MembersResponse>, AppError> {
    let club_id = club_id(path)?;
    let club = state
        .clubs
        .find_by_id_hydrated(club_id)
        .await?
        .ok_or_else(|| AppError::not_found("Club not found"))?;
    Ok(ApiResponse::ok(
        "Members fetched",
        MembersResponse {
            members: club.members,
        },
    ))
}

#[instrument(skip(state, path, mp))]
pub async fn update_club(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ClubResponse>, AppError> {
    let club_id = club_id(path)?;
    let form = ClubForm::from_multipart(mp?).await?;
    let club = services::update_club(&state, caller, club_id, form).await?;
    Ok(ApiResponse::ok("Club updated successfully", ClubResponse { club }))
}

#[instrument(skip(state, path))]
pub async fn delete_club(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Empty>, AppError> {
    let club_id = club_id(path)?;
    services::delete_club(&state, caller, club_id).await?;
    Ok(ApiResponse::message("Club deleted"))
}

#[instrument(skip(state, path))]
pub async fn join_club(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Empty>, AppError> {
    let club_id = club_id(path)?;
    membership::join(&state, caller.user_id, club_id).await?;
    Ok(ApiResponse::message("Club joined successfully"))
}

#[instrument(skip(state, path))]
pub async fn leave_club(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Empty>, AppError> {
    let club_id = club_id(path)?;
    membership::leave(&state, caller.user_id, club_id).await?;
    Ok(ApiResponse::message("Left club successfully"))
}

#[instrument(skip(state))]
pub async fn my_clubs(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<ApiResponse<MyClubsResponse>, AppError> {
    let user = state
        .users
        .find_by_id_hydrated(caller.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ApiResponse::ok(
        "Clubs fetched",
        MyClubsResponse {
            clubs: user.clubs_joined,
        },
    ))
}
