//! Join/leave protocol. Sole writer of the user/club membership relation:
//! `user ∈ club.members ⇔ club ∈ user.clubsJoined` holds whenever these return.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::repo_types::User,
    clubs::{repo::MemberAdded, repo_types::Club},
    error::AppError,
    state::AppState,
};

async fn load_pair(state: &AppState, user_id: Uuid, club_id: Uuid) -> Result<(Club, User), AppError> {
    let club = state.clubs.find_by_id(club_id).await?;
    let user = state.users.find_by_id(user_id).await?;
    match (club, user) {
        (Some(club), Some(user)) => Ok((club, user)),
        _ => Err(AppError::not_found("Club or user not found")),
    }
}

#[instrument(skip(state))]
pub async fn join(state: &AppState, user_id: Uuid, club_id: Uuid) -> Result<(), AppError> {
    let (club, user) = load_pair(state, user_id, club_id).await?;

    // Conditional on both sides; a concurrent join of the same pair sees
    // `AlreadyPresent`, a concurrent delete sees `NoSuchClub`.
    match state.membership.add_member(club_id, user_id).await? {
        MemberAdded::Added => {
            info!(%user_id, %club_id, members = club.members.len() + 1, "joined club");
            Ok(())
        }
        MemberAdded::AlreadyPresent => {
            if club.has_member(user_id) && !user.has_joined(club_id) {
                warn!(%user_id, %club_id, "repaired missing clubsJoined entry");
            }
            Err(AppError::AlreadyMember)
        }
        MemberAdded::NoSuchClub => {
            warn!(%user_id, %club_id, "club deleted during join");
            Err(AppError::not_found("Club or user not found"))
        }
    }
}

/// Idempotent: leaving a club one is not in succeeds without changing state.
#[instrument(skip(state))]
pub async fn leave(state: &AppState, user_id: Uuid, club_id: Uuid) -> Result<(), AppError> {
    let (club, user) = load_pair(state, user_id, club_id).await?;

    if !club.has_member(user_id) && !user.has_joined(club_id) {
        info!(%user_id, %club_id, "leave on non-member; nothing to do");
        return Ok(());
    }

    state.membership.remove_member(club_id, user_id).await?;
    info!(%user_id, %club_id, "left club");
    Ok(())
}
