use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    clubs::{
        dto::{ClubForm, ImageUpload},
        repo::MemberAdded,
        repo_types::{Category, Club, ClubPatch, NewClub, PLACEHOLDER_IMAGE},
    },
    error::AppError,
    state::AppState,
};

fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.parse().map_err(AppError::BadRequest)
}

async fn upload_image(state: &AppState, image: ImageUpload) -> Result<String, AppError> {
    if !image.content_type.starts_with("image/") {
        return Err(AppError::bad_request("Image must be an image file"));
    }
    let uploaded = state
        .images
        .upload_image(image.body, &image.content_type, &state.config.images.folder)
        .await?;
    Ok(uploaded.url)
}

/// Best effort; a failure only leaves the object behind.
async fn discard_image(state: &AppState, url: &str) {
    match state.images.delete_image(url).await {
        Ok(()) => debug!(image = %url, "removed unused upload"),
        Err(e) => warn!(error = ?e, image = %url, "unused upload left on image host"),
    }
}

async fn find_club(state: &AppState, club_id: Uuid) -> Result<Club, AppError> {
    state
        .clubs
        .find_by_id(club_id)
        .await?
        .ok_or_else(|| AppError::not_found("Club not found"))
}

/// Creates a club owned by `caller`, who also becomes its first member.
#[instrument(skip(state, form))]
pub async fn create_club(state: &AppState, caller: AuthUser, form: ClubForm) -> Result<Club, AppError> {
    let (Some(name), Some(description), Some(category)) = (form.name, form.description, form.category)
    else {
        return Err(AppError::bad_request(
            "All fields (name, description, category) are required",
        ));
    };
    let category = parse_category(&category)?;

    if state.clubs.find_by_name(&name).await?.is_some() {
        return Err(AppError::Conflict("Club with this name already exists".into()));
    }

    let uploaded = match form.image {
        Some(image) => Some(upload_image(state, image).await?),
        None => None,
    };

    let created = state
        .clubs
        .create(NewClub {
            name,
            description,
            image: uploaded.clone().unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            category,
            created_by: caller.user_id,
        })
        .await;
    // The unique index can still reject a name that passed the pre-check.
    let club = match created {
        Ok(club) => club,
        Err(e) => {
            if let Some(url) = &uploaded {
                discard_image(state, url).await;
            }
            return Err(e.into());
        }
    };

    // Records the back-reference on the creator; `members` already holds them.
    if state.membership.add_member(club.id, caller.user_id).await? == MemberAdded::NoSuchClub {
        warn!(club_id = %club.id, "club deleted before creator back-reference was written");
    }

    info!(club_id = %club.id, name = %club.name, owner = %caller.user_id, "club created");
    Ok(club)
}

#[instrument(skip(state, form))]
pub async fn update_club(
    state: &AppState,
    caller: AuthUser,
    club_id: Uuid,
    form: ClubForm,
) -> Result<Club, AppError> {
    let club = find_club(state, club_id).await?;
    caller.require_owner(club.created_by)?;

    let mut patch = ClubPatch {
        description: form.description,
        category: form.category.as_deref().map(parse_category).transpose()?,
        ..Default::default()
    };

    if let Some(name) = form.name {
        if name != club.name
            && state
                .clubs
                .find_by_name_excluding(&name, club_id)
                .await?
                .is_some()
        {
            return Err(AppError::Conflict("Club with this name already exists".into()));
        }
        patch.name = Some(name);
    }

    if let Some(image) = form.image {
        let url = upload_image(state, image).await?;
        // The previous object stays on the image host.
        debug!(%club_id, previous = %club.image, "replacing club image");
        patch.image = Some(url);
    }

    if patch.is_empty() {
        return Ok(club);
    }

    let new_image = patch.image.clone();
    let updated = match state.clubs.update(club_id, patch).await {
        Ok(Some(updated)) => updated,
        failed => {
            if let Some(url) = &new_image {
                discard_image(state, url).await;
            }
            return match failed {
                Err(e) => Err(e.into()),
                _ => Err(AppError::not_found("Club not found")),
            };
        }
    };

    info!(%club_id, "club updated");
    Ok(updated)
}

/// Removes the club record. Members' `clubsJoined` entries are left in place
/// and skipped when hydrated.
#[instrument(skip(state))]
pub async fn delete_club(state: &AppState, caller: AuthUser, club_id: Uuid) -> Result<(), AppError> {
    let club = find_club(state, club_id).await?;
    caller.require_owner(club.created_by)?;

    if !state.clubs.delete(club_id).await? {
        return Err(AppError::not_found("Club not found"));
    }

    warn!(%club_id, members = club.members.len(), "club deleted; clubsJoined entries left dangling");
    Ok(())
}
