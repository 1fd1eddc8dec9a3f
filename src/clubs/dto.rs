use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::{
    auth::present,
    clubs::repo_types::{Club, ClubDetails, ClubListing, MemberRef},
    error::AppError,
};

pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("len", &self.body.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Multipart club form: text fields `name`, `description`, `category` and an
/// optional file field `image`. Blank values count as absent.
#[derive(Debug, Default)]
pub struct ClubForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ClubForm {
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = ClubForm::default();
        while let Some(field) = mp.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "name" => form.name = present(Some(field.text().await?)),
                "description" => form.description = present(Some(field.text().await?)),
                "category" => form.category = present(Some(field.text().await?)),
                "image" => {
                    let content_type = field
                        .content_type()
                        .map(str::to_owned)
                        .unwrap_or_else(|| "application/octet-stream".into());
                    let body = field.bytes().await?;
                    if !body.is_empty() {
                        form.image = Some(ImageUpload { body, content_type });
                    }
                }
                other => debug!(field = %other, "ignoring multipart field"),
            }
        }
        Ok(form)
    }
}

#[derive(Debug, Serialize)]
pub struct ClubResponse {
    pub club: Club,
}

#[derive(Debug, Serialize)]
pub struct ClubDetailsResponse {
    pub club: ClubDetails,
}

#[derive(Debug, Serialize)]
pub struct ClubListResponse {
    pub clubs: Vec<ClubListing>,
}

#[derive(Debug, Serialize)]
pub struct MyClubsResponse {
    pub clubs: Vec<Club>,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<MemberRef>,
}
