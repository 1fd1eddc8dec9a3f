use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::RepoError;

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Category {
    Technology,
    Music,
    Art,
    Dance,
    Literature,
    Photography,
    Drama,
    Science,
    Sports,
    Gaming,
    Business,
    Coding,
    Cultural,
    #[default]
    Others,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Technology,
        Category::Music,
        Category::Art,
        Category::Dance,
        Category::Literature,
        Category::Photography,
        Category::Drama,
        Category::Science,
        Category::Sports,
        Category::Gaming,
        Category::Business,
        Category::Coding,
        Category::Cultural,
        Category::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Music => "Music",
            Category::Art => "Art",
            Category::Dance => "Dance",
            Category::Literature => "Literature",
            Category::Photography => "Photography",
            Category::Drama => "Drama",
            Category::Science => "Science",
            Category::Sports => "Sports",
            Category::Gaming => "Gaming",
            Category::Business => "Business",
            Category::Coding => "Coding",
            Category::Cultural => "Cultural",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Invalid category {s:?}"))
    }
}

/// Club document. `C` and `M` are the shapes of `createdBy` and `members`:
/// ids when stored, selected user fields when hydrated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Club<C = Uuid, M = Uuid> {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: Category,
    pub created_by: C,
    pub members: Vec<M>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// `{id, name, email}` of a user referenced by a club.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromRow)]
pub struct MemberRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// `{id, name}` of a club's creator, as shown in listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreatorRef {
    pub id: Uuid,
    pub name: String,
}

pub type ClubDetails = Club<Option<MemberRef>, MemberRef>;
pub type ClubListing = Club<Option<CreatorRef>, Uuid>;

impl<C, M> Club<C, M> {
    pub fn hydrate<C2, M2>(self, created_by: C2, members: Vec<M2>) -> Club<C2, M2> {
        Club {
            id: self.id,
            name: self.name,
            description: self.description,
            image: self.image,
            category: self.category,
            created_by,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Club {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewClub {
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: Category,
    pub created_by: Uuid,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ClubPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub image: Option<String>,
}

impl ClubPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.image.is_none()
    }

    pub fn apply(self, club: &mut Club) {
        if let Some(name) = self.name {
            club.name = name;
        }
        if let Some(description) = self.description {
            club.description = description;
        }
        if let Some(category) = self.category {
            club.category = category;
        }
        if let Some(image) = self.image {
            club.image = image;
        }
    }
}

/// Raw `clubs` row.
#[derive(Debug, FromRow)]
pub struct ClubRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: String,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ClubRow> for Club {
    type Error = RepoError;

    fn try_from(r: ClubRow) -> Result<Self, Self::Error> {
        let category = r.category.parse().map_err(RepoError::Corrupt)?;
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            image: r.image,
            category,
            created_by: r.created_by,
            members: r.members,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// `clubs` row joined with its creator's name.
#[derive(Debug, FromRow)]
pub struct ClubListingRow {
    #[sqlx(flatten)]
    pub club: ClubRow,
    pub creator_name: Option<String>,
}

impl TryFrom<ClubListingRow> for ClubListing {
    type Error = RepoError;

    fn try_from(r: ClubListingRow) -> Result<Self, Self::Error> {
        let club = Club::try_from(r.club)?;
        let creator = r.creator_name.map(|name| CreatorRef {
            id: club.created_by,
            name,
        });
        let members = club.members.clone();
        Ok(club.hydrate(creator, members))
    }
}
