use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    clubs::repo_types::{Club, ClubDetails, ClubListing, ClubPatch, NewClub},
    error::RepoError,
};

#[async_trait]
pub trait ClubRepository: Send + Sync {
    /// Stores the club with `members = [created_by]`. A taken name is a
    /// [`RepoError::Conflict`], whether or not a pre-check ran.
    async fn create(&self, club: NewClub) -> Result<Club, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Club>, RepoError>;

    /// `createdBy` and `members` expanded to `{id, name, email}`.
    async fn find_by_id_hydrated(&self, id: Uuid) -> Result<Option<ClubDetails>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Club>, RepoError>;

    /// A club other than `exclude` already using `name`.
    async fn find_by_name_excluding(
        &self,
        name: &str,
        exclude: Uuid,
    ) -> Result<Option<Club>, RepoError>;

    /// Every club, `createdBy` reduced to `{id, name}`.
    async fn find_all(&self) -> Result<Vec<ClubListing>, RepoError>;

    async fn update(&self, id: Uuid, patch: ClubPatch) -> Result<Option<Club>, RepoError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAdded {
    Added,
    /// The club already listed the user; only a missing `clubsJoined` entry was written.
    AlreadyPresent,
    /// No club row; neither side was touched.
    NoSuchClub,
}

/// Writer for both sides of the user/club membership relation.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Adds `user_id` to `club.members` and `club_id` to `user.clubsJoined`,
    /// each only if absent, in one atomic step. Both sides are skipped when the
    /// club does not exist.
    async fn add_member(&self, club_id: Uuid, user_id: Uuid) -> Result<MemberAdded, RepoError>;

    /// Removes both sides in one atomic step. Removing a non-member is a no-op.
    async fn remove_member(&self, club_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;
}
