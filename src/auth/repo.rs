use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, User, UserProfile},
    error::RepoError,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`RepoError::Conflict`] when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// The user with `clubsJoined` expanded; ids of deleted clubs are skipped.
    async fn find_by_id_hydrated(&self, id: Uuid) -> Result<Option<UserProfile>, RepoError>;
}
