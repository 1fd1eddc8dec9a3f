use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepository,
        repo_types::{NewUser, User, UserProfile},
    },
    clubs::{
        repo::{ClubRepository, MemberAdded, MembershipStore},
        repo_types::{Club, ClubDetails, ClubListing, ClubPatch, CreatorRef, MemberRef, NewClub},
    },
    error::RepoError,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    clubs: HashMap<Uuid, Club>,
}

impl Tables {
    fn member_ref(&self, id: Uuid) -> Option<MemberRef> {
        self.users.get(&id).map(|u| MemberRef {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        })
    }

    fn name_taken(&self, name: &str, exclude: Option<Uuid>) -> Option<&Club> {
        self.clubs
            .values()
            .find(|c| c.name == name && Some(c.id) != exclude)
    }
}

/// Process-local store with the same constraints as [`crate::db::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict("User already exists".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            clubs_joined: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_id_hydrated(&self, id: Uuid) -> Result<Option<UserProfile>, RepoError> {
        let t = self.tables.read().await;
        let Some(user) = t.users.get(&id).cloned() else {
            return Ok(None);
        };
        let clubs = user
            .clubs_joined
            .iter()
            .filter_map(|cid| t.clubs.get(cid).cloned())
            .collect();
        Ok(Some(user.into_profile(clubs)))
    }
}

#[async_trait]
impl ClubRepository for MemoryStore {
    async fn create(&self, club: NewClub) -> Result<Club, RepoError> {
        let mut t = self.tables.write().await;
        if t.name_taken(&club.name, None).is_some() {
            return Err(RepoError::Conflict(
                "Club with this name already exists".into(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        let club = Club {
            id: Uuid::new_v4(),
            name: club.name,
            description: club.description,
            image: club.image,
            category: club.category,
            created_by: club.created_by,
            members: vec![club.created_by],
            created_at: now,
            updated_at: now,
        };
        t.clubs.insert(club.id, club.clone());
        Ok(club)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Club>, RepoError> {
        Ok(self.tables.read().await.clubs.get(&id).cloned())
    }

    async fn find_by_id_hydrated(&self, id: Uuid) -> Result<Option<ClubDetails>, RepoError> {
        let t = self.tables.read().await;
        let Some(club) = t.clubs.get(&id).cloned() else {
            return Ok(None);
        };
        let creator = t.member_ref(club.created_by);
        let members = club
            .members
            .iter()
            .filter_map(|uid| t.member_ref(*uid))
            .collect();
        Ok(Some(club.hydrate(creator, members)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Club>, RepoError> {
        Ok(self.tables.read().await.name_taken(name, None).cloned())
    }

    async fn find_by_name_excluding(
        &self,
        name: &str,
        exclude: Uuid,
    ) -> Result<Option<Club>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .name_taken(name, Some(exclude))
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<ClubListing>, RepoError> {
        let t = self.tables.read().await;
        let mut clubs: Vec<Club> = t.clubs.values().cloned().collect();
        clubs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(clubs
            .into_iter()
            .map(|club| {
                let creator = t.users.get(&club.created_by).map(|u| CreatorRef {
                    id: u.id,
                    name: u.name.clone(),
                });
                let members = club.members.clone();
                club.hydrate(creator, members)
            })
            .collect())
    }

    async fn update(&self, id: Uuid, patch: ClubPatch) -> Result<Option<Club>, RepoError> {
        let mut t = self.tables.write().await;
        if let Some(name) = &patch.name {
            if t.name_taken(name, Some(id)).is_some() {
                return Err(RepoError::Conflict(
                    "Club with this name already exists".into(),
                ));
            }
        }
        let Some(club) = t.clubs.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(club);
        club.updated_at = OffsetDateTime::now_utc();
        Ok(Some(club.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.tables.write().await.clubs.remove(&id).is_some())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn add_member(&self, club_id: Uuid, user_id: Uuid) -> Result<MemberAdded, RepoError> {
        let mut t = self.tables.write().await;
        let Some(club) = t.clubs.get_mut(&club_id) else {
            return Ok(MemberAdded::NoSuchClub);
        };
        let outcome = if club.members.contains(&user_id) {
            MemberAdded::AlreadyPresent
        } else {
            club.members.push(user_id);
            club.updated_at = OffsetDateTime::now_utc();
            MemberAdded::Added
        };
        if let Some(user) = t.users.get_mut(&user_id) {
            if !user.clubs_joined.contains(&club_id) {
                user.clubs_joined.push(club_id);
            }
        }
        Ok(outcome)
    }

    async fn remove_member(&self, club_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut t = self.tables.write().await;
        if let Some(club) = t.clubs.get_mut(&club_id) {
            if club.members.contains(&user_id) {
                club.members.retain(|m| *m != user_id);
                club.updated_at = OffsetDateTime::now_utc();
            }
        }
        if let Some(user) = t.users.get_mut(&user_id) {
            user.clubs_joined.retain(|c| *c != club_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::repo_types::Role, clubs::repo_types::Category};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "n".into(),
            email: email.into(),
            password_hash: "h".into(),
            role: Role::Member,
        }
    }

    fn new_club(name: &str, owner: Uuid) -> NewClub {
        NewClub {
            name: name.into(),
            description: "d".into(),
            image: "img".into(),
            category: Category::Music,
            created_by: owner,
        }
    }

    #[tokio::test]
    async fn email_and_name_are_unique() {
        let store = MemoryStore::new();
        let u = UserRepository::create(&store, new_user("a@x")).await.unwrap();
        assert!(matches!(
            UserRepository::create(&store, new_user("a@x")).await,
            Err(RepoError::Conflict(_))
        ));

        let c = ClubRepository::create(&store, new_club("Chess", u.id)).await.unwrap();
        assert_eq!(c.members, vec![u.id]);
        assert!(matches!(
            ClubRepository::create(&store, new_club("Chess", u.id)).await,
            Err(RepoError::Conflict(_))
        ));

        let other = ClubRepository::create(&store, new_club("Go", u.id)).await.unwrap();
        let renamed = ClubPatch {
            name: Some("Chess".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(other.id, renamed).await,
            Err(RepoError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn add_member_is_add_if_absent() {
        let store = MemoryStore::new();
        let owner = UserRepository::create(&store, new_user("o@x")).await.unwrap();
        let m = UserRepository::create(&store, new_user("m@x")).await.unwrap();
        let club = ClubRepository::create(&store, new_club("Chess", owner.id)).await.unwrap();

        assert_eq!(store.add_member(club.id, m.id).await.unwrap(), MemberAdded::Added);
        assert_eq!(
            store.add_member(club.id, m.id).await.unwrap(),
            MemberAdded::AlreadyPresent
        );

        let club = ClubRepository::find_by_id(&store, club.id).await.unwrap().unwrap();
        assert_eq!(club.members, vec![owner.id, m.id]);
        let m = UserRepository::find_by_id(&store, m.id).await.unwrap().unwrap();
        assert_eq!(m.clubs_joined, vec![club.id]);
    }

    #[tokio::test]
    async fn add_member_to_missing_club_writes_nothing() {
        let store = MemoryStore::new();
        let u = UserRepository::create(&store, new_user("u@x")).await.unwrap();

        let outcome = store.add_member(Uuid::new_v4(), u.id).await.unwrap();
        assert_eq!(outcome, MemberAdded::NoSuchClub);
        let u = UserRepository::find_by_id(&store, u.id).await.unwrap().unwrap();
        assert!(u.clubs_joined.is_empty());
    }

    #[tokio::test]
    async fn hydration_skips_dangling_ids() {
        let store = MemoryStore::new();
        let owner = UserRepository::create(&store, new_user("o@x")).await.unwrap();
        let club = ClubRepository::create(&store, new_club("Chess", owner.id)).await.unwrap();
        store.add_member(club.id, owner.id).await.unwrap();
        assert!(store.delete(club.id).await.unwrap());

        let user = UserRepository::find_by_id(&store, owner.id).await.unwrap().unwrap();
        assert_eq!(user.clubs_joined, vec![club.id]);
        let profile = UserRepository::find_by_id_hydrated(&store, owner.id)
            .await
            .unwrap()
            .unwrap();
        assert!(profile.clubs_joined.is_empty());
    }
}
