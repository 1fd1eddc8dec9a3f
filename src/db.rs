use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepository,
        repo_types::{NewUser, User, UserProfile, UserRow},
    },
    clubs::{
        repo::{ClubRepository, MemberAdded, MembershipStore},
        repo_types::{
            Club, ClubDetails, ClubListing, ClubListingRow, ClubPatch, ClubRow, MemberRef, NewClub,
        },
    },
    config::AppConfig,
    error::RepoError,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, clubs_joined, created_at";
const CLUB_COLUMNS: &str =
    "id, name, description, image, category, created_by, members, created_at, updated_at";
const APPEND_JOINED_CLUB: &str = "UPDATE users
    SET clubs_joined = array_append(clubs_joined, $2)
  WHERE id = $1 AND NOT ($2 = ANY(clubs_joined))";
const CLUB_COLUMNS_C: &str = "c.id, c.name, c.description, c.image, c.category, c.created_by, \
     c.members, c.created_at, c.updated_at";

/// Users and clubs in Postgres; each adjacency set is a `UUID[]` column.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    async fn clubs_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Club>, RepoError> {
        let sql = format!(
            "SELECT {CLUB_COLUMNS_C}
               FROM unnest($1::uuid[]) WITH ORDINALITY AS j(club_id, ord)
               JOIN clubs c ON c.id = j.club_id
              ORDER BY j.ord"
        );
        let rows = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(Club::try_from).collect()
    }

    async fn member_refs(&self, ids: &[Uuid]) -> Result<Vec<MemberRef>, RepoError> {
        let rows = sqlx::query_as::<_, MemberRef>(
            r#"
            SELECT u.id, u.name, u.email
              FROM unnest($1::uuid[]) WITH ORDINALITY AS j(user_id, ord)
              JOIN users u ON u.id = j.user_id
             ORDER BY j.ord
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

fn unique_violation(e: sqlx::Error, message: &str) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(message.to_string())
        }
        _ => RepoError::Database(e),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(|e| unique_violation(e, "User already exists"))?;
        User::try_from(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id_hydrated(&self, id: Uuid) -> Result<Option<UserProfile>, RepoError> {
        let Some(user) = UserRepository::find_by_id(self, id).await? else {
            return Ok(None);
        };
        let clubs = self.clubs_by_ids(&user.clubs_joined).await?;
        Ok(Some(user.into_profile(clubs)))
    }
}

#[async_trait]
impl ClubRepository for PgStore {
    async fn create(&self, club: NewClub) -> Result<Club, RepoError> {
        let sql = format!(
            "INSERT INTO clubs (id, name, description, image, category, created_by, members)
             VALUES ($1, $2, $3, $4, $5, $6, ARRAY[$6]::uuid[])
             RETURNING {CLUB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&club.name)
            .bind(&club.description)
            .bind(&club.image)
            .bind(club.category.as_str())
            .bind(club.created_by)
            .fetch_one(&self.db)
            .await
            .map_err(|e| unique_violation(e, "Club with this name already exists"))?;
        Club::try_from(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Club>, RepoError> {
        let sql = format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = $1");
        let row = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Club::try_from).transpose()
    }

    async fn find_by_id_hydrated(&self, id: Uuid) -> Result<Option<ClubDetails>, RepoError> {
        let Some(club) = ClubRepository::find_by_id(self, id).await? else {
            return Ok(None);
        };
        let creator = sqlx::query_as::<_, MemberRef>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(club.created_by)
        .fetch_optional(&self.db)
        .await?;
        let members = self.member_refs(&club.members).await?;
        Ok(Some(club.hydrate(creator, members)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Club>, RepoError> {
        let sql = format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE name = $1");
        let row = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        row.map(Club::try_from).transpose()
    }

    async fn find_by_name_excluding(
        &self,
        name: &str,
        exclude: Uuid,
    ) -> Result<Option<Club>, RepoError> {
        let sql = format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE name = $1 AND id <> $2");
        let row = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(name)
            .bind(exclude)
            .fetch_optional(&self.db)
            .await?;
        row.map(Club::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<ClubListing>, RepoError> {
        let sql = format!(
            "SELECT {CLUB_COLUMNS_C}, u.name AS creator_name
               FROM clubs c
               LEFT JOIN users u ON u.id = c.created_by
              ORDER BY c.created_at ASC"
        );
        let rows = sqlx::query_as::<_, ClubListingRow>(&sql)
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(ClubListing::try_from).collect()
    }

    async fn update(&self, id: Uuid, patch: ClubPatch) -> Result<Option<Club>, RepoError> {
        let sql = format!(
            "UPDATE clubs
                SET name = COALESCE($2, name),
                    description = COALESCE($3, description),
                    category = COALESCE($4, category),
                    image = COALESCE($5, image),
                    updated_at = now()
              WHERE id = $1
              RETURNING {CLUB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ClubRow>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.description)
            .bind(patch.category.map(|c| c.as_str()))
            .bind(patch.image)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| unique_violation(e, "Club with this name already exists"))?;
        row.map(Club::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM clubs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn add_member(&self, club_id: Uuid, user_id: Uuid) -> Result<MemberAdded, RepoError> {
        let mut tx = self.db.begin().await?;
        // Row lock keeps a concurrent delete from landing between the two writes.
        let members: Option<Vec<Uuid>> =
            sqlx::query_scalar("SELECT members FROM clubs WHERE id = $1 FOR UPDATE")
                .bind(club_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(members) = members else {
            tx.rollback().await?;
            return Ok(MemberAdded::NoSuchClub);
        };

        let outcome = if members.contains(&user_id) {
            MemberAdded::AlreadyPresent
        } else {
            sqlx::query(
                "UPDATE clubs SET members = array_append(members, $2), updated_at = now() WHERE id = $1",
            )
            .bind(club_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            MemberAdded::Added
        };
        sqlx::query(APPEND_JOINED_CLUB)
            .bind(user_id)
            .bind(club_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn remove_member(&self, club_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            UPDATE clubs
               SET members = array_remove(members, $2), updated_at = now()
             WHERE id = $1 AND $2 = ANY(members)
            "#,
        )
        .bind(club_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE users SET clubs_joined = array_remove(clubs_joined, $2) WHERE id = $1")
            .bind(user_id)
            .bind(club_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
