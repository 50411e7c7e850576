use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use super::models::{NewUserRecord, User, UserId};
use crate::{
    auth::password::CredentialHash,
    error::{UserError, UserResult},
};

/// The only way user rows are read or written.
///
/// Every method is a single statement. Zero affected rows on update/delete is
/// [`UserError::NotFound`]; a uniqueness violation on `email` is
/// [`UserError::Conflict`]; any other store failure is [`UserError::Persistence`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, ordered by id ascending.
    async fn get_all(&self) -> UserResult<Vec<User>>;

    async fn get_by_id(&self, id: UserId) -> UserResult<Option<User>>;

    /// The one lookup that returns credential material; used for login and the create pre-check.
    async fn get_by_email(&self, email: &str) -> UserResult<Option<(User, CredentialHash)>>;

    /// Inserts the row and returns it with the store-assigned id.
    async fn create(&self, record: NewUserRecord) -> UserResult<User>;

    /// Sets name and/or email; `None` keeps the stored value.
    async fn update(&self, id: UserId, name: Option<&str>, email: Option<&str>) -> UserResult<()>;

    async fn delete_by_id(&self, id: UserId) -> UserResult<()>;

    async fn delete_by_name(&self, name: &str) -> UserResult<()>;
}

#[derive(FromRow)]
struct CredentialRow {
    id: UserId,
    name: String,
    email: String,
    password_hash: String,
}

impl CredentialRow {
    fn into_parts(self) -> (User, CredentialHash) {
        (
            User {
                id: self.id,
                name: self.name,
                email: self.email,
            },
            CredentialHash::from_stored(self.password_hash),
        )
    }
}

pub(crate) fn map_db_error(e: sqlx::Error) -> UserError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            debug!(constraint = ?db.constraint(), "unique violation");
            return UserError::email_taken();
        }
    }
    UserError::Persistence(e.to_string())
}

fn expect_affected(rows: u64) -> UserResult<()> {
    if rows == 0 {
        Err(UserError::NotFound)
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_all(&self) -> UserResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(users)
    }

    async fn get_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<(User, CredentialHash)>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, name, email, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(CredentialRow::into_parts))
    }

    async fn create(&self, record: NewUserRecord) -> UserResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email
            "#,
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(record.password_hash.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(user)
    }

    async fn update(&self, id: UserId, name: Option<&str>, email: Option<&str>) -> UserResult<()> {
        let done = sqlx::query(
            r#"
            UPDATE users
               SET name = COALESCE($1, name),
                   email = COALESCE($2, email)
             WHERE id = $3
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_db_error)?;
        expect_affected(done.rows_affected())
    }

    async fn delete_by_id(&self, id: UserId) -> UserResult<()> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;
        expect_affected(done.rows_affected())
    }

    async fn delete_by_name(&self, name: &str) -> UserResult<()> {
        let done = sqlx::query("DELETE FROM users WHERE name = $1")
            .bind(name)
            .execute(&self.db)
            .await
            .map_err(map_db_error)?;
        expect_affected(done.rows_affected())
    }
}
