use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    models::{NewUserRecord, User, UserId},
    repo::UserRepository,
};
use crate::{
    auth::password::CredentialHash,
    error::{UserError, UserResult},
};

#[derive(Default)]
struct Table {
    next_id: UserId,
    rows: BTreeMap<UserId, (User, CredentialHash)>,
}

impl Table {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.rows
            .values()
            .any(|(u, _)| u.email == email && Some(u.id) != except)
    }
}

/// In-memory store with the same contract as the PostgreSQL table,
/// including the unique constraint on `email`.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_all(&self) -> UserResult<Vec<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().map(|(u, _)| u.clone()).collect())
    }

    async fn get_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).map(|(u, _)| u.clone()))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<(User, CredentialHash)>> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|(u, _)| u.email == email).cloned())
    }

    async fn create(&self, record: NewUserRecord) -> UserResult<User> {
        let mut table = self.table.write().await;
        if table.email_taken(&record.email, None) {
            return Err(UserError::email_taken());
        }
        table.next_id += 1;
        let user = User {
            id: table.next_id,
            name: record.name,
            email: record.email,
        };
        table
            .rows
            .insert(user.id, (user.clone(), record.password_hash));
        Ok(user)
    }

    async fn update(&self, id: UserId, name: Option<&str>, email: Option<&str>) -> UserResult<()> {
        let mut table = self.table.write().await;
        // A missing row wins over a taken email: zero rows match, nothing conflicts.
        if !table.rows.contains_key(&id) {
            return Err(UserError::NotFound);
        }
        if let Some(email) = email {
            if table.email_taken(email, Some(id)) {
                return Err(UserError::email_taken());
            }
        }
        let (user, _) = table.rows.get_mut(&id).ok_or(UserError::NotFound)?;
        if let Some(name) = name {
            user.name = name.to_string();
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: UserId) -> UserResult<()> {
        let mut table = self.table.write().await;
        table.rows.remove(&id).map(|_| ()).ok_or(UserError::NotFound)
    }

    async fn delete_by_name(&self, name: &str) -> UserResult<()> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|_, (u, _)| u.name != name);
        if table.rows.len() == before {
            return Err(UserError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, email: &str) -> NewUserRecord {
        NewUserRecord {
            name: name.into(),
            email: email.into(),
            password_hash: CredentialHash::from_stored("$argon2id$stub".into()),
        }
    }

    #[tokio::test]
    async fn ids_are_ascending_and_not_reused() {
        let repo = InMemoryUserRepository::new();
        let a = repo.create(record("A", "a@x.com")).await.unwrap();
        repo.delete_by_id(a.id).await.unwrap();
        let b = repo.create(record("B", "b@x.com")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let repo = InMemoryUserRepository::new();
        repo.create(record("A", "a@b.com")).await.unwrap();
        let err = repo.create(record("B", "a@b.com")).await.unwrap_err();
        assert!(matches!(err, UserError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found_even_with_taken_email() {
        let repo = InMemoryUserRepository::new();
        repo.create(record("A", "a@x.com")).await.unwrap();
        assert!(matches!(
            repo.update(9999, None, Some("a@x.com")).await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_of_existing_row_to_taken_email_is_conflict() {
        let repo = InMemoryUserRepository::new();
        repo.create(record("A", "a@x.com")).await.unwrap();
        let b = repo.create(record("B", "b@x.com")).await.unwrap();
        assert!(matches!(
            repo.update(b.id, None, Some("a@x.com")).await,
            Err(UserError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn delete_by_name_missing_is_not_found() {
        let repo = InMemoryUserRepository::new();
        assert!(matches!(
            repo.delete_by_name("ghost").await,
            Err(UserError::NotFound)
        ));
    }
}
