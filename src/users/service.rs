use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    models::{NewUser, NewUserRecord, User, UserChanges, UserId},
    repo::UserRepository,
    validator,
};
use crate::{
    auth::{
        password::{hash_password, verify_password, verify_unknown_user},
        tokens::TokenService,
    },
    error::{UserError, UserResult},
};

/// Business rules for users. Nothing returned from here carries a credential hash.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    tokens: TokenService,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, tokens: TokenService) -> Self {
        Self { repo, tokens }
    }

    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.repo.get_all().await
    }

    pub async fn get_user(&self, id: UserId) -> UserResult<User> {
        self.repo.get_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// The email pre-check is only a fast path: two concurrent creates can both
    /// pass it, and the store's unique constraint then rejects one of them
    /// with the same `Conflict`.
    pub async fn create_user(&self, input: NewUser) -> UserResult<User> {
        validator::validate_for_create(&input)?;

        if self.repo.get_by_email(&input.email).await?.is_some() {
            warn!("create rejected: email already exists");
            return Err(UserError::email_taken());
        }

        let password_hash =
            hash_password(&input.password).map_err(|e| UserError::PasswordHash(e.to_string()))?;

        let user = self
            .repo
            .create(NewUserRecord {
                name: input.name,
                email: input.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Applies name/email. A password in `changes` is validated but never stored here.
    pub async fn update_user(&self, id: UserId, changes: UserChanges) -> UserResult<()> {
        validator::validate_for_update(&changes)?;
        self.repo.update(id, changes.name(), changes.email()).await?;
        info!(user_id = id, "user updated");
        Ok(())
    }

    pub async fn delete_by_id(&self, id: UserId) -> UserResult<()> {
        self.repo.delete_by_id(id).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn delete_by_name(&self, name: &str) -> UserResult<()> {
        self.repo.delete_by_name(name).await?;
        info!("users deleted by name");
        Ok(())
    }

    /// Unknown email and wrong password return the same error after the same argon2 work.
    pub async fn authenticate(&self, email: &str, password: &str) -> UserResult<String> {
        let Some((user, hash)) = self.repo.get_by_email(email).await? else {
            debug!("login for unknown email");
            verify_unknown_user(password);
            return Err(UserError::InvalidCredentials);
        };

        let ok = verify_password(password, &hash)
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(UserError::InvalidCredentials);
        }

        self.tokens
            .generate(user.id, &user.email)
            .map_err(|e| UserError::Signing(e.to_string()))
    }
}
