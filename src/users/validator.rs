//! Accept/reject checks for submitted user fields. Nothing here touches the
//! store or rewrites its input.

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{NewUser, UserChanges};
use crate::error::{UserError, UserResult};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn password_long_enough(password: &str) -> bool {
    password.trim().chars().count() >= MIN_PASSWORD_LEN
}

fn invalid(reason: &str) -> UserError {
    UserError::Validation(reason.into())
}

/// Checks run name, then email, then password; the first failure is reported.
pub fn validate_for_create(user: &NewUser) -> UserResult<()> {
    if user.name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    if user.email.trim().is_empty() {
        return Err(invalid("email is required"));
    }
    if !is_valid_email(&user.email) {
        return Err(invalid("invalid email format"));
    }
    if !password_long_enough(&user.password) {
        return Err(invalid("password must be at least 6 characters"));
    }
    Ok(())
}

pub fn validate_for_update(changes: &UserChanges) -> UserResult<()> {
    if let Some(name) = changes.name() {
        if name.trim().is_empty() {
            return Err(invalid("invalid name"));
        }
    }
    if let Some(email) = changes.email() {
        if !is_valid_email(email) {
            return Err(invalid("invalid email format"));
        }
    }
    if let Some(password) = changes.password() {
        if !password_long_enough(password) {
            return Err(invalid("password must be at least 6 characters"));
        }
    }
    Ok(())
}
