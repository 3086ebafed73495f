use std::fmt;

use super::ValidationErrors;

pub const USERNAME_REQUIRED: &str = "Username is required";
pub const PASSWORD_REQUIRED: &str = "Password is required";

/// Raw login form input.
#[derive(Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Credentials that passed the login schema.
///
/// Never persisted; dropped once the login request resolves.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn validate(form: LoginForm) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if form.username.is_empty() {
            errors.push("username", USERNAME_REQUIRED);
        }
        if form.password.is_empty() {
            errors.push("password", PASSWORD_REQUIRED);
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            username: form.username,
            password: form.password,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
