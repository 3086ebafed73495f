use std::fmt;

use serde::Deserialize;

use crate::api::AuthError;
use crate::schema::Credentials;

/// Body of a successful password-grant login.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Exchanges credentials for a bearer token.
///
/// `ApiClient` is the production implementation; tests substitute stubs.
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, AuthError>;
}
