//! Authentication module for managing the user session and its token.
//!
//! This module provides:
//! - `SessionManager`: owns the session and its hydrate/login/logout lifecycle
//! - `CredentialStore`: single-slot token persistence (file, keychain, memory)
//! - `decode_claims`: unverified token payload decoding
//!
//! Stored tokens expire one day after login.

mod authenticator;
pub mod claims;
pub mod credentials;
pub mod session;

pub use authenticator::{AccessToken, Authenticator};
pub use claims::{decode_claims, DecodeError, TokenClaims};
pub use credentials::{
    CookieAttributes, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, SameSite, StoreError, StoredCredential,
};
pub use session::{ClaimsPolicy, Session, SessionManager, SessionPhase};
