//! Session and credential handling for the Tally API client
//!
//! Owns everything token-shaped: the redacting `SecretString`, the
//! `AccessToken` with lazily decoded JWT claims, the refresh endpoint call,
//! the `TokenStore` contract matching platform keychain wrappers, and the
//! `SessionStore` that keeps the live session pair and the secure store
//! consistent. This crate has no opinion on retries or error taxonomy; that
//! lives in the client crate.
//!
//! Session flow:
//! 1. App shells implement `TokenStore` over the platform keychain, or use
//!    the provided file/memory stores
//! 2. `SessionStore::load()` hydrates the session pair at startup
//! 3. Login/register screens hand the server's tokens to
//!    `SessionStore::install()`
//! 4. The client's refresh coordinator calls `token::refresh_session()` and
//!    persists the grant via `SessionStore::apply_refresh()`
//! 5. Logout or refresh failure calls `SessionStore::clear()`

pub mod error;
pub mod secret;
pub mod session;
pub mod store;
pub mod token;

pub use error::{Error, Result};
pub use secret::SecretString;
pub use session::{Session, SessionStore};
pub use store::{
    ACCESS_TOKEN_KEY, FileTokenStore, MemoryTokenStore, REFRESH_TOKEN_KEY, TokenStore,
};
pub use token::{AccessToken, Claims, RefreshGrant, refresh_session};
