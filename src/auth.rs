//! Identity and credential primitives for the docs client.

pub mod app;
pub mod credential;
pub mod secret;

pub use app::{AppId, AppIdentity, AppSecret, IdentifierError};
pub use credential::{Credential, CredentialBuilder, CredentialBuilderError};
pub use secret::TokenSecret;
