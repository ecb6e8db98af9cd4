pub mod credential_service;
pub mod token_models;
pub mod token_store;

pub use credential_service::{
    AccessTokenSource, CredentialProvider, InteractiveAuthorizer, TokenRefresher,
};
pub use token_models::{RefreshedToken, Token};
pub use token_store::{AuthError, TokenStore};
