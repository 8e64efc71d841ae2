use crate::domain::Actor;

#[mockall::automock]
#[async_trait::async_trait]
pub trait AuthPort {
    /// Resolve a bearer token into the actor it was issued for
    async fn authenticate(&self, token: &str) -> Result<Actor, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token is malformed, expired or not signed by a trusted issuer
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
