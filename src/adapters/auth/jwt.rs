//! HS256 bearer tokens

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::{Actor, Role},
    ports::auth::{AuthPort, Error},
};

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn new(actor: Actor, expires_in: Duration) -> Self {
        Self {
            sub: actor.id(),
            role: actor.role(),
            exp: (Utc::now() + expires_in).timestamp() as usize,
        }
    }
}

/// Verifies tokens signed with a shared secret by the account service
#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `actor`
    pub fn issue(&self, actor: Actor, expires_in: Duration) -> Result<String, Error> {
        encode(
            &Header::default(),
            &Claims::new(actor, expires_in),
            &self.encoding,
        )
        .map_err(|err| Error::Adapter(Box::new(err)))
    }
}

#[async_trait::async_trait]
impl AuthPort for JwtAuth {
    async fn authenticate(&self, token: &str) -> Result<Actor, Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|err| Error::InvalidToken(err.to_string()))?;

        Ok(Actor::new(data.claims.sub, data.claims.role))
    }
}
