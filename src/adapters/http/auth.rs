use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};
use tracing::warn;

use crate::domain::Actor;

use super::{error::ApiError, AppState};

/// Actor resolved from the request's bearer token or `token` cookie
pub struct Authenticated(pub Actor);

#[async_trait]
impl<D> FromRequestParts<AppState<D>> for Authenticated
where
    D: Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D>,
    ) -> Result<Self, Self::Rejection> {
        let token = token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        let actor = state.auth.authenticate(&token).await.map_err(|err| {
            warn!(error = %err, "rejected token");
            ApiError::Unauthenticated
        })?;

        Ok(Self(actor))
    }
}

fn token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().strip_prefix("token="))
        .map(str::to_string)
        .find(|token| !token.is_empty())
}
