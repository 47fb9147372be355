//! Principal extraction for Axum
//!
//! Credential verification happens in the upstream auth subsystem before
//! requests reach the bus. This extractor only carries the opaque principal
//! token through for logging and attribution; it never rejects a request.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

/// Opaque authenticated principal supplied by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct Principal(pub Option<String>);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).to_string());
        Ok(Principal(token))
    }
}
