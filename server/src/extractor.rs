use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use uuid::Uuid;

/// Acting user for the request.
///
/// Authentication happens in front of this service; the resolved account
/// ID is forwarded as the `X-User-Id` header. Role and permissions are
/// resolved from the user record, not trusted from the client.
pub struct Actor(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(Actor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
