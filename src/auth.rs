use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Actor,
    routes::AppState,
};

/// Resolves bearer credentials to an actor
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Returns `None` when the token is not valid
    fn authenticate(&self, token: &str) -> Option<Actor>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
    pub exp: usize,
}

/// Validates HS256 tokens signed with a secret shared with the issuer
pub struct JwtIdentity {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl JwtIdentity {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signs a token for `actor` that expires after `ttl`
    pub fn issue(&self, actor: &Actor, ttl: Duration) -> AppResult<String> {
        let claims = Claims {
            sub: actor.id.to_string(),
            username: actor.username.clone(),
            is_staff: actor.is_staff,
            exp: (Utc::now() + ttl).timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AppError::Token)
    }
}

impl IdentityProvider for JwtIdentity {
    fn authenticate(&self, token: &str) -> Option<Actor> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| tracing::debug!(error = %e, "Rejected bearer token"))
            .ok()?;

        let id = Uuid::parse_str(&data.claims.sub).ok()?;
        Some(Actor {
            id,
            username: data.claims.username,
            is_staff: data.claims.is_staff,
        })
    }
}

/// The caller's identity, or `None` for anonymous requests
///
/// Requests without an `Authorization` header are anonymous. A header that is
/// present but malformed, or carries a token the identity provider rejects,
/// fails the request with 401.
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing or invalid Authorization header".into()))?;

        state
            .identity
            .authenticate(token)
            .map(|actor| Self(Some(actor)))
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/stream");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn state(identity: impl IdentityProvider + 'static) -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(identity),
        ))
    }

    #[test]
    fn test_issue_and_authenticate() {
        let identity = JwtIdentity::new("s3cret");
        let actor = Actor::new("jude", true);

        let token = identity.issue(&actor, Duration::hours(1)).unwrap();
        assert_eq!(identity.authenticate(&token), Some(actor));
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let actor = Actor::new("jude", false);
        let token = JwtIdentity::new("other")
            .issue(&actor, Duration::hours(1))
            .unwrap();
        assert_eq!(JwtIdentity::new("s3cret").authenticate(&token), None);
    }

    #[test]
    fn test_rejects_expired_token() {
        let identity = JwtIdentity::new("s3cret");
        let token = identity
            .issue(&Actor::new("jude", false), Duration::hours(-2))
            .unwrap();
        assert_eq!(identity.authenticate(&token), None);
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_authenticate().never();

        let actor = CurrentActor::from_request_parts(&mut parts(None), &state(identity))
            .await
            .unwrap();
        assert!(actor.0.is_none());
    }

    #[tokio::test]
    async fn test_bearer_token_resolves_actor() {
        let expected = Actor::new("jude", false);
        let returned = expected.clone();

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_authenticate()
            .withf(|token: &str| token == "good-token")
            .return_once(move |_| Some(returned));

        let actor = CurrentActor::from_request_parts(
            &mut parts(Some("Bearer good-token")),
            &state(identity),
        )
        .await
        .unwrap();
        assert_eq!(actor.0, Some(expected));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_authenticate().returning(|_| None);
        let state = state(identity);

        for header in ["Bearer expired", "Token abc", "Bearer "] {
            let result = CurrentActor::from_request_parts(&mut parts(Some(header)), &state).await;
            assert!(
                matches!(result, Err(AppError::Unauthorized(_))),
                "{} should be rejected",
                header
            );
        }
    }
}
