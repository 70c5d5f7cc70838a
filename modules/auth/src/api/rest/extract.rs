//! Bearer-token extractors for REST handlers.
//!
//! Routes using them must carry an `Extension<Arc<dyn TokenVerifier>>`.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
};
use modkit::ProblemResponse;

use crate::contract::client::TokenVerifier;
use crate::contract::error::TokenError;
use crate::contract::model::Principal;

/// Any authenticated caller. Rejects with 401 and `WWW-Authenticate: Bearer`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// An authenticated caller holding the `Admin` role. Non-admins get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();

        let Some(verifier) = parts.extensions.get::<Arc<dyn TokenVerifier>>().cloned() else {
            tracing::error!(path = %instance, "route is missing the token verifier extension");
            return Err(ProblemResponse::from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal error",
                "Authentication is not configured for this route",
                &instance,
            ));
        };

        bearer_token(&parts.headers)
            .and_then(|token| verifier.verify(token))
            .map(AuthUser)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                ProblemResponse::from_parts(
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "Unauthorized",
                    e.to_string(),
                    &instance,
                )
            })
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(ProblemResponse::from_parts(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Forbidden",
                format!("User '{}' lacks the Admin role", principal.username),
                parts.uri.path(),
            ));
        }
        Ok(AdminUser(principal))
    }
}

/// Token part of `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::Malformed)?;

    let (scheme, token) = value.split_once(' ').ok_or(TokenError::Malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(TokenError::Malformed);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::Role;
    use axum::{body::Body, extract::Extension, http::Request, routing::get, Router};
    use tower::ServiceExt;

    /// Accepts "user-token" and "admin-token".
    struct StaticVerifier;

    impl TokenVerifier for StaticVerifier {
        fn verify(&self, token: &str) -> Result<Principal, TokenError> {
            let role = match token {
                "user-token" => Role::User,
                "admin-token" => Role::Admin,
                _ => return Err(TokenError::Invalid("unknown token".into())),
            };
            Ok(Principal {
                user_id: 1,
                username: "tester".into(),
                role,
            })
        }
    }

    fn app() -> Router {
        let verifier: Arc<dyn TokenVerifier> = Arc::new(StaticVerifier);
        Router::new()
            .route("/any", get(|AuthUser(p): AuthUser| async move { p.username }))
            .route("/admin", get(|AdminUser(_): AdminUser| async { "ok" }))
            .layer(Extension(verifier))
    }

    async fn call(app: Router, uri: &str, auth: Option<&str>) -> axum::response::Response {
        let mut req = Request::builder().uri(uri);
        if let Some(v) = auth {
            req = req.header("authorization", v);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[test]
    fn parses_bearer_header() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), Err(TokenError::Missing));
        h.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&h), Err(TokenError::Malformed));
        h.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&h), Err(TokenError::Malformed));
        h.insert(header::AUTHORIZATION, "bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&h), Ok("abc.def"));
    }

    #[tokio::test]
    async fn missing_token_is_401_with_challenge() {
        let resp = call(app(), "/any", None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/problem+json");
    }

    #[tokio::test]
    async fn valid_token_passes() {
        let resp = call(app(), "/any", Some("Bearer user-token")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_token_is_401() {
        let resp = call(app(), "/any", Some("Bearer forged")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_route_requires_admin_role() {
        let resp = call(app(), "/admin", Some("Bearer user-token")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = call(app(), "/admin", Some("Bearer admin-token")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(app(), "/admin", None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_verifier_is_500() {
        let app = Router::new().route("/any", get(|AuthUser(_): AuthUser| async { "ok" }));
        let resp = call(app, "/any", Some("Bearer user-token")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
