use std::sync::Arc;

use axum::{
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use modkit::{Problem, ProblemResponse, ValidatedJson};
use tracing::{info, warn};

use crate::api::rest::dto::{LoginReq, PrincipalDto, RegisterReq, TokenDto, UserDto};
use crate::api::rest::error::map_domain_error;
use crate::api::rest::extract::AuthUser;
use crate::domain::service::Service;

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    operation_id = "auth.register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = UserDto),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Username taken", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn register(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<RegisterReq>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    info!(username = %req.username, "Registering user");

    match svc.register(req.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            warn!("Failed to register user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    operation_id = "auth.login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token issued", body = TokenDto),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Invalid credentials", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn login(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<LoginReq>,
) -> Result<Json<TokenDto>, ProblemResponse> {
    match svc.login(&req.username, req.password).await {
        Ok(issued) => Ok(Json(TokenDto::from(issued))),
        Err(e) => {
            warn!(username = %req.username, "Login failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// The authenticated caller
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    operation_id = "auth.me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current principal", body = PrincipalDto),
        (status = 401, description = "Missing or invalid token", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn me(AuthUser(principal): AuthUser) -> Json<PrincipalDto> {
    Json(PrincipalDto::from(principal))
}
