use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use modkit::{OpenApiRegistry, Problem, ValidationError};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::rest::{dto, handlers};
use crate::contract::client::TokenVerifier;
use crate::contract::model::Role;
use crate::domain::service::Service;

/// Name of the HTTP bearer security scheme in the OpenAPI document.
pub const BEARER_SCHEME: &str = "bearer_auth";

#[derive(OpenApi)]
#[openapi(
    paths(handlers::register, handlers::login, handlers::me),
    components(schemas(
        dto::RegisterReq,
        dto::LoginReq,
        dto::UserDto,
        dto::TokenDto,
        dto::PrincipalDto,
        Role,
        Problem,
        ValidationError
    )),
    modifiers(&BearerAuth),
    tags((name = "auth", description = "Accounts and access tokens"))
)]
struct AuthApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
) -> anyhow::Result<Router> {
    openapi.register_document(AuthApiDoc::openapi());

    let routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::me))
        .layer(Extension(service))
        .layer(Extension(verifier));

    Ok(router.merge(routes))
}
