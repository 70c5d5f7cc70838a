use std::sync::Arc;

use auth::TokenVerifier;
use axum::{routing::get, Extension, Router};
use modkit::{OpenApiRegistry, Problem, ValidationError};
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_persons,
        handlers::search_persons,
        handlers::persons_by_age_range,
        handlers::count_by_email_domain,
        handlers::get_person,
        handlers::person_exists,
        handlers::create_person,
        handlers::update_person,
        handlers::delete_person,
    ),
    components(schemas(
        dto::PersonDto,
        dto::PersonReq,
        dto::PersonPageDto,
        dto::DomainCountDto,
        dto::ExistsDto,
        Problem,
        ValidationError
    )),
    tags((name = "persons", description = "Person records and search"))
)]
struct PersonsApiDoc;

pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
) -> anyhow::Result<Router> {
    openapi.register_document(PersonsApiDoc::openapi());

    let routes = Router::new()
        .route(
            "/persons",
            get(handlers::list_persons).post(handlers::create_person),
        )
        .route("/persons/search", get(handlers::search_persons))
        .route("/persons/age-range", get(handlers::persons_by_age_range))
        .route(
            "/persons/count-by-email-domain",
            get(handlers::count_by_email_domain),
        )
        .route(
            "/persons/{id}",
            get(handlers::get_person)
                .put(handlers::update_person)
                .delete(handlers::delete_person),
        )
        .route("/persons/{id}/exists", get(handlers::person_exists))
        .layer(Extension(service))
        .layer(Extension(verifier));

    Ok(router.merge(routes))
}
