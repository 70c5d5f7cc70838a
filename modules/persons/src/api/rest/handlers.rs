use std::sync::Arc;

use auth::{AdminUser, AuthUser};
use axum::{
    extract::Path,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Extension,
};
use modkit::{Problem, ProblemResponse, ValidatedJson, ValidatedQuery};
use tracing::{error, info};

use crate::api::rest::dto::{
    AgeRangeQuery, DomainCountDto, DomainQuery, ExistsDto, PersonDto, PersonPageDto, PersonReq,
    SearchQuery,
};
use crate::api::rest::error::{map_domain_error, person_not_found};
use crate::domain::service::Service;

/// List every person, ascending by id
#[utoipa::path(
    get,
    path = "/persons",
    tag = "persons",
    operation_id = "persons.list",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All persons", body = [PersonDto]),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn list_persons(
    uri: Uri,
    AuthUser(_): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<Vec<PersonDto>>, ProblemResponse> {
    match svc.list_all().await {
        Ok(people) => Ok(Json(people.into_iter().map(PersonDto::from).collect())),
        Err(e) => {
            error!("Failed to list persons: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Filtered, sorted and paginated search
#[utoipa::path(
    get,
    path = "/persons/search",
    tag = "persons",
    operation_id = "persons.search",
    security(("bearer_auth" = [])),
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of matches", body = PersonPageDto),
        (status = 400, description = "Invalid query", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn search_persons(
    uri: Uri,
    AuthUser(_): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Result<Json<PersonPageDto>, ProblemResponse> {
    info!("Searching persons with query: {:?}", query);

    let page = svc.page_request(query.page_number, query.page_size);
    let mut criteria = query.into_criteria();
    criteria.page = page;

    match svc.search(criteria).await {
        Ok(page) => Ok(Json(PersonPageDto::from(page))),
        Err(e) => {
            error!("Failed to search persons: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Persons within an inclusive age range, ascending by age
#[utoipa::path(
    get,
    path = "/persons/age-range",
    tag = "persons",
    operation_id = "persons.age_range",
    security(("bearer_auth" = [])),
    params(AgeRangeQuery),
    responses(
        (status = 200, description = "Matching persons", body = [PersonDto]),
        (status = 400, description = "Invalid range", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn persons_by_age_range(
    uri: Uri,
    AuthUser(_): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    ValidatedQuery(q): ValidatedQuery<AgeRangeQuery>,
) -> Result<Json<Vec<PersonDto>>, ProblemResponse> {
    match svc.age_range(q.min_age, q.max_age).await {
        Ok(people) => Ok(Json(people.into_iter().map(PersonDto::from).collect())),
        Err(e) => {
            error!("Failed age range query: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Number of persons whose email contains the given text
#[utoipa::path(
    get,
    path = "/persons/count-by-email-domain",
    tag = "persons",
    operation_id = "persons.count_by_email_domain",
    security(("bearer_auth" = [])),
    params(DomainQuery),
    responses(
        (status = 200, description = "Match count", body = DomainCountDto),
        (status = 400, description = "Missing domain", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn count_by_email_domain(
    uri: Uri,
    AuthUser(_): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    ValidatedQuery(q): ValidatedQuery<DomainQuery>,
) -> Result<Json<DomainCountDto>, ProblemResponse> {
    match svc.count_by_email_domain(&q.domain).await {
        Ok(count) => Ok(Json(DomainCountDto {
            domain: q.domain,
            count,
        })),
        Err(e) => {
            error!("Failed to count by domain: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a person by id
#[utoipa::path(
    get,
    path = "/persons/{id}",
    tag = "persons",
    operation_id = "persons.get",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Person id")),
    responses(
        (status = 200, description = "Person found", body = PersonDto),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not found", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn get_person(
    uri: Uri,
    AuthUser(_): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
) -> Result<Json<PersonDto>, ProblemResponse> {
    match svc.get(id).await {
        Ok(Some(person)) => Ok(Json(PersonDto::from(person))),
        Ok(None) => Err(person_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to get person {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Whether a person with this id exists
#[utoipa::path(
    get,
    path = "/persons/{id}/exists",
    tag = "persons",
    operation_id = "persons.exists",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Person id")),
    responses(
        (status = 200, description = "Existence flag", body = ExistsDto),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn person_exists(
    uri: Uri,
    AuthUser(_): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
) -> Result<Json<ExistsDto>, ProblemResponse> {
    match svc.exists(id).await {
        Ok(exists) => Ok(Json(ExistsDto { id, exists })),
        Err(e) => {
            error!("Failed existence check for {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Create a person
#[utoipa::path(
    post,
    path = "/persons",
    tag = "persons",
    operation_id = "persons.create",
    security(("bearer_auth" = [])),
    request_body = PersonReq,
    responses(
        (status = 201, description = "Created", body = PersonDto,
            headers(("Location" = String, description = "URL of the new person"))),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Email already in use", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn create_person(
    uri: Uri,
    AuthUser(user): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<PersonReq>,
) -> Result<Response, ProblemResponse> {
    info!(by = %user.username, "Creating person: {:?}", req);

    match svc.create(req.into()).await {
        Ok(person) => {
            let location = format!("/persons/{}", person.id);
            Ok((
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(PersonDto::from(person)),
            )
                .into_response())
        }
        Err(e) => {
            error!("Failed to create person: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Replace every mutable field of a person
#[utoipa::path(
    put,
    path = "/persons/{id}",
    tag = "persons",
    operation_id = "persons.update",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Person id")),
    request_body = PersonReq,
    responses(
        (status = 200, description = "Updated", body = PersonDto),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not found", body = Problem, content_type = "application/problem+json"),
        (status = 409, description = "Email already in use", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn update_person(
    uri: Uri,
    AuthUser(user): AuthUser,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
    ValidatedJson(req): ValidatedJson<PersonReq>,
) -> Result<Json<PersonDto>, ProblemResponse> {
    info!(by = %user.username, "Updating person {} with: {:?}", id, req);

    match svc.update(id, req.into()).await {
        Ok(Some(person)) => Ok(Json(PersonDto::from(person))),
        Ok(None) => Err(person_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to update person {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete a person (Admin only)
#[utoipa::path(
    delete,
    path = "/persons/{id}",
    tag = "persons",
    operation_id = "persons.delete",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Person id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 403, description = "Admin role required", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not found", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn delete_person(
    uri: Uri,
    AdminUser(admin): AdminUser,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ProblemResponse> {
    info!(by = %admin.username, "Deleting person: {}", id);

    match svc.delete(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(person_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to delete person {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
