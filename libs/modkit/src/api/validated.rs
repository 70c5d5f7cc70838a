//! Extractors that deserialize and then run `validator` rules, rejecting with
//! a 400 Problem listing every failing field.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::problem::{Problem, ProblemResponse, ValidationError};

/// Error key `validator` uses for struct-level (schema) rules.
const SCHEMA_KEY: &str = "__all__";

/// JSON body that passed its `Validate` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

/// Query string that passed its `Validate` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let instance = req.uri().path().to_owned();
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rej| json_rejection_problem(&rej, &instance))?;
        value
            .validate()
            .map_err(|errs| validation_problem(&errs, &instance))?;
        Ok(Self(value))
    }
}

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rej| {
                Problem::new(StatusCode::BAD_REQUEST, "Bad Request", rej.body_text())
                    .with_code("INVALID_QUERY")
                    .with_instance(&instance)
            })?;
        value
            .validate()
            .map_err(|errs| validation_problem(&errs, &instance))?;
        Ok(Self(value))
    }
}

fn json_rejection_problem(rej: &JsonRejection, instance: &str) -> ProblemResponse {
    // Keep 415 for a wrong content type; everything else is a malformed body.
    let status = match rej.status() {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    };
    let title = status.canonical_reason().unwrap_or("Bad Request");
    Problem::new(status, title, rej.body_text())
        .with_code("INVALID_BODY")
        .with_instance(instance)
        .into()
}

/// Render `validator` errors as a 400 Problem with one entry per failed rule.
pub fn validation_problem(errors: &ValidationErrors, instance: &str) -> ProblemResponse {
    Problem::new(
        StatusCode::BAD_REQUEST,
        "Validation Failed",
        "One or more fields are invalid",
    )
    .with_code("VALIDATION_ERROR")
    .with_instance(instance)
    .with_errors(collect_field_errors(errors))
    .into()
}

fn collect_field_errors(errors: &ValidationErrors) -> Vec<ValidationError> {
    let mut out: Vec<ValidationError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            let pointer = if field == SCHEMA_KEY {
                String::from("/")
            } else {
                format!("/{}", to_camel_case(&field))
            };
            errs.iter().map(move |e| ValidationError {
                detail: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed rule '{}'", e.code)),
                pointer: pointer.clone(),
            })
        })
        .collect();
    out.sort_by(|a, b| a.pointer.cmp(&b.pointer).then_with(|| a.detail.cmp(&b.detail)));
    out
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
