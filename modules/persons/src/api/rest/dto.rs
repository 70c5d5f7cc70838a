use modkit::Page;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::contract::model::{NewPerson, Person};
use crate::contract::search::{SearchCriteria, SortDirection, SortField};

/// REST DTO for a person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonDto {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub email: String,
}

/// Create and full-update payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonReq {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(range(min = 0, max = 150, message = "age must be between 0 and 150"))]
    pub age: i32,
    #[validate(
        email(message = "email must be a valid address"),
        length(max = 100, message = "email must be at most 100 characters")
    )]
    pub email: String,
}

/// Search query string. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_search_bounds"))]
pub struct SearchQuery {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    #[validate(range(min = 0, max = 150, message = "minAge must be between 0 and 150"))]
    pub min_age: Option<i32>,
    #[validate(range(min = 0, max = 150, message = "maxAge must be between 0 and 150"))]
    pub max_age: Option<i32>,
    /// Case-insensitive substring of the email, e.g. `@gmail.com`
    pub email_domain: Option<String>,
    /// `Name` (default), `Age` or `Email`
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub sort_direction: Option<String>,
    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: Option<u64>,
    #[validate(range(min = 1, max = 100, message = "pageSize must be between 1 and 100"))]
    pub page_size: Option<u64>,
}

fn validate_search_bounds(q: &SearchQuery) -> Result<(), ValidationError> {
    check_age_order(q.min_age, q.max_age)
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_age_range"))]
pub struct AgeRangeQuery {
    #[validate(range(min = 0, max = 150, message = "minAge must be between 0 and 150"))]
    pub min_age: i32,
    #[validate(range(min = 0, max = 150, message = "maxAge must be between 0 and 150"))]
    pub max_age: i32,
}

fn validate_age_range(q: &AgeRangeQuery) -> Result<(), ValidationError> {
    check_age_order(Some(q.min_age), Some(q.max_age))
}

fn check_age_order(min: Option<i32>, max: Option<i32>) -> Result<(), ValidationError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => {
            let mut err = ValidationError::new("age_range");
            err.message = Some("minAge must not exceed maxAge".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DomainQuery {
    /// Substring to look for in emails, e.g. `@gmail.com`. Used verbatim.
    #[validate(custom(function = "not_blank", message = "domain is required"))]
    pub domain: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainCountDto {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExistsDto {
    pub id: i32,
    pub exists: bool,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonPageDto {
    pub items: Vec<PersonDto>,
    pub total_count: u64,
    pub page_number: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

// Conversion implementations between REST DTOs and contract models

impl From<Person> for PersonDto {
    fn from(p: Person) -> Self {
        Self {
            id: p.id,
            name: p.name,
            age: p.age,
            email: p.email,
        }
    }
}

impl From<PersonReq> for NewPerson {
    fn from(req: PersonReq) -> Self {
        Self {
            name: req.name,
            age: req.age,
            email: req.email,
        }
    }
}

impl From<Page<Person>> for PersonPageDto {
    fn from(page: Page<Person>) -> Self {
        let page = page.map(PersonDto::from);
        Self {
            items: page.items,
            total_count: page.total_count,
            page_number: page.page_number,
            page_size: page.page_size,
            total_pages: page.total_pages,
            has_previous_page: page.has_previous_page,
            has_next_page: page.has_next_page,
        }
    }
}

impl SearchQuery {
    /// Criteria without page coordinates; the service resolves those.
    pub fn into_criteria(self) -> SearchCriteria {
        SearchCriteria {
            name: self.name,
            min_age: self.min_age,
            max_age: self.max_age,
            email_domain: self.email_domain,
            sort_by: self
                .sort_by
                .as_deref()
                .map(SortField::parse_lenient)
                .unwrap_or_default(),
            sort_direction: self
                .sort_direction
                .as_deref()
                .map(SortDirection::parse_lenient)
                .unwrap_or_default(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_req() -> PersonReq {
        PersonReq {
            name: "Alice".into(),
            age: 25,
            email: "alice@gmail.com".into(),
        }
    }

    #[test]
    fn person_req_rules() {
        assert!(valid_req().validate().is_ok());

        let bad = PersonReq {
            name: String::new(),
            age: 151,
            email: "not-an-email".into(),
        };
        let errs = bad.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("age"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn search_rejects_inverted_ages() {
        let q = SearchQuery {
            min_age: Some(50),
            max_age: Some(20),
            ..Default::default()
        };
        let errs = q.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("__all__"));
    }

    #[test]
    fn search_rejects_page_size_out_of_range() {
        for size in [0, 101] {
            let q = SearchQuery {
                page_size: Some(size),
                ..Default::default()
            };
            assert!(q.validate().is_err(), "size {size}");
        }
        let q = SearchQuery {
            page_number: Some(0),
            ..Default::default()
        };
        assert!(q.validate().is_err());
    }

    #[test]
    fn domain_must_not_be_blank() {
        for domain in ["", "   "] {
            let q = DomainQuery {
                domain: domain.into(),
            };
            let errs = q.validate().unwrap_err();
            assert!(errs.field_errors().contains_key("domain"), "{domain:?}");
        }
        let q = DomainQuery {
            domain: " gmail".into(),
        };
        assert!(q.validate().is_ok());
    }

    #[test]
    fn query_maps_to_criteria_leniently() {
        let q = SearchQuery {
            sort_by: Some("age".into()),
            sort_direction: Some("DESC".into()),
            ..Default::default()
        };
        let c = q.into_criteria();
        assert_eq!(c.sort_by, SortField::Age);
        assert_eq!(c.sort_direction, SortDirection::Desc);

        let c = SearchQuery::default().into_criteria();
        assert_eq!(c.sort_by, SortField::Name);
        assert_eq!(c.sort_direction, SortDirection::Asc);
    }
}
