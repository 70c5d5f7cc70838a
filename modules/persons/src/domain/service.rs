use std::sync::Arc;

use modkit::{Page, PageRequest};
use tracing::{debug, info, instrument};

use crate::contract::model::{NewPerson, Person};
use crate::contract::search::SearchCriteria;
use crate::domain::error::DomainError;
use crate::domain::repo::{PersonsRepository, WriteError};
use crate::domain::search::PersonFilter;

/// Domain service for person records.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn PersonsRepository>,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

fn db_err(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

impl Service {
    pub fn new(repo: Arc<dyn PersonsRepository>, config: ServiceConfig) -> Self {
        Self { repo, config }
    }

    /// Page coordinates with configured defaults filled in and the size capped.
    pub fn page_request(&self, page_number: Option<u64>, page_size: Option<u64>) -> PageRequest {
        let size = page_size
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size.max(1));
        PageRequest::new(page_number.unwrap_or(1).max(1), size)
    }

    /// Filter, count, order and slice. A page past the end is empty but
    /// still carries correct totals.
    #[instrument(name = "persons.service.search", skip(self), fields(
        page = criteria.page.page_number,
        size = criteria.page.page_size
    ))]
    pub async fn search(&self, criteria: SearchCriteria) -> Result<Page<Person>, DomainError> {
        let filter = PersonFilter::from_criteria(&criteria);

        let total = self.repo.count(&filter).await.map_err(db_err)?;
        let items = if criteria.page.offset() >= total {
            Vec::new()
        } else {
            self.repo
                .find_page(&filter, criteria.sort_by, criteria.sort_direction, criteria.page)
                .await
                .map_err(db_err)?
        };

        debug!(total, returned = items.len(), "Search completed");
        Ok(Page::new(items, criteria.page, total))
    }

    #[instrument(name = "persons.service.get", skip(self), fields(person_id = id))]
    pub async fn get(&self, id: i32) -> Result<Option<Person>, DomainError> {
        self.repo.find_by_id(id).await.map_err(db_err)
    }

    #[instrument(name = "persons.service.list_all", skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Person>, DomainError> {
        self.repo.list_all().await.map_err(db_err)
    }

    #[instrument(name = "persons.service.exists", skip(self), fields(person_id = id))]
    pub async fn exists(&self, id: i32) -> Result<bool, DomainError> {
        self.repo.exists(id).await.map_err(db_err)
    }

    #[instrument(
        name = "persons.service.create",
        skip(self, new_person),
        fields(email = %new_person.email)
    )]
    pub async fn create(&self, new_person: NewPerson) -> Result<Person, DomainError> {
        info!("Creating person");
        let email = new_person.email.clone();
        let person = self
            .repo
            .insert(new_person)
            .await
            .map_err(|e| write_err(e, email))?;
        info!(person_id = person.id, "Successfully created person");
        Ok(person)
    }

    /// Full overwrite of an existing person; `Ok(None)` if the id is unknown.
    /// Concurrent updates race and the last committed write wins.
    #[instrument(name = "persons.service.update", skip(self, update), fields(person_id = id))]
    pub async fn update(&self, id: i32, update: NewPerson) -> Result<Option<Person>, DomainError> {
        info!("Updating person");
        let email = update.email.clone();
        let updated = self
            .repo
            .update(id, update)
            .await
            .map_err(|e| write_err(e, email))?;
        if updated.is_none() {
            debug!("Person not found");
        }
        Ok(updated)
    }

    #[instrument(name = "persons.service.delete", skip(self), fields(person_id = id))]
    pub async fn delete(&self, id: i32) -> Result<bool, DomainError> {
        let deleted = self.repo.delete(id).await.map_err(db_err)?;
        if deleted {
            info!("Successfully deleted person");
        } else {
            debug!("Nothing to delete");
        }
        Ok(deleted)
    }

    /// Persons with `min <= age <= max`, ascending by age.
    #[instrument(name = "persons.service.age_range", skip(self))]
    pub async fn age_range(&self, min: i32, max: i32) -> Result<Vec<Person>, DomainError> {
        self.repo.find_by_age_range(min, max).await.map_err(db_err)
    }

    #[instrument(name = "persons.service.count_by_email_domain", skip(self))]
    pub async fn count_by_email_domain(&self, domain: &str) -> Result<u64, DomainError> {
        self.repo
            .count(&PersonFilter::email_domain(domain))
            .await
            .map_err(db_err)
    }
}

fn write_err(e: WriteError, email: String) -> DomainError {
    match e {
        WriteError::DuplicateEmail => DomainError::email_already_exists(email),
        WriteError::Other(e) => db_err(e),
    }
}
