use async_trait::async_trait;
use modkit::PageRequest;

use crate::contract::model::{NewPerson, Person};
use crate::contract::search::{SortDirection, SortField};
use crate::domain::search::PersonFilter;

/// Failure of an insert or update.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Port for the domain layer: persistence operations the domain needs.
#[async_trait]
pub trait PersonsRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Person>>;
    async fn exists(&self, id: i32) -> anyhow::Result<bool>;
    /// Every person, ascending by id.
    async fn list_all(&self) -> anyhow::Result<Vec<Person>>;
    async fn insert(&self, p: NewPerson) -> Result<Person, WriteError>;
    /// Overwrite all mutable fields. `Ok(None)` if `id` does not exist.
    async fn update(&self, id: i32, p: NewPerson) -> Result<Option<Person>, WriteError>;
    /// Returns true if a row was deleted.
    async fn delete(&self, id: i32) -> anyhow::Result<bool>;
    async fn count(&self, filter: &PersonFilter) -> anyhow::Result<u64>;
    /// One page of matches in the given order (ties broken by id).
    async fn find_page(
        &self,
        filter: &PersonFilter,
        sort_by: SortField,
        direction: SortDirection,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Person>>;
    /// Inclusive age range, ascending by age then id.
    async fn find_by_age_range(&self, min: i32, max: i32) -> anyhow::Result<Vec<Person>>;
}
