pub mod model;
pub mod search;

pub use model::{NewPerson, Person};
pub use search::{SearchCriteria, SortDirection, SortField};
