//! Search criteria and the closed set of sortable fields.

use std::cmp::Ordering;

use modkit::PageRequest;

use crate::contract::model::Person;

/// Field a search result can be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    Name,
    Age,
    Email,
}

impl SortField {
    /// Case-insensitive; anything unrecognized sorts by name.
    pub fn parse_lenient(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("age") {
            SortField::Age
        } else if s.eq_ignore_ascii_case("email") {
            SortField::Email
        } else {
            SortField::Name
        }
    }

    /// Ascending comparison of the field alone.
    pub fn compare(self, a: &Person, b: &Person) -> Ordering {
        match self {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Age => a.age.cmp(&b.age),
            SortField::Email => a.email.cmp(&b.email),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `"desc"` (any case) is descending; everything else ascending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Optional filters plus ordering and page coordinates.
///
/// Blank strings count as "not supplied". `min_age > max_age` is accepted
/// here and simply matches nothing; request validation rejects it earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub name: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub email_domain: Option<String>,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
    pub page: PageRequest,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            name: None,
            min_age: None,
            max_age: None,
            email_domain: None,
            sort_by: SortField::default(),
            sort_direction: SortDirection::default(),
            page: PageRequest::new(1, 10),
        }
    }
}

impl SearchCriteria {
    /// Total order used for results: the chosen field in the chosen
    /// direction, ties broken by ascending id.
    pub fn compare(&self, a: &Person, b: &Person) -> Ordering {
        self.sort_direction
            .apply(self.sort_by.compare(a, b))
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: i32, name: &str, age: i32) -> Person {
        Person {
            id,
            name: name.into(),
            age,
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[test]
    fn sort_field_parsing() {
        assert_eq!(SortField::parse_lenient("AGE"), SortField::Age);
        assert_eq!(SortField::parse_lenient("email"), SortField::Email);
        assert_eq!(SortField::parse_lenient("Name"), SortField::Name);
        assert_eq!(SortField::parse_lenient("salary"), SortField::Name);
        assert_eq!(SortField::parse_lenient(""), SortField::Name);
    }

    #[test]
    fn direction_parsing() {
        assert_eq!(SortDirection::parse_lenient("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient("sideways"), SortDirection::Asc);
    }

    #[test]
    fn ties_break_on_id_regardless_of_direction() {
        let criteria = SearchCriteria {
            sort_by: SortField::Age,
            sort_direction: SortDirection::Desc,
            ..Default::default()
        };
        let mut people = vec![p(3, "C", 30), p(1, "A", 30), p(2, "B", 40)];
        people.sort_by(|a, b| criteria.compare(a, b));
        let ids: Vec<i32> = people.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
