//! The filter predicate of a person search.
//!
//! [`PersonFilter::matches`] is the in-memory rendering; the storage layer
//! translates the same filter into a SQL condition. Both must agree, so text
//! is compared through [`fold`] on both sides: the storage layer keeps a
//! folded copy of `name` and `email` next to the originals.

use crate::contract::model::Person;
use crate::contract::search::SearchCriteria;

/// Conjunction of the supplied criteria. Text needles are stored folded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    name: Option<String>,
    min_age: Option<i32>,
    max_age: Option<i32>,
    email_domain: Option<String>,
}

impl PersonFilter {
    pub fn from_criteria(c: &SearchCriteria) -> Self {
        Self {
            name: needle(c.name.as_deref()),
            min_age: c.min_age,
            max_age: c.max_age,
            email_domain: needle(c.email_domain.as_deref()),
        }
    }

    /// Only the email-domain criterion, taken verbatim (whitespace included).
    pub fn email_domain(domain: &str) -> Self {
        Self {
            email_domain: Some(fold(domain)),
            ..Default::default()
        }
    }

    pub fn name_needle(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email_needle(&self) -> Option<&str> {
        self.email_domain.as_deref()
    }

    pub fn min_age(&self) -> Option<i32> {
        self.min_age
    }

    pub fn max_age(&self) -> Option<i32> {
        self.max_age
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, p: &Person) -> bool {
        self.name
            .as_deref()
            .map_or(true, |n| fold(&p.name).contains(n))
            && self.min_age.map_or(true, |min| p.age >= min)
            && self.max_age.map_or(true, |max| p.age <= max)
            && self
                .email_domain
                .as_deref()
                .map_or(true, |d| fold(&p.email).contains(d))
    }
}

/// Case folding shared by the in-memory matcher and the stored folded columns.
pub fn fold(s: &str) -> String {
    s.to_lowercase()
}

/// Blank search criteria are absent; anything else is used as given.
fn needle(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty()).map(fold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str, age: i32, email: &str) -> Person {
        Person {
            id: 1,
            name: name.into(),
            age,
            email: email.into(),
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria::default()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = PersonFilter::from_criteria(&criteria());
        assert!(f.is_empty());
        assert!(f.matches(&person("Anyone", 0, "x@y.z")));
    }

    #[test]
    fn blank_strings_are_ignored() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            name: Some("   ".into()),
            email_domain: Some(String::new()),
            ..criteria()
        });
        assert!(f.is_empty());
    }

    #[test]
    fn needles_keep_surrounding_whitespace() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            name: Some(" li".into()),
            ..criteria()
        });
        assert_eq!(f.name_needle(), Some(" li"));
        assert!(f.matches(&person("Ana Lima", 25, "a@x.com")));
        assert!(!f.matches(&person("Alice", 25, "a@x.com")));

        let p = person("Alice", 25, "alice@gmail.com");
        assert!(!PersonFilter::email_domain(" gmail").matches(&p));
        assert!(!PersonFilter::email_domain("   ").matches(&p));
    }

    #[test]
    fn folding_covers_non_ascii() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            name: Some("émile".into()),
            ..criteria()
        });
        assert!(f.matches(&person("ÉMILE", 40, "e@x.com")));
        assert_eq!(fold("ZOË"), "zoë");
    }

    #[test]
    fn name_is_case_insensitive_substring() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            name: Some("LIC".into()),
            ..criteria()
        });
        assert!(f.matches(&person("Alice", 25, "alice@gmail.com")));
        assert!(!f.matches(&person("Bob", 30, "bob@yahoo.com")));
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            min_age: Some(25),
            max_age: Some(30),
            ..criteria()
        });
        assert!(f.matches(&person("A", 25, "a@x.com")));
        assert!(f.matches(&person("B", 30, "b@x.com")));
        assert!(!f.matches(&person("C", 24, "c@x.com")));
        assert!(!f.matches(&person("D", 31, "d@x.com")));
    }

    #[test]
    fn inverted_age_bounds_match_nothing() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            min_age: Some(40),
            max_age: Some(20),
            ..criteria()
        });
        assert!(!f.matches(&person("A", 30, "a@x.com")));
    }

    #[test]
    fn email_domain_matches_substring_with_or_without_at() {
        let p = person("Alice", 25, "Alice@GMail.com");
        assert!(PersonFilter::email_domain("@gmail.com").matches(&p));
        assert!(PersonFilter::email_domain("gmail").matches(&p));
        assert!(!PersonFilter::email_domain("@yahoo.com").matches(&p));
    }

    #[test]
    fn all_criteria_must_hold() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            name: Some("a".into()),
            min_age: Some(30),
            email_domain: Some("gmail".into()),
            ..criteria()
        });
        assert!(f.matches(&person("Charlie", 35, "charlie@gmail.com")));
        assert!(!f.matches(&person("Alice", 25, "alice@gmail.com")));
        assert!(!f.matches(&person("Dana", 35, "dana@yahoo.com")));
    }
}
