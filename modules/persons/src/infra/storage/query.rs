//! SQL rendering of [`PersonFilter`] and of the sort order.

use sea_orm::sea_query::{Expr, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, Order, QueryOrder, Select};

use crate::contract::search::{SortDirection, SortField};
use crate::domain::search::PersonFilter;
use crate::infra::storage::entity::{Column, Entity};

const LIKE_ESCAPE: char = '\\';

/// `WHERE` clause equivalent to [`PersonFilter::matches`].
pub fn filter_condition(f: &PersonFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(needle) = f.name_needle() {
        cond = cond.add(contains(Column::NameFolded, needle));
    }
    if let Some(min) = f.min_age() {
        cond = cond.add(Column::Age.gte(min));
    }
    if let Some(max) = f.max_age() {
        cond = cond.add(Column::Age.lte(max));
    }
    if let Some(needle) = f.email_needle() {
        cond = cond.add(contains(Column::EmailFolded, needle));
    }
    cond
}

pub fn sort_column(field: SortField) -> Column {
    match field {
        SortField::Name => Column::Name,
        SortField::Age => Column::Age,
        SortField::Email => Column::Email,
    }
}

/// Order by the chosen column, then by id so pages are stable.
pub fn apply_order(select: Select<Entity>, field: SortField, dir: SortDirection) -> Select<Entity> {
    let order = match dir {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    select
        .order_by(sort_column(field), order)
        .order_by_asc(Column::Id)
}

/// `col LIKE '%needle%' ESCAPE '\'` over a folded column; `needle` is folded too.
fn contains(col: Column, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(needle));
    Expr::col((Entity, col)).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::search::SearchCriteria;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait, Statement, Value};

    fn stmt(f: &PersonFilter) -> Statement {
        Entity::find()
            .filter(filter_condition(f))
            .build(DbBackend::Sqlite)
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn empty_filter_adds_no_condition() {
        assert!(filter_condition(&PersonFilter::default()).is_empty());
    }

    #[test]
    fn text_criteria_match_folded_columns() {
        let f = PersonFilter::from_criteria(&SearchCriteria {
            name: Some("ÉMILE".into()),
            min_age: Some(18),
            email_domain: Some("@Gmail".into()),
            ..Default::default()
        });
        let st = stmt(&f);
        assert!(st.sql.contains("\"name_folded\" LIKE '%émile%' ESCAPE"), "{}", st.sql);
        assert!(st.sql.contains("\"email_folded\" LIKE '%@gmail%' ESCAPE"), "{}", st.sql);
        assert!(st.sql.contains("\"age\" >= ?"), "{}", st.sql);
        assert!(!st.sql.contains("LOWER"), "{}", st.sql);

        let values = st.values.expect("bound values").0;
        assert!(values.contains(&Value::Int(Some(18))), "{values:?}");
    }

    #[test]
    fn order_has_id_tiebreak() {
        let s = apply_order(Entity::find(), SortField::Age, SortDirection::Desc)
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(s.contains("ORDER BY \"persons\".\"age\" DESC, \"persons\".\"id\" ASC"), "{s}");
    }
}
