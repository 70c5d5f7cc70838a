//! SeaORM-backed repository implementation for the domain port.
//!
//! Generic over `C: ConnectionTrait`, so it can run on a pooled connection
//! or inside a transaction.

use anyhow::Context;
use modkit::PageRequest;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::contract::model::{NewPerson, Person};
use crate::contract::search::{SortDirection, SortField};
use crate::domain::repo::{PersonsRepository, WriteError};
use crate::domain::search::{fold, PersonFilter};
use crate::infra::storage::entity::{ActiveModel as PersonAM, Column, Entity as PersonEntity};
use crate::infra::storage::query::{apply_order, filter_condition};

pub struct SeaOrmPersonsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmPersonsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn classify(e: DbErr, op: &'static str) -> WriteError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        WriteError::DuplicateEmail
    } else {
        WriteError::Other(anyhow::Error::new(e).context(op))
    }
}

#[async_trait::async_trait]
impl<C> PersonsRepository for SeaOrmPersonsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Person>> {
        let found = PersonEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn exists(&self, id: i32) -> anyhow::Result<bool> {
        let n = PersonEntity::find_by_id(id)
            .count(&self.conn)
            .await
            .context("exists failed")?;
        Ok(n > 0)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Person>> {
        let rows = PersonEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("list_all failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, p: NewPerson) -> Result<Person, WriteError> {
        let m = PersonAM {
            name_folded: Set(fold(&p.name)),
            email_folded: Set(fold(&p.email)),
            name: Set(p.name),
            age: Set(p.age),
            email: Set(p.email),
            ..Default::default()
        };
        m.insert(&self.conn)
            .await
            .map(Into::into)
            .map_err(|e| classify(e, "insert failed"))
    }

    async fn update(&self, id: i32, p: NewPerson) -> Result<Option<Person>, WriteError> {
        let m = PersonAM {
            id: Unchanged(id),
            name_folded: Set(fold(&p.name)),
            email_folded: Set(fold(&p.email)),
            name: Set(p.name),
            age: Set(p.age),
            email: Set(p.email),
        };
        match m.update(&self.conn).await {
            Ok(model) => Ok(Some(model.into())),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(classify(e, "update failed")),
        }
    }

    async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let res = PersonEntity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn count(&self, filter: &PersonFilter) -> anyhow::Result<u64> {
        PersonEntity::find()
            .filter(filter_condition(filter))
            .count(&self.conn)
            .await
            .context("count failed")
    }

    async fn find_page(
        &self,
        filter: &PersonFilter,
        sort_by: SortField,
        direction: SortDirection,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Person>> {
        let select = PersonEntity::find().filter(filter_condition(filter));
        let rows = apply_order(select, sort_by, direction)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.conn)
            .await
            .context("find_page failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_age_range(&self, min: i32, max: i32) -> anyhow::Result<Vec<Person>> {
        let rows = PersonEntity::find()
            .filter(Column::Age.between(min, max))
            .order_by_asc(Column::Age)
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("find_by_age_range failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
