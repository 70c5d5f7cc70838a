//! SeaORM-backed implementation of [`UsersRepository`].

use anyhow::Context;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr};

use crate::contract::model::User;
use crate::domain::repo::{InsertError, NewUserRecord, StoredUser, UsersRepository};
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};

/// Generic over `C: ConnectionTrait`, so it works with a pooled connection
/// or a transaction.
pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<StoredUser>> {
        let Some(model) = UserEntity::find()
            .filter(Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("find_by_username failed")?
        else {
            return Ok(None);
        };
        let password_hash = model.password_hash.clone();
        Ok(Some(StoredUser {
            user: User::try_from(model)?,
            password_hash,
        }))
    }

    async fn insert(&self, new_user: NewUserRecord) -> Result<User, InsertError> {
        let m = UserAM {
            username: Set(new_user.username),
            password_hash: Set(new_user.password_hash),
            role: Set(new_user.role.as_str().to_owned()),
            created_at: Set(new_user.created_at),
            ..Default::default()
        };
        match m.insert(&self.conn).await {
            Ok(model) => Ok(User::try_from(model)?),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(InsertError::Duplicate)
            }
            Err(e) => Err(InsertError::Other(anyhow::Error::new(e).context("insert failed"))),
        }
    }
}
