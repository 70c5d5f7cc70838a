use sea_orm::entity::prelude::*;

use crate::contract::model::{Role, User};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let role: Role = m
            .role
            .parse()
            .map_err(|e: String| anyhow::anyhow!("user {}: {e}", m.id))?;
        Ok(User {
            id: m.id,
            username: m.username,
            role,
            created_at: m.created_at,
        })
    }
}
