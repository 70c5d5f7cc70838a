use sea_orm::entity::prelude::*;

use crate::contract::model::Person;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "persons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub age: i32,
    #[sea_orm(unique)]
    pub email: String,
    /// `fold(name)`, what name searches match against.
    pub name_folded: String,
    pub email_folded: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Person {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            age: m.age,
            email: m.email,
        }
    }
}
