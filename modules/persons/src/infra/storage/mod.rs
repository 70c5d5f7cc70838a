pub mod entity;
pub mod migrations;
pub mod query;
pub mod sea_orm_repo;
