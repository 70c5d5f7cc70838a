use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_users::Migration)]
    }

    // Modules share one database; each keeps its own migration ledger.
    fn migration_table_name() -> DynIden {
        Alias::new("seaql_migrations_auth").into_iden()
    }
}
