use sea_orm_migration::prelude::*;

mod m20250601_initial;

pub use m20250601_initial::DEFAULT_API_KEY;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250601_initial::Migration)]
    }
}
