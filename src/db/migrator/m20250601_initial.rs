use crate::entities::prelude::*;
use crate::entities::{predictions, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Default API key of the seeded admin (regenerate after first login)
pub const DEFAULT_API_KEY: &str = "bolao_default_api_key_please_regenerate";

const DEFAULT_ADMIN_USERNAME: &str = "admin";

fn hash_default_password() -> Result<String, DbErr> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"password", &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbErr::Custom(format!("Failed to hash default password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Matches)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Predictions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        for mut index in schema
            .create_index_from_entity(Matches)
            .into_iter()
            .chain(schema.create_index_from_entity(Predictions))
        {
            manager.create_index(index.if_not_exists().to_owned()).await?;
        }

        // At most one prediction per (user, match), enforced by the store.
        manager
            .create_index(
                Index::create()
                    .name("idx_predictions_user_match_unique")
                    .table(Predictions)
                    .col(predictions::Column::UserId)
                    .col(predictions::Column::MatchId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_default_password()?;

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::PasswordHash,
                users::Column::ApiKey,
                users::Column::Role,
                users::Column::Points,
                users::Column::IsActive,
                users::Column::CreatedAt,
                users::Column::UpdatedAt,
            ])
            .values([
                DEFAULT_ADMIN_USERNAME.into(),
                password_hash.into(),
                DEFAULT_API_KEY.into(),
                "admin".into(),
                0.into(),
                true.into(),
                now.clone().into(),
                now.into(),
            ])
            .map_err(|e| DbErr::Custom(e.to_string()))?
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Predictions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Matches).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
