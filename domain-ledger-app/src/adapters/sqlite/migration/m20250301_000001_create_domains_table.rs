use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Domain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domain::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domain::Domain).string().not_null())
                    .col(
                        ColumnDef::new(Domain::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Domain::VerifyToken).string().not_null())
                    .col(
                        ColumnDef::new(Domain::IsPublic)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Domain::BillingData).text().null())
                    .col(
                        ColumnDef::new(Domain::Revision)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Domain::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Domain::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // reconciliation 按状态加载
        manager
            .create_index(
                Index::create()
                    .name("idx_domains_status")
                    .table(Domain::Table)
                    .col(Domain::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Domain::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Domain {
    #[sea_orm(iden = "domains")]
    Table,
    Id,
    Domain,
    Status,
    VerifyToken,
    IsPublic,
    BillingData,
    Revision,
    CreatedAt,
    UpdatedAt,
}
