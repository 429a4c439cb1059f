//! Catalog tables backing the default replicator target.
//!
//! `base_products` is normally fed by the external catalog; `company_products`
//! holds the per-company sellable copies produced by budget replication and is
//! unique per `(company_id, base_product_id)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum BaseProducts {
    Table,
    Id,
    Sku,
    Name,
    Active,
}

#[derive(Iden)]
enum CompanyProducts {
    Table,
    Id,
    CompanyId,
    BaseProductId,
    Sku,
    Name,
    PriceMinor,
    Points,
    Stock,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BaseProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BaseProducts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BaseProducts::Sku)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(BaseProducts::Name).string().not_null())
                    .col(
                        ColumnDef::new(BaseProducts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyProducts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CompanyProducts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CompanyProducts::CompanyId).string().not_null())
                    .col(
                        ColumnDef::new(CompanyProducts::BaseProductId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompanyProducts::Sku).string().not_null())
                    .col(ColumnDef::new(CompanyProducts::Name).string().not_null())
                    .col(
                        ColumnDef::new(CompanyProducts::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompanyProducts::Points).big_integer().not_null())
                    .col(ColumnDef::new(CompanyProducts::Stock).big_integer().not_null())
                    .col(ColumnDef::new(CompanyProducts::UpdatedBy).string().not_null())
                    .col(
                        ColumnDef::new(CompanyProducts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CompanyProducts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-company_products-base_product_id")
                            .from(CompanyProducts::Table, CompanyProducts::BaseProductId)
                            .to(BaseProducts::Table, BaseProducts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-company_products-company_base")
                    .table(CompanyProducts::Table)
                    .col(CompanyProducts::CompanyId)
                    .col(CompanyProducts::BaseProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CompanyProducts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BaseProducts::Table).to_owned())
            .await?;
        Ok(())
    }
}
