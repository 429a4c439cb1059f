//! Cost-center ledger tables.
//!
//! - `cost_centers`: per-company spending buckets with denormalized balances
//! - `cost_center_transactions`: append-only log the balances are derived from

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum CostCenters {
    Table,
    Id,
    CompanyId,
    Name,
    Code,
    AllocatedBudget,
    UsedBudget,
    AvailableBudget,
    CreatedAt,
}

#[derive(Iden)]
enum CostCenterTransactions {
    Table,
    Id,
    CostCenterId,
    Kind,
    AdjustmentKind,
    AmountMinor,
    Description,
    UserId,
    UserName,
    BudgetId,
    BudgetTitle,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CostCenters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CostCenters::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CostCenters::CompanyId).string().not_null())
                    .col(ColumnDef::new(CostCenters::Name).string().not_null())
                    .col(ColumnDef::new(CostCenters::Code).string().not_null())
                    .col(
                        ColumnDef::new(CostCenters::AllocatedBudget)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CostCenters::UsedBudget)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CostCenters::AvailableBudget)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CostCenters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cost_centers-company_code")
                    .table(CostCenters::Table)
                    .col(CostCenters::CompanyId)
                    .col(CostCenters::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CostCenterTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CostCenterTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CostCenterTransactions::CostCenterId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CostCenterTransactions::Kind)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CostCenterTransactions::AdjustmentKind).string())
                    .col(
                        ColumnDef::new(CostCenterTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CostCenterTransactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CostCenterTransactions::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CostCenterTransactions::UserName)
                            .string()
                            .not_null(),
                    )
                    // Traceability only: the budget may be deleted later, the
                    // transaction never is.
                    .col(ColumnDef::new(CostCenterTransactions::BudgetId).string())
                    .col(ColumnDef::new(CostCenterTransactions::BudgetTitle).string())
                    .col(
                        ColumnDef::new(CostCenterTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cost_center_transactions-cost_center_id")
                            .from(
                                CostCenterTransactions::Table,
                                CostCenterTransactions::CostCenterId,
                            )
                            .to(CostCenters::Table, CostCenters::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cost_center_transactions-cost_center_id")
                    .table(CostCenterTransactions::Table)
                    .col(CostCenterTransactions::CostCenterId)
                    .col(CostCenterTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cost_center_transactions-budget_id")
                    .table(CostCenterTransactions::Table)
                    .col(CostCenterTransactions::BudgetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(CostCenterTransactions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(CostCenters::Table).to_owned())
            .await?;
        Ok(())
    }
}
