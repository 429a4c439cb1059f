//! Budget aggregate tables: `budgets` owns `budget_items` and
//! `budget_messages` (cascade on delete).

use sea_orm_migration::prelude::*;

use crate::m20261001_000000_ledger::CostCenters;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum Budgets {
    Table,
    Id,
    CompanyId,
    CostCenterId,
    Title,
    BudgetType,
    Status,
    TotalCash,
    TotalPoints,
    RequestedBy,
    RequestedByName,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    SubmittedAt,
    ApprovedAt,
    ReleasedAt,
    CompletedAt,
    ScheduledPublishAt,
    Meta,
    Version,
}

#[derive(Iden)]
enum BudgetItems {
    Table,
    Id,
    BudgetId,
    Position,
    BaseProductId,
    Qty,
    UnitPrice,
    UnitPoints,
    SubtotalCash,
    SubtotalPoints,
    ReplicatedProductId,
}

#[derive(Iden)]
enum BudgetMessages {
    Table,
    Id,
    BudgetId,
    SenderId,
    SenderName,
    SenderRole,
    Message,
    IsRead,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::CompanyId).string().not_null())
                    .col(ColumnDef::new(Budgets::CostCenterId).string())
                    .col(ColumnDef::new(Budgets::Title).string().not_null())
                    .col(
                        ColumnDef::new(Budgets::BudgetType)
                            .string()
                            .not_null()
                            .default("standard"),
                    )
                    .col(
                        ColumnDef::new(Budgets::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Budgets::TotalCash)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Budgets::TotalPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Budgets::RequestedBy).string().not_null())
                    .col(ColumnDef::new(Budgets::RequestedByName).string().not_null())
                    .col(ColumnDef::new(Budgets::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Budgets::UpdatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Budgets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Budgets::SubmittedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Budgets::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Budgets::ReleasedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Budgets::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Budgets::ScheduledPublishAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Budgets::Meta).text())
                    .col(
                        ColumnDef::new(Budgets::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-cost_center_id")
                            .from(Budgets::Table, Budgets::CostCenterId)
                            .to(CostCenters::Table, CostCenters::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-company_id")
                    .table(Budgets::Table)
                    .col(Budgets::CompanyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-cost_center_status")
                    .table(Budgets::Table)
                    .col(Budgets::CostCenterId)
                    .col(Budgets::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Budget items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetItems::BudgetId).string().not_null())
                    .col(ColumnDef::new(BudgetItems::Position).integer().not_null())
                    .col(ColumnDef::new(BudgetItems::BaseProductId).string().not_null())
                    .col(ColumnDef::new(BudgetItems::Qty).big_integer().not_null())
                    .col(ColumnDef::new(BudgetItems::UnitPrice).big_integer().not_null())
                    .col(ColumnDef::new(BudgetItems::UnitPoints).big_integer().not_null())
                    .col(ColumnDef::new(BudgetItems::SubtotalCash).big_integer().not_null())
                    .col(
                        ColumnDef::new(BudgetItems::SubtotalPoints)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetItems::ReplicatedProductId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_items-budget_id")
                            .from(BudgetItems::Table, BudgetItems::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_items-budget_id")
                    .table(BudgetItems::Table)
                    .col(BudgetItems::BudgetId)
                    .col(BudgetItems::Position)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Budget messages
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetMessages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetMessages::BudgetId).string().not_null())
                    .col(ColumnDef::new(BudgetMessages::SenderId).string().not_null())
                    .col(ColumnDef::new(BudgetMessages::SenderName).string().not_null())
                    .col(ColumnDef::new(BudgetMessages::SenderRole).string().not_null())
                    .col(ColumnDef::new(BudgetMessages::Message).text().not_null())
                    .col(
                        ColumnDef::new(BudgetMessages::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(BudgetMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_messages-budget_id")
                            .from(BudgetMessages::Table, BudgetMessages::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_messages-budget_id")
                    .table(BudgetMessages::Table)
                    .col(BudgetMessages::BudgetId)
                    .col(BudgetMessages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BudgetMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        Ok(())
    }
}
