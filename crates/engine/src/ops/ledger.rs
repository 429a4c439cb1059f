use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    AdjustmentCmd, Balances, Context, CostCenterTransaction, EngineError, LedgerEntryCmd,
    ResultEngine, TransactionKind, cost_center_transactions, cost_centers, error::EntityKind,
    replay, util::normalize_optional, util::normalize_required,
};

use super::{Engine, with_tx};

impl Engine {
    /// Apply one entry to its cost center and append it to the log.
    ///
    /// Balances move through column arithmetic in a single `UPDATE`, so
    /// concurrent bookings on the same center never lose an update.
    pub(super) async fn book_entry<C: ConnectionTrait>(
        &self,
        db: &C,
        entry: CostCenterTransaction,
    ) -> ResultEngine<CostCenterTransaction> {
        let (allocated_delta, used_delta) = entry.effect()?;
        let res = cost_centers::Entity::update_many()
            .col_expr(
                cost_centers::Column::AllocatedBudget,
                Expr::col(cost_centers::Column::AllocatedBudget).add(allocated_delta),
            )
            .col_expr(
                cost_centers::Column::UsedBudget,
                Expr::col(cost_centers::Column::UsedBudget).add(used_delta),
            )
            .col_expr(
                cost_centers::Column::AvailableBudget,
                Expr::col(cost_centers::Column::AvailableBudget)
                    .add(allocated_delta - used_delta),
            )
            .filter(cost_centers::Column::Id.eq(entry.cost_center_id.to_string()))
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            return Err(EngineError::not_found(
                EntityKind::CostCenter,
                entry.cost_center_id.to_string(),
            ));
        }

        cost_center_transactions::ActiveModel::from(&entry)
            .insert(db)
            .await?;
        info!(
            cost_center_id = %entry.cost_center_id,
            kind = entry.kind.as_str(),
            amount_minor = entry.amount_minor,
            budget_id = ?entry.budget.as_ref().map(|b| b.id),
            "ledger entry booked"
        );
        Ok(entry)
    }

    pub(super) fn require_operator(ctx: &Context, action: &str) -> ResultEngine<()> {
        if !ctx.is_super_admin() {
            return Err(EngineError::Forbidden(format!(
                "only super-admins can {action}"
            )));
        }
        Ok(())
    }

    pub async fn record_allocation(
        &self,
        ctx: &Context,
        cost_center_id: Uuid,
        amount_minor: i64,
        description: &str,
    ) -> ResultEngine<CostCenterTransaction> {
        Self::require_operator(ctx, "allocate budget")?;
        let entry = CostCenterTransaction::new(
            cost_center_id,
            TransactionKind::Allocation,
            None,
            amount_minor,
            normalize_optional(Some(description)).unwrap_or_else(|| "Allocation".to_string()),
            ctx.actor_id.clone(),
            ctx.actor_name.clone(),
            None,
            ctx.now,
        )?;
        with_tx!(self, |db_tx| {
            self.require_cost_center(&db_tx, ctx, cost_center_id).await?;
            self.book_entry(&db_tx, entry).await
        })
    }

    /// Book spending outside the approval flow. The budget reference is
    /// optional.
    pub async fn record_expense(
        &self,
        ctx: &Context,
        cmd: LedgerEntryCmd,
    ) -> ResultEngine<CostCenterTransaction> {
        self.record_direct(ctx, TransactionKind::Expense, cmd).await
    }

    pub async fn record_refund(
        &self,
        ctx: &Context,
        cmd: LedgerEntryCmd,
    ) -> ResultEngine<CostCenterTransaction> {
        Self::require_operator(ctx, "book refunds")?;
        self.record_direct(ctx, TransactionKind::Refund, cmd).await
    }

    async fn record_direct(
        &self,
        ctx: &Context,
        kind: TransactionKind,
        cmd: LedgerEntryCmd,
    ) -> ResultEngine<CostCenterTransaction> {
        let description = normalize_optional(cmd.description.as_deref()).unwrap_or_else(|| {
            match (&cmd.budget, kind) {
                (Some(budget), TransactionKind::Refund) => format!("Refund: {}", budget.title),
                (Some(budget), _) => format!("Budget: {}", budget.title),
                (None, TransactionKind::Refund) => "Refund".to_string(),
                (None, _) => "Expense".to_string(),
            }
        });
        let entry = CostCenterTransaction::new(
            cmd.cost_center_id,
            kind,
            None,
            cmd.amount_minor,
            description,
            ctx.actor_id.clone(),
            ctx.actor_name.clone(),
            cmd.budget,
            ctx.now,
        )?;
        with_tx!(self, |db_tx| {
            self.require_cost_center(&db_tx, ctx, cmd.cost_center_id).await?;
            self.book_entry(&db_tx, entry).await
        })
    }

    pub async fn record_adjustment(
        &self,
        ctx: &Context,
        cmd: AdjustmentCmd,
    ) -> ResultEngine<CostCenterTransaction> {
        Self::require_operator(ctx, "adjust balances")?;
        let description = normalize_required(&cmd.description, "adjustment description")?;
        let entry = CostCenterTransaction::new(
            cmd.cost_center_id,
            TransactionKind::Adjustment,
            Some(cmd.kind),
            cmd.amount_minor,
            description,
            ctx.actor_id.clone(),
            ctx.actor_name.clone(),
            None,
            ctx.now,
        )?;
        with_tx!(self, |db_tx| {
            self.require_cost_center(&db_tx, ctx, cmd.cost_center_id).await?;
            self.book_entry(&db_tx, entry).await
        })
    }

    /// Stored balances of a cost center.
    pub async fn balances_of(&self, ctx: &Context, cost_center_id: Uuid) -> ResultEngine<Balances> {
        let cost_center = self
            .require_cost_center(&self.database, ctx, cost_center_id)
            .await?;
        Ok(cost_center.balances())
    }

    /// Balances obtained by reducing the transaction log from zero.
    pub async fn replay_balances(
        &self,
        ctx: &Context,
        cost_center_id: Uuid,
    ) -> ResultEngine<Balances> {
        let log = self.list_transactions(ctx, cost_center_id).await?;
        replay(&log)
    }

    /// Transactions of a cost center, oldest first.
    pub async fn list_transactions(
        &self,
        ctx: &Context,
        cost_center_id: Uuid,
    ) -> ResultEngine<Vec<CostCenterTransaction>> {
        self.require_cost_center(&self.database, ctx, cost_center_id)
            .await?;
        self.load_transactions(&self.database, cost_center_id).await
    }

    async fn load_transactions<C: ConnectionTrait>(
        &self,
        db: &C,
        cost_center_id: Uuid,
    ) -> ResultEngine<Vec<CostCenterTransaction>> {
        cost_center_transactions::Entity::find()
            .filter(cost_center_transactions::Column::CostCenterId.eq(cost_center_id.to_string()))
            .order_by_asc(cost_center_transactions::Column::CreatedAt)
            .order_by_asc(cost_center_transactions::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(CostCenterTransaction::try_from)
            .collect()
    }

    /// Recomputes the denormalized balances of a cost center from its
    /// transaction log.
    pub async fn recompute_balances(
        &self,
        ctx: &Context,
        cost_center_id: Uuid,
    ) -> ResultEngine<Balances> {
        Self::require_operator(ctx, "recompute balances")?;
        with_tx!(self, |db_tx| {
            let cost_center = self.require_cost_center(&db_tx, ctx, cost_center_id).await?;
            let log = self.load_transactions(&db_tx, cost_center_id).await?;
            let balances = replay(&log)?;

            let model = cost_centers::ActiveModel {
                id: ActiveValue::Set(cost_center_id.to_string()),
                allocated_budget: ActiveValue::Set(balances.allocated),
                used_budget: ActiveValue::Set(balances.used),
                available_budget: ActiveValue::Set(balances.available),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            if cost_center.balances() != balances {
                info!(
                    %cost_center_id,
                    before = ?cost_center.balances(),
                    after = ?balances,
                    "cost center balances rewritten from the log"
                );
            }
            Ok(balances)
        })
    }

    /// Expenses minus refunds tagged with the budget.
    pub async fn net_booked_for_budget(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<i64> {
        self.require_budget(&self.database, ctx, budget_id).await?;
        self.net_booked(&self.database, budget_id).await
    }

    pub(super) async fn net_booked<C: ConnectionTrait>(
        &self,
        db: &C,
        budget_id: Uuid,
    ) -> ResultEngine<i64> {
        Ok(self
            .booked_by_cost_center(db, budget_id)
            .await?
            .into_iter()
            .map(|(_, net)| net)
            .sum())
    }

    /// Net expense booked for a budget, per cost center.
    pub(super) async fn booked_by_cost_center<C: ConnectionTrait>(
        &self,
        db: &C,
        budget_id: Uuid,
    ) -> ResultEngine<Vec<(Uuid, i64)>> {
        let models = cost_center_transactions::Entity::find()
            .filter(cost_center_transactions::Column::BudgetId.eq(budget_id.to_string()))
            .order_by_asc(cost_center_transactions::Column::CreatedAt)
            .all(db)
            .await?;
        let mut out: Vec<(Uuid, i64)> = Vec::new();
        for model in models {
            let entry = CostCenterTransaction::try_from(model)?;
            let signed = match entry.kind {
                TransactionKind::Expense => entry.amount_minor,
                TransactionKind::Refund => -entry.amount_minor,
                TransactionKind::Allocation | TransactionKind::Adjustment => continue,
            };
            match out.iter_mut().find(|(id, _)| *id == entry.cost_center_id) {
                Some((_, net)) => *net += signed,
                None => out.push((entry.cost_center_id, signed)),
            }
        }
        Ok(out)
    }
}
