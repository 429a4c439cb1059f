use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    ActorRole, Budget, BudgetFilter, BudgetItem, BudgetRef, BudgetStatus, Context,
    CostCenterTransaction, EngineError, ItemAction, ItemUpdate, NewBudgetCmd, NewItemCmd,
    Operation, ResultEngine, TransactionKind, budget_items, budget_messages, budgets,
    error::EntityKind,
    lifecycle::{can_delete_budget, item_action_allowed},
    util::normalize_required,
};

use super::{Engine, RefundPolicy, with_tx};

/// Budget total exceeds what is left on its cost center.
///
/// Approval is still allowed; this is only surfaced as a warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverBudget {
    pub cost_center_id: Uuid,
    pub total_cash: i64,
    pub available: i64,
}

impl OverBudget {
    pub(super) fn check(cost_center_id: Uuid, total_cash: i64, available: i64) -> Option<Self> {
        (total_cash > available).then_some(Self {
            cost_center_id,
            total_cash,
            available,
        })
    }

    pub fn shortfall(&self) -> i64 {
        self.total_cash - self.available
    }
}

pub(super) fn invalid_transition(budget: &Budget, operation: Operation) -> EngineError {
    EngineError::InvalidTransition {
        budget_id: budget.id.to_string(),
        status: budget.status,
        operation,
    }
}

impl Engine {
    /// Create a draft budget for the caller's company.
    pub async fn create_budget(&self, ctx: &Context, cmd: NewBudgetCmd) -> ResultEngine<Budget> {
        if ctx.role != ActorRole::Manager {
            return Err(EngineError::Forbidden(
                "only managers can request budgets".to_string(),
            ));
        }
        let title = normalize_required(&cmd.title, "title")?;
        let mut budget = Budget::new(
            ctx.company_id.clone(),
            cmd.cost_center_id,
            title,
            cmd.budget_type,
            ctx.actor_id.clone(),
            ctx.actor_name.clone(),
            ctx.now,
        );
        for (position, item) in cmd.items.into_iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| EngineError::Validation("too many items".to_string()))?;
            budget.items.push(new_item(budget.id, position, item)?);
        }
        budget.recompute_totals()?;

        with_tx!(self, |db_tx| {
            if let Some(cost_center_id) = budget.cost_center_id {
                self.require_cost_center(&db_tx, ctx, cost_center_id).await?;
            }
            budgets::ActiveModel::try_from(&budget)?
                .insert(&db_tx)
                .await?;
            for item in &budget.items {
                budget_items::ActiveModel::from(item).insert(&db_tx).await?;
            }
            info!(budget_id = %budget.id, company_id = %budget.company_id, "budget created");
            Ok(budget)
        })
    }

    pub async fn budget(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<Budget> {
        self.require_budget(&self.database, ctx, budget_id).await
    }

    /// Open a budget for review.
    ///
    /// The first time the operations team opens a submitted budget it moves
    /// to `reviewed`.
    pub async fn open_budget(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<Budget> {
        let budget = self.budget(ctx, budget_id).await?;
        if ctx.is_super_admin() && budget.status == BudgetStatus::Submitted {
            return Ok(self.mark_reviewed(ctx, budget_id).await?.budget);
        }
        Ok(budget)
    }

    /// Budgets visible to the caller, newest first.
    pub async fn list_budgets(&self, ctx: &Context, filter: BudgetFilter) -> ResultEngine<Vec<Budget>> {
        let mut query = budgets::Entity::find();
        if ctx.is_super_admin() {
            if let Some(company_id) = filter.company_id {
                query = query.filter(budgets::Column::CompanyId.eq(company_id));
            }
        } else {
            query = query.filter(budgets::Column::CompanyId.eq(ctx.company_id.clone()));
        }
        if let Some(status) = filter.status {
            query = query.filter(budgets::Column::Status.eq(status.as_str()));
        }
        if let Some(cost_center_id) = filter.cost_center_id {
            query = query.filter(budgets::Column::CostCenterId.eq(cost_center_id.to_string()));
        }
        let models = query
            .order_by_desc(budgets::Column::CreatedAt)
            .order_by_asc(budgets::Column::Id)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let mut budget = Budget::try_from(model)?;
            budget.items = self.load_items(&self.database, budget.id).await?;
            out.push(budget);
        }
        Ok(out)
    }

    pub async fn add_item(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        cmd: NewItemCmd,
    ) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let mut budget = self.require_budget(&db_tx, ctx, budget_id).await?;
            ensure_item_action(&budget, ctx, ItemAction::Add)?;
            let position = budget
                .items
                .iter()
                .map(|item| item.position + 1)
                .max()
                .unwrap_or(0);
            let item = new_item(budget.id, position, cmd)?;
            budget_items::ActiveModel::from(&item).insert(&db_tx).await?;
            budget.items.push(item);
            self.save_items_change(&db_tx, ctx, budget).await
        })
    }

    pub async fn update_item(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        item_id: Uuid,
        update: ItemUpdate,
    ) -> ResultEngine<Budget> {
        if update.is_empty() {
            return Err(EngineError::Validation("nothing to update".to_string()));
        }
        with_tx!(self, |db_tx| {
            let mut budget = self.require_budget(&db_tx, ctx, budget_id).await?;
            ensure_item_action(&budget, ctx, ItemAction::Edit)?;
            let item = budget
                .items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| EngineError::not_found(EntityKind::BudgetItem, item_id.to_string()))?;
            item.update(update.qty, update.unit_price, update.unit_points)?;
            budget_items::ActiveModel {
                id: ActiveValue::Set(item.id.to_string()),
                qty: ActiveValue::Set(item.qty),
                unit_price: ActiveValue::Set(item.unit_price),
                unit_points: ActiveValue::Set(item.unit_points),
                subtotal_cash: ActiveValue::Set(item.subtotal_cash),
                subtotal_points: ActiveValue::Set(item.subtotal_points),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            self.save_items_change(&db_tx, ctx, budget).await
        })
    }

    /// Remove an item. Removing the last item never changes the status.
    pub async fn delete_item(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        item_id: Uuid,
    ) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let mut budget = self.require_budget(&db_tx, ctx, budget_id).await?;
            ensure_item_action(&budget, ctx, ItemAction::Delete)?;
            let index = budget
                .items
                .iter()
                .position(|item| item.id == item_id)
                .ok_or_else(|| EngineError::not_found(EntityKind::BudgetItem, item_id.to_string()))?;
            budget.items.remove(index);
            budget_items::Entity::delete_by_id(item_id.to_string())
                .exec(&db_tx)
                .await?;
            self.save_items_change(&db_tx, ctx, budget).await
        })
    }

    async fn save_items_change(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &Context,
        mut budget: Budget,
    ) -> ResultEngine<Budget> {
        budget.recompute_totals()?;
        budget.updated_by = ctx.actor_id.clone();
        let status = budget.status;
        self.write_budget(db_tx, &budget, status).await
    }

    /// Delete a budget with its items and messages.
    ///
    /// Ledger entries are never deleted. Under [`RefundPolicy::Automatic`] any
    /// expense still booked for the budget is compensated by a refund; the
    /// refunds are returned.
    pub async fn delete_budget(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<Vec<CostCenterTransaction>> {
        with_tx!(self, |db_tx| {
            let budget = self.require_budget(&db_tx, ctx, budget_id).await?;
            if !can_delete_budget(ctx.role, budget.status) {
                return Err(invalid_transition(&budget, Operation::DeleteBudget));
            }

            let mut refunds = Vec::new();
            for (cost_center_id, net) in self.booked_by_cost_center(&db_tx, budget.id).await? {
                if net <= 0 {
                    continue;
                }
                match self.refund_policy {
                    RefundPolicy::Automatic => {
                        let entry = CostCenterTransaction::new(
                            cost_center_id,
                            TransactionKind::Refund,
                            None,
                            net,
                            format!("Refund: budget \"{}\" deleted", budget.title),
                            ctx.actor_id.clone(),
                            ctx.actor_name.clone(),
                            Some(BudgetRef {
                                id: budget.id,
                                title: budget.title.clone(),
                            }),
                            ctx.now,
                        )?;
                        refunds.push(self.book_entry(&db_tx, entry).await?);
                    }
                    RefundPolicy::Manual => {
                        warn!(
                            budget_id = %budget.id,
                            %cost_center_id,
                            amount_minor = net,
                            "deleted budget still has a booked expense; refund it manually"
                        );
                    }
                }
            }

            budget_items::Entity::delete_many()
                .filter(budget_items::Column::BudgetId.eq(budget.id.to_string()))
                .exec(&db_tx)
                .await?;
            budget_messages::Entity::delete_many()
                .filter(budget_messages::Column::BudgetId.eq(budget.id.to_string()))
                .exec(&db_tx)
                .await?;
            let res = budgets::Entity::delete_many()
                .filter(budgets::Column::Id.eq(budget.id.to_string()))
                .filter(budgets::Column::Version.eq(budget.version))
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::conflict(EntityKind::Budget, budget.id.to_string()));
            }
            info!(budget_id = %budget.id, status = %budget.status, "budget deleted");
            Ok(refunds)
        })
    }

    /// Compare the budget total with its cost center's available balance.
    pub async fn over_budget(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<Option<OverBudget>> {
        let budget = self.budget(ctx, budget_id).await?;
        let Some(cost_center_id) = budget.cost_center_id else {
            return Ok(None);
        };
        let cost_center = self
            .require_cost_center(&self.database, ctx, cost_center_id)
            .await?;
        Ok(OverBudget::check(
            cost_center_id,
            budget.total_cash,
            cost_center.available_budget,
        ))
    }
}

fn new_item(budget_id: Uuid, position: i32, cmd: NewItemCmd) -> ResultEngine<BudgetItem> {
    let base_product_id = normalize_required(&cmd.base_product_id, "base product id")?;
    BudgetItem::new(
        budget_id,
        position,
        base_product_id,
        cmd.qty,
        cmd.unit_price,
        cmd.unit_points,
    )
}

fn ensure_item_action(budget: &Budget, ctx: &Context, action: ItemAction) -> ResultEngine<()> {
    if item_action_allowed(action, ctx.role, budget.status) {
        Ok(())
    } else {
        Err(invalid_transition(budget, action.operation()))
    }
}
