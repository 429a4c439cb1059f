use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Budget, BudgetItem, BudgetStatus, Context, CostCenter, EngineError, ResultEngine,
    budget_items, budgets, cost_centers, error::EntityKind,
};

use super::Engine;

impl Engine {
    /// Load a budget with its items. Budgets of other companies are reported
    /// as missing to managers.
    pub(super) async fn require_budget<C: ConnectionTrait>(
        &self,
        db: &C,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id.to_string())
            .one(db)
            .await?
            .filter(|model| ctx.can_access_company(&model.company_id))
            .ok_or_else(|| EngineError::not_found(EntityKind::Budget, budget_id.to_string()))?;
        let mut budget = Budget::try_from(model)?;
        budget.items = self.load_items(db, budget_id).await?;
        Ok(budget)
    }

    pub(super) async fn load_items<C: ConnectionTrait>(
        &self,
        db: &C,
        budget_id: Uuid,
    ) -> ResultEngine<Vec<BudgetItem>> {
        budget_items::Entity::find()
            .filter(budget_items::Column::BudgetId.eq(budget_id.to_string()))
            .order_by_asc(budget_items::Column::Position)
            .all(db)
            .await?
            .into_iter()
            .map(BudgetItem::try_from)
            .collect()
    }

    pub(super) async fn require_cost_center<C: ConnectionTrait>(
        &self,
        db: &C,
        ctx: &Context,
        cost_center_id: Uuid,
    ) -> ResultEngine<CostCenter> {
        let model = cost_centers::Entity::find_by_id(cost_center_id.to_string())
            .one(db)
            .await?
            .filter(|model| ctx.can_access_company(&model.company_id))
            .ok_or_else(|| {
                EngineError::not_found(EntityKind::CostCenter, cost_center_id.to_string())
            })?;
        let mut cost_center = CostCenter::try_from(model)?;
        cost_center.pending_requests = self.pending_requests(db, cost_center_id).await?;
        Ok(cost_center)
    }

    /// Budgets against the cost center that are waiting for a decision.
    pub(super) async fn pending_requests<C: ConnectionTrait>(
        &self,
        db: &C,
        cost_center_id: Uuid,
    ) -> ResultEngine<u64> {
        let awaiting: Vec<&str> = BudgetStatus::AWAITING_DECISION
            .iter()
            .map(|status| status.as_str())
            .collect();
        budgets::Entity::find()
            .filter(budgets::Column::CostCenterId.eq(cost_center_id.to_string()))
            .filter(budgets::Column::Status.is_in(awaiting))
            .count(db)
            .await
            .map_err(Into::into)
    }

    /// Persist the budget row if nobody else wrote it since it was read.
    ///
    /// The write is conditional on the stored `version` and `status` still
    /// matching `budget.version` and `expected`; on success the returned
    /// budget carries the bumped version.
    pub(super) async fn write_budget<C: ConnectionTrait>(
        &self,
        db: &C,
        budget: &Budget,
        expected: BudgetStatus,
    ) -> ResultEngine<Budget> {
        let mut next = budget.clone();
        next.version += 1;
        let model = budgets::ActiveModel::try_from(&next)?;
        let res = budgets::Entity::update_many()
            .set(model)
            .filter(budgets::Column::Id.eq(budget.id.to_string()))
            .filter(budgets::Column::Version.eq(budget.version))
            .filter(budgets::Column::Status.eq(expected.as_str()))
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            return Err(EngineError::conflict(EntityKind::Budget, budget.id.to_string()));
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::Database;

    use crate::{NewBudgetCmd, NewItemCmd};

    use super::*;

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        Engine::builder().database(db).build().await.unwrap()
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let engine = engine().await;
        let ctx = Context::manager("m-ana", "Ana", "acme");
        let budget = engine
            .create_budget(
                &ctx,
                NewBudgetCmd::new("Welcome kits").item(NewItemCmd::new("mug", 1, 100)),
            )
            .await
            .unwrap();

        let written = engine
            .write_budget(&engine.database, &budget, BudgetStatus::Draft)
            .await
            .unwrap();
        assert_eq!(written.version, budget.version + 1);

        let err = engine
            .write_budget(&engine.database, &budget, BudgetStatus::Draft)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Conflict {
                entity: EntityKind::Budget,
                id: budget.id.to_string(),
            }
        );

        let err = engine
            .write_budget(&engine.database, &written, BudgetStatus::Submitted)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
        let stored = engine.budget(&ctx, budget.id).await.unwrap();
        assert_eq!(stored.version, written.version);
    }
}
