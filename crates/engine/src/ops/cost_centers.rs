use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Context, CostCenter, CostCenterTransaction, EngineError, NewCostCenterCmd, ResultEngine,
    TransactionKind, cost_centers, util::normalize_required,
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a cost center, booking the opening allocation if one is given.
    pub async fn create_cost_center(
        &self,
        ctx: &Context,
        cmd: NewCostCenterCmd,
    ) -> ResultEngine<CostCenter> {
        Self::require_operator(ctx, "create cost centers")?;
        let company_id = normalize_required(&cmd.company_id, "company id")?;
        let name = normalize_required(&cmd.name, "cost center name")?;
        let code = normalize_required(&cmd.code, "cost center code")?;
        let cost_center = CostCenter::new(company_id, name, code, ctx.now);
        let opening = cmd
            .opening_allocation
            .map(|amount| {
                CostCenterTransaction::new(
                    cost_center.id,
                    TransactionKind::Allocation,
                    None,
                    amount,
                    "Opening allocation".to_string(),
                    ctx.actor_id.clone(),
                    ctx.actor_name.clone(),
                    None,
                    ctx.now,
                )
            })
            .transpose()?;

        with_tx!(self, |db_tx| {
            let taken = cost_centers::Entity::find()
                .filter(cost_centers::Column::CompanyId.eq(cost_center.company_id.clone()))
                .filter(cost_centers::Column::Code.eq(cost_center.code.clone()))
                .one(&db_tx)
                .await?;
            if taken.is_some() {
                return Err(EngineError::Validation(format!(
                    "cost center code \"{}\" already exists",
                    cost_center.code
                )));
            }
            cost_centers::ActiveModel::from(&cost_center)
                .insert(&db_tx)
                .await?;
            if let Some(entry) = opening {
                self.book_entry(&db_tx, entry).await?;
            }
            info!(cost_center_id = %cost_center.id, company_id = %cost_center.company_id, "cost center created");
            self.require_cost_center(&db_tx, ctx, cost_center.id).await
        })
    }

    pub async fn cost_center(&self, ctx: &Context, cost_center_id: Uuid) -> ResultEngine<CostCenter> {
        self.require_cost_center(&self.database, ctx, cost_center_id)
            .await
    }

    /// Cost centers visible to the caller, by code.
    pub async fn list_cost_centers(&self, ctx: &Context) -> ResultEngine<Vec<CostCenter>> {
        let mut query = cost_centers::Entity::find();
        if !ctx.is_super_admin() {
            query = query.filter(cost_centers::Column::CompanyId.eq(ctx.company_id.clone()));
        }
        let models = query
            .order_by_asc(cost_centers::Column::CompanyId)
            .order_by_asc(cost_centers::Column::Code)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let mut cost_center = CostCenter::try_from(model)?;
            cost_center.pending_requests = self
                .pending_requests(&self.database, cost_center.id)
                .await?;
            out.push(cost_center);
        }
        Ok(out)
    }
}
