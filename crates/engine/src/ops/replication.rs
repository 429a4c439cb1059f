use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::{info, warn};

use crate::{
    BaseProduct, Budget, BudgetItem, CompanyProduct, Context, EngineError, ProductUpsert,
    ReplicationFailure, ReplicationReport, ResultEngine, budget_items, company_products_of,
    insert_base_product,
};

use super::{Engine, with_tx};

impl Engine {
    /// Replicate every item of `budget` that has no company product yet.
    ///
    /// Per-item lookup or validation failures are collected in the report.
    /// If every pending item fails the whole operation fails with
    /// [`EngineError::ReplicationFailed`]. Database errors always abort.
    pub(super) async fn replicate_items(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &Context,
        budget: &mut Budget,
    ) -> ResultEngine<ReplicationReport> {
        let mut report = ReplicationReport::new(budget.id);
        let company_id = budget.company_id.clone();

        for item in budget.items.iter_mut() {
            if item.is_replicated() {
                report.skipped_count += 1;
                continue;
            }
            match self.replicate_item(db_tx, ctx, &company_id, item).await {
                Ok(product) => {
                    budget_items::ActiveModel {
                        id: ActiveValue::Set(item.id.to_string()),
                        replicated_product_id: ActiveValue::Set(Some(product.id.to_string())),
                        ..Default::default()
                    }
                    .update(db_tx)
                    .await?;
                    item.replicated_product_id = Some(product.id);
                    report.replicated_count += 1;
                }
                Err(
                    err @ (EngineError::NotFound { .. }
                    | EngineError::Validation(_)
                    | EngineError::InvalidAmount(_)),
                ) => {
                    report.failures.push(ReplicationFailure {
                        item_id: item.id,
                        base_product_id: item.base_product_id.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if report.attempted() > 0 && report.replicated_count == 0 {
            return Err(EngineError::ReplicationFailed {
                budget_id: budget.id.to_string(),
                failures: report.failures,
            });
        }
        if report.failures.is_empty() {
            info!(
                budget_id = %budget.id,
                replicated = report.replicated_count,
                skipped = report.skipped_count,
                "budget items replicated"
            );
        } else {
            warn!(
                budget_id = %budget.id,
                replicated = report.replicated_count,
                failed = report.failures.len(),
                "budget items partially replicated"
            );
        }
        Ok(report)
    }

    async fn replicate_item(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &Context,
        company_id: &str,
        item: &BudgetItem,
    ) -> ResultEngine<CompanyProduct> {
        let base = self
            .catalog
            .base_product(db_tx, &item.base_product_id)
            .await?;
        if !base.active {
            return Err(EngineError::Validation(format!(
                "base product \"{}\" is inactive",
                base.id
            )));
        }
        let request = ProductUpsert {
            company_id: company_id.to_string(),
            base,
            price_minor: item.unit_price,
            points: item.unit_points,
            qty: item.qty,
            actor_id: ctx.actor_id.clone(),
            now: ctx.now,
        };
        self.catalog.upsert_company_product(db_tx, &request).await
    }

    /// Company products of the caller's company.
    pub async fn company_products(&self, ctx: &Context) -> ResultEngine<Vec<CompanyProduct>> {
        company_products_of(&self.database, &ctx.company_id).await
    }

    /// Register a base product in the table-backed catalog.
    pub async fn register_base_product(
        &self,
        ctx: &Context,
        product: BaseProduct,
    ) -> ResultEngine<BaseProduct> {
        Self::require_operator(ctx, "register base products")?;
        with_tx!(self, |db_tx| {
            insert_base_product(&db_tx, &product).await?;
            info!(base_product_id = %product.id, sku = %product.sku, "base product registered");
            Ok(product)
        })
    }
}
