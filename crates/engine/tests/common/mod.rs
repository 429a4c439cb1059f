#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{Database, DatabaseConnection};

use engine::{
    BaseProduct, Budget, Catalog, Context, CostCenter, Engine, LedgerEntryCmd, NewBudgetCmd,
    NewCostCenterCmd, NewItemCmd, RefundPolicy,
};
use migration::MigratorTrait;
use uuid::Uuid;

pub const COMPANY: &str = "acme";

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with(RefundPolicy::Manual, None).await
}

pub async fn engine_with(
    policy: RefundPolicy,
    catalog: Option<Arc<dyn Catalog>>,
) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let mut builder = Engine::builder()
        .database(db.clone())
        .refund_policy(policy);
    if let Some(catalog) = catalog {
        builder = builder.catalog(catalog);
    }
    let engine = builder.build().await.unwrap();
    (engine, db)
}

pub fn manager() -> Context {
    Context::manager("m-ana", "Ana", COMPANY)
}

pub fn ops() -> Context {
    Context::super_admin("ops-1", "Operations", "central")
}

/// Cost center with `allocated` booked as opening allocation and `used`
/// booked as a plain expense.
pub async fn cost_center(engine: &Engine, allocated: i64, used: i64) -> CostCenter {
    let cc = engine
        .create_cost_center(
            &ops(),
            NewCostCenterCmd::new(COMPANY, "Marketing", format!("MKT-{}", Uuid::new_v4()))
                .opening_allocation(allocated),
        )
        .await
        .unwrap();
    if used > 0 {
        engine
            .record_expense(
                &ops(),
                LedgerEntryCmd::new(cc.id, used).description("Trade fair"),
            )
            .await
            .unwrap();
    }
    engine.cost_center(&ops(), cc.id).await.unwrap()
}

pub async fn seed_products(engine: &Engine, ids: &[&str]) {
    for id in ids {
        let product = BaseProduct::new(id, &format!("SKU-{}", id.to_uppercase()), id).unwrap();
        engine.register_base_product(&ops(), product).await.unwrap();
    }
}

pub async fn draft(engine: &Engine, cost_center_id: Option<Uuid>, items: &[(&str, i64, i64)]) -> Budget {
    let mut cmd = NewBudgetCmd::new("Welcome kits");
    if let Some(id) = cost_center_id {
        cmd = cmd.cost_center_id(id);
    }
    for (product, qty, price) in items {
        cmd = cmd.item(NewItemCmd::new(*product, *qty, *price).unit_points(1));
    }
    engine.create_budget(&manager(), cmd).await.unwrap()
}

/// Draft -> submitted -> reviewed -> awaiting_approval.
pub async fn awaiting_approval(
    engine: &Engine,
    cost_center_id: Option<Uuid>,
    items: &[(&str, i64, i64)],
) -> Budget {
    let budget = draft(engine, cost_center_id, items).await;
    engine.submit(&manager(), budget.id).await.unwrap();
    engine.open_budget(&ops(), budget.id).await.unwrap();
    engine
        .send_final_values(&ops(), budget.id)
        .await
        .unwrap()
        .budget
}

/// Walk an approved budget down to `in_production`.
pub async fn into_production(engine: &Engine, budget_id: Uuid) {
    engine.mark_awaiting_payment(&ops(), budget_id).await.unwrap();
    engine.confirm_payment(&ops(), budget_id).await.unwrap();
    engine.release_to_production(&ops(), budget_id).await.unwrap();
}
