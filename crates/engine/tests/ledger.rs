mod common;

use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;

use common::{COMPANY, awaiting_approval, cost_center, engine_with, engine_with_db, manager, ops};
use engine::{
    AdjustmentCmd, AdjustmentKind, BudgetStatus, EngineError, EntityKind, LedgerEntryCmd,
    NewCostCenterCmd, RefundPolicy, TransactionKind,
};

#[tokio::test]
async fn balances_equal_the_replayed_log() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 2_000).await;
    engine
        .record_allocation(&ops(), cc.id, 2_500, "Q4 top-up")
        .await
        .unwrap();
    engine
        .record_refund(&ops(), LedgerEntryCmd::new(cc.id, 500))
        .await
        .unwrap();
    engine
        .record_adjustment(
            &ops(),
            AdjustmentCmd::new(cc.id, AdjustmentKind::DecreaseAllocated, 1_000, "Budget cut"),
        )
        .await
        .unwrap();
    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 4, 1_000)]).await;
    engine.approve_values(&manager(), budget.id).await.unwrap();

    let stored = engine.balances_of(&ops(), cc.id).await.unwrap();
    let replayed = engine.replay_balances(&ops(), cc.id).await.unwrap();
    assert_eq!(stored, replayed);
    assert_eq!(stored.allocated, 10_000 + 2_500 - 1_000);
    assert_eq!(stored.used, 2_000 - 500 + 4_000);
    assert!(stored.is_consistent());
}

#[tokio::test]
async fn concurrent_expenses_do_not_lose_updates() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 0).await;

    let ctx = ops();
    let (a, b, c) = tokio::join!(
        engine.record_expense(&ctx, LedgerEntryCmd::new(cc.id, 100)),
        engine.record_expense(&ctx, LedgerEntryCmd::new(cc.id, 200)),
        engine.record_expense(&ctx, LedgerEntryCmd::new(cc.id, 300)),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let balances = engine.balances_of(&ctx, cc.id).await.unwrap();
    assert_eq!(balances.used, 600);
    assert_eq!(balances.available, 9_400);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 1_000, 0).await;

    let err = engine
        .record_allocation(&ops(), cc.id, 0, "nothing")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("amount_minor must be > 0".to_string())
    );
    let err = engine
        .record_expense(&ops(), LedgerEntryCmd::new(cc.id, -5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(engine.list_transactions(&ops(), cc.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_cost_center_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let missing = Uuid::new_v4();

    let err = engine
        .record_allocation(&ops(), missing, 100, "")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound {
            entity: EntityKind::CostCenter,
            id: missing.to_string(),
        }
    );
}

#[tokio::test]
async fn operator_actions_need_a_super_admin() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 1_000, 500).await;

    let err = engine
        .record_refund(&manager(), LedgerEntryCmd::new(cc.id, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine
        .record_allocation(&manager(), cc.id, 100, "self-service")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine.recompute_balances(&manager(), cc.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn adjustments_require_a_description() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 1_000, 0).await;

    let err = engine
        .record_adjustment(
            &ops(),
            AdjustmentCmd::new(cc.id, AdjustmentKind::IncreaseUsed, 10, "  "),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let entry = engine
        .record_adjustment(
            &ops(),
            AdjustmentCmd::new(cc.id, AdjustmentKind::IncreaseUsed, 10, "Courier fee"),
        )
        .await
        .unwrap();
    assert_eq!(entry.kind, TransactionKind::Adjustment);
    assert_eq!(entry.adjustment, Some(AdjustmentKind::IncreaseUsed));
    assert_eq!(engine.balances_of(&ops(), cc.id).await.unwrap().used, 10);
}

#[tokio::test]
async fn recompute_restores_balances_from_the_log() {
    let (engine, db) = engine_with_db().await;
    let cc = cost_center(&engine, 5_000, 1_200).await;

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE cost_centers SET used_budget = ?, available_budget = ? WHERE id = ?",
        vec![0i64.into(), 0i64.into(), cc.id.to_string().into()],
    ))
    .await
    .unwrap();

    let balances = engine.recompute_balances(&ops(), cc.id).await.unwrap();
    assert_eq!(
        (balances.allocated, balances.used, balances.available),
        (5_000, 1_200, 3_800)
    );
    assert_eq!(engine.balances_of(&ops(), cc.id).await.unwrap(), balances);
}

#[tokio::test]
async fn cost_center_codes_are_unique_per_company() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_cost_center(&ops(), NewCostCenterCmd::new(COMPANY, "Sales", "SAL"))
        .await
        .unwrap();

    let err = engine
        .create_cost_center(&ops(), NewCostCenterCmd::new(COMPANY, "Sales 2", "SAL"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    engine
        .create_cost_center(&ops(), NewCostCenterCmd::new("globex", "Sales", "SAL"))
        .await
        .unwrap();

    assert_eq!(engine.list_cost_centers(&manager()).await.unwrap().len(), 1);
    assert_eq!(engine.list_cost_centers(&ops()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_an_approved_budget_refunds_under_automatic_policy() {
    let (engine, _db) = engine_with(RefundPolicy::Automatic, None).await;
    let cc = cost_center(&engine, 10_000, 0).await;
    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 3, 1_000)]).await;
    engine.approve_values(&manager(), budget.id).await.unwrap();
    assert_eq!(engine.net_booked_for_budget(&ops(), budget.id).await.unwrap(), 3_000);

    let refunds = engine.delete_budget(&ops(), budget.id).await.unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].kind, TransactionKind::Refund);
    assert_eq!(refunds[0].amount_minor, 3_000);

    let balances = engine.balances_of(&ops(), cc.id).await.unwrap();
    assert_eq!((balances.used, balances.available), (0, 10_000));
    let err = engine.budget(&ops(), budget.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    // The log keeps the expense and its refund.
    assert_eq!(engine.list_transactions(&ops(), cc.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn deleting_an_approved_budget_books_nothing_under_manual_policy() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 0).await;
    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 3, 1_000)]).await;
    engine.approve_values(&manager(), budget.id).await.unwrap();

    let refunds = engine.delete_budget(&ops(), budget.id).await.unwrap();
    assert!(refunds.is_empty());
    assert_eq!(engine.balances_of(&ops(), cc.id).await.unwrap().used, 3_000);

    engine
        .record_refund(
            &ops(),
            LedgerEntryCmd::new(cc.id, 3_000).budget(budget.id, budget.title.clone()),
        )
        .await
        .unwrap();
    assert_eq!(engine.balances_of(&ops(), cc.id).await.unwrap().used, 0);
}

#[tokio::test]
async fn managers_delete_only_drafts() {
    let (engine, _db) = engine_with_db().await;
    let budget = awaiting_approval(&engine, None, &[("mug", 1, 100)]).await;
    assert_eq!(budget.status, BudgetStatus::AwaitingApproval);

    let err = engine.delete_budget(&manager(), budget.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let draft = common::draft(&engine, None, &[("cap", 1, 100)]).await;
    engine.delete_budget(&manager(), draft.id).await.unwrap();
    assert_eq!(
        engine.list_budgets(&manager(), Default::default()).await.unwrap().len(),
        1
    );
}
