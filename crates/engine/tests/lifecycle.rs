mod common;

use chrono::{DateTime, Utc};

use common::{awaiting_approval, cost_center, draft, engine_with_db, manager, ops};
use engine::{
    BudgetFilter, BudgetStatus, Context, EngineError, ItemUpdate, NewBudgetCmd, NewItemCmd,
    Operation, TransactionKind, TransitionArgs,
};

#[tokio::test]
async fn approving_books_one_expense_for_the_budget_total() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 2_000).await;
    assert_eq!(
        (cc.allocated_budget, cc.used_budget, cc.available_budget),
        (10_000, 2_000, 8_000)
    );

    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 2, 1_500), ("cap", 4, 500)]).await;
    assert_eq!(budget.total_cash, 5_000);
    assert_eq!(budget.status, BudgetStatus::AwaitingApproval);

    let outcome = engine.approve_values(&manager(), budget.id).await.unwrap();
    assert_eq!(outcome.budget.status, BudgetStatus::Approved);
    assert!(outcome.budget.approved_at.is_some());
    assert!(outcome.over_budget.is_none());
    let entry = outcome.ledger_entry.unwrap();
    assert_eq!(entry.kind, TransactionKind::Expense);
    assert_eq!(entry.amount_minor, 5_000);
    assert_eq!(entry.budget.as_ref().map(|b| b.id), Some(budget.id));

    let balances = engine.balances_of(&ops(), cc.id).await.unwrap();
    assert_eq!(
        (balances.allocated, balances.used, balances.available),
        (10_000, 7_000, 3_000)
    );
    let tagged: Vec<_> = engine
        .list_transactions(&ops(), cc.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.budget.as_ref().map(|b| b.id) == Some(budget.id))
        .collect();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].amount_minor, 5_000);
}

#[tokio::test]
async fn approving_twice_fails_and_books_nothing_more() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 0).await;
    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 1, 3_000)]).await;

    engine.approve_values(&manager(), budget.id).await.unwrap();
    let err = engine.approve_values(&manager(), budget.id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition {
            budget_id: budget.id.to_string(),
            status: BudgetStatus::Approved,
            operation: Operation::ApproveValues,
        }
    );

    let expenses = engine
        .list_transactions(&ops(), cc.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.kind == TransactionKind::Expense)
        .count();
    assert_eq!(expenses, 1);
    assert_eq!(engine.balances_of(&ops(), cc.id).await.unwrap().used, 3_000);
}

#[tokio::test]
async fn concurrent_approve_and_reject_have_one_winner() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 0).await;
    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 2, 2_000)]).await;

    let manager = manager();
    let ops = ops();
    let (approved, rejected) = tokio::join!(
        engine.approve_values(&manager, budget.id),
        engine.reject(&ops, budget.id, "supplier out of stock"),
    );
    assert!(approved.is_ok() ^ rejected.is_ok());
    let loser = approved.as_ref().err().or(rejected.as_ref().err()).unwrap();
    assert!(matches!(
        loser,
        EngineError::InvalidTransition { .. } | EngineError::Conflict { .. }
    ));

    let stored = engine.budget(&ops, budget.id).await.unwrap();
    let used = engine.balances_of(&ops, cc.id).await.unwrap().used;
    if approved.is_ok() {
        assert_eq!(stored.status, BudgetStatus::Approved);
        assert_eq!(used, 4_000);
    } else {
        assert_eq!(stored.status, BudgetStatus::Rejected);
        assert_eq!(stored.rejection_reason(), Some("supplier out of stock"));
        assert_eq!(used, 0);
    }
}

#[tokio::test]
async fn submitting_an_empty_draft_is_a_validation_error() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[]).await;

    let err = engine.submit(&manager(), budget.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let stored = engine.budget(&manager(), budget.id).await.unwrap();
    assert_eq!(stored.status, BudgetStatus::Draft);
    assert!(stored.submitted_at.is_none());
}

#[tokio::test]
async fn overflowing_totals_are_rejected_and_nothing_is_stored() {
    let (engine, _db) = engine_with_db().await;
    let half = i64::MAX / 2 + 1;

    let err = engine
        .create_budget(
            &manager(),
            NewBudgetCmd::new("Big order")
                .item(NewItemCmd::new("mug", 1, half))
                .item(NewItemCmd::new("cap", 1, half)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    let stored = engine
        .list_budgets(&manager(), BudgetFilter::default())
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn over_budget_approval_is_flagged_not_blocked() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 1_000, 0).await;
    let budget = awaiting_approval(&engine, Some(cc.id), &[("mug", 5, 1_000)]).await;

    let warning = engine.over_budget(&manager(), budget.id).await.unwrap().unwrap();
    assert_eq!(warning.shortfall(), 4_000);

    let outcome = engine.approve_values(&manager(), budget.id).await.unwrap();
    assert_eq!(outcome.over_budget.map(|o| o.available), Some(1_000));
    let balances = engine.balances_of(&ops(), cc.id).await.unwrap();
    assert_eq!(balances.available, -4_000);
    assert!(balances.is_consistent());
}

#[tokio::test]
async fn roles_are_enforced_by_the_table() {
    let (engine, _db) = engine_with_db().await;
    let budget = awaiting_approval(&engine, None, &[("mug", 1, 100)]).await;

    let err = engine.approve_values(&ops(), budget.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    let err = engine.reject(&manager(), budget.id, "no").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn reject_and_request_changes_need_text() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[("mug", 1, 100)]).await;
    engine.submit(&manager(), budget.id).await.unwrap();

    let err = engine.reject(&ops(), budget.id, "   ").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let err = engine.request_changes(&ops(), budget.id, "").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let outcome = engine
        .request_changes(&ops(), budget.id, "Cheaper mugs please")
        .await
        .unwrap();
    assert_eq!(outcome.budget.status, BudgetStatus::Submitted);
    assert_eq!(
        outcome.budget.change_request_feedback(),
        Some("Cheaper mugs please")
    );
}

#[tokio::test]
async fn withdraw_keeps_the_first_submission_time() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[("mug", 1, 100)]).await;
    let first: DateTime<Utc> = DateTime::from_timestamp(1_790_000_000, 0).unwrap();

    let submitted = engine
        .submit(&manager().at(first), budget.id)
        .await
        .unwrap()
        .budget;
    assert_eq!(submitted.submitted_at, Some(first));

    let withdrawn = engine.withdraw(&manager(), budget.id).await.unwrap().budget;
    assert_eq!(withdrawn.status, BudgetStatus::Draft);
    let resubmitted = engine.submit(&manager(), budget.id).await.unwrap().budget;
    assert_eq!(resubmitted.submitted_at, Some(first));
}

#[tokio::test]
async fn full_pipeline_reaches_published() {
    let (engine, _db) = engine_with_db().await;
    common::seed_products(&engine, &["mug"]).await;
    let budget = awaiting_approval(&engine, None, &[("mug", 3, 900)]).await;
    engine.approve_values(&manager(), budget.id).await.unwrap();
    common::into_production(&engine, budget.id).await;
    engine.replicate_to_stock(&ops(), budget.id).await.unwrap();
    engine.mark_available(&ops(), budget.id).await.unwrap();

    let at: DateTime<Utc> = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
    let published = engine.publish(&ops(), budget.id, Some(at)).await.unwrap().budget;
    assert_eq!(published.status, BudgetStatus::Published);
    assert_eq!(published.scheduled_publish_at, Some(at));
    assert!(published.completed_at.is_some());

    let err = engine
        .transition(&ops(), budget.id, Operation::Reject, TransitionArgs::new().reason("late"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn opening_a_submitted_budget_marks_it_reviewed() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[("mug", 1, 100)]).await;
    engine.submit(&manager(), budget.id).await.unwrap();

    let seen_by_manager = engine.open_budget(&manager(), budget.id).await.unwrap();
    assert_eq!(seen_by_manager.status, BudgetStatus::Submitted);
    let opened = engine.open_budget(&ops(), budget.id).await.unwrap();
    assert_eq!(opened.status, BudgetStatus::Reviewed);
    let reopened = engine.open_budget(&ops(), budget.id).await.unwrap();
    assert_eq!(reopened.status, BudgetStatus::Reviewed);
}

#[tokio::test]
async fn item_edits_keep_totals_in_sync() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[("mug", 2, 1_000)]).await;
    let budget = engine
        .add_item(&manager(), budget.id, NewItemCmd::new("cap", 3, 400))
        .await
        .unwrap();
    assert_eq!(budget.total_cash, 2_000 + 1_200);

    engine.submit(&manager(), budget.id).await.unwrap();
    let mug = budget.items[0].id;
    let err = engine
        .update_item(&manager(), budget.id, mug, ItemUpdate::new().qty(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let priced = engine
        .update_item(&ops(), budget.id, mug, ItemUpdate::new().unit_price(1_250))
        .await
        .unwrap();
    assert_eq!(priced.items[0].subtotal_cash, 2_500);
    assert_eq!(priced.total_cash, 2_500 + 1_200);
    let sum: i64 = priced.items.iter().map(|item| item.subtotal_cash).sum();
    assert_eq!(priced.total_cash, sum);
}

#[tokio::test]
async fn deleting_the_last_item_keeps_the_status() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[("mug", 1, 700)]).await;
    engine.submit(&manager(), budget.id).await.unwrap();

    let emptied = engine
        .delete_item(&manager(), budget.id, budget.items[0].id)
        .await
        .unwrap();
    assert!(emptied.items.is_empty());
    assert_eq!(emptied.total_cash, 0);
    assert_eq!(emptied.status, BudgetStatus::Submitted);
}

#[tokio::test]
async fn other_companies_cannot_see_the_budget() {
    let (engine, _db) = engine_with_db().await;
    let budget = draft(&engine, None, &[("mug", 1, 700)]).await;
    let outsider = Context::manager("m-bob", "Bob", "globex");

    let err = engine.budget(&outsider, budget.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    assert!(engine
        .list_budgets(&outsider, Default::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        engine.list_budgets(&ops(), Default::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn pending_requests_count_budgets_awaiting_a_decision() {
    let (engine, _db) = engine_with_db().await;
    let cc = cost_center(&engine, 10_000, 0).await;
    let waiting = awaiting_approval(&engine, Some(cc.id), &[("mug", 1, 100)]).await;
    draft(&engine, Some(cc.id), &[("mug", 1, 100)]).await;
    assert_eq!(engine.cost_center(&ops(), cc.id).await.unwrap().pending_requests, 1);

    engine.approve_values(&manager(), waiting.id).await.unwrap();
    assert_eq!(engine.cost_center(&ops(), cc.id).await.unwrap().pending_requests, 0);
}
