use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    Budget, BudgetMessage, BudgetNote, BudgetRef, Context, CostCenterTransaction, Effect,
    EngineError, Operation, ReplicationReport, ResultEngine, TransactionKind, TransitionArgs,
    budget_messages, lifecycle, util::normalize_optional,
};

use super::{Engine, OverBudget, budgets::invalid_transition, with_tx};

/// Result of one lifecycle transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub budget: Budget,
    /// The expense booked by `approve_values`.
    pub ledger_entry: Option<CostCenterTransaction>,
    /// Set by operations that replicate items into the catalog.
    pub replication: Option<ReplicationReport>,
    /// Set when an approval pushed the cost center past its available balance.
    pub over_budget: Option<OverBudget>,
}

impl Engine {
    /// Apply `operation` to a budget.
    ///
    /// The stored status and the caller's role must match a row of
    /// [`lifecycle::RULES`]. The status write, ledger booking and catalog
    /// replication commit together or not at all.
    pub async fn transition(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        operation: Operation,
        args: TransitionArgs,
    ) -> ResultEngine<TransitionOutcome> {
        with_tx!(self, |db_tx| {
            self.apply_transition(&db_tx, ctx, budget_id, operation, args)
                .await
        })
    }

    async fn apply_transition(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &Context,
        budget_id: Uuid,
        operation: Operation,
        args: TransitionArgs,
    ) -> ResultEngine<TransitionOutcome> {
        let mut budget = self.require_budget(db_tx, ctx, budget_id).await?;
        let from = budget.status;
        let rule = lifecycle::transition(from, operation, ctx.role)
            .ok_or_else(|| invalid_transition(&budget, operation))?;

        if operation == Operation::Submit && budget.items.is_empty() {
            return Err(EngineError::Validation(
                "cannot submit a budget without items".to_string(),
            ));
        }

        budget.status = rule.to;
        budget.updated_by = ctx.actor_id.clone();
        let mut message = None;
        for effect in rule.effects {
            match effect {
                Effect::StampSubmitted => stamp(&mut budget.submitted_at, ctx.now),
                Effect::StampApproved => stamp(&mut budget.approved_at, ctx.now),
                Effect::StampReleased => stamp(&mut budget.released_at, ctx.now),
                Effect::StampCompleted => stamp(&mut budget.completed_at, ctx.now),
                Effect::RecordRejection => {
                    let reason = required(args.reason.as_deref(), "rejection reason")?;
                    budget.note = Some(BudgetNote::Rejection { reason });
                }
                Effect::RecordChangeRequest => {
                    let feedback = required(args.feedback.as_deref(), "change request feedback")?;
                    budget.note = Some(BudgetNote::ChangeRequest { feedback });
                }
                Effect::AppendMessage => {
                    if let Some(BudgetNote::ChangeRequest { feedback }) = &budget.note {
                        message = Some(BudgetMessage::new(
                            budget.id,
                            ctx.actor_id.clone(),
                            ctx.actor_name.clone(),
                            ctx.role,
                            feedback.clone(),
                            ctx.now,
                        ));
                    }
                }
                Effect::SchedulePublication => {
                    budget.scheduled_publish_at = args.scheduled_publish_at;
                }
                Effect::BookExpense | Effect::Replicate => {}
            }
        }

        let mut budget = self.write_budget(db_tx, &budget, from).await?;

        let mut outcome = TransitionOutcome {
            budget: budget.clone(),
            ledger_entry: None,
            replication: None,
            over_budget: None,
        };
        for effect in rule.effects {
            match effect {
                Effect::BookExpense => {
                    let (entry, over) = self.book_approval(db_tx, ctx, &budget).await?;
                    outcome.ledger_entry = entry;
                    outcome.over_budget = over;
                }
                Effect::Replicate => {
                    outcome.replication = Some(self.replicate_items(db_tx, ctx, &mut budget).await?);
                    outcome.budget.items = budget.items.clone();
                }
                _ => {}
            }
        }
        if let Some(message) = message {
            budget_messages::ActiveModel::from(&message)
                .insert(db_tx)
                .await?;
        }

        info!(
            budget_id = %budget.id,
            %operation,
            from = %from,
            to = %budget.status,
            actor = %ctx.actor_id,
            "budget transition committed"
        );
        Ok(outcome)
    }

    /// Book the approved total as an expense on the budget's cost center.
    async fn book_approval(
        &self,
        db_tx: &DatabaseTransaction,
        ctx: &Context,
        budget: &Budget,
    ) -> ResultEngine<(Option<CostCenterTransaction>, Option<OverBudget>)> {
        let Some(cost_center_id) = budget.cost_center_id else {
            return Ok((None, None));
        };
        if budget.total_cash == 0 {
            return Ok((None, None));
        }
        let cost_center = self.require_cost_center(db_tx, ctx, cost_center_id).await?;
        let over = OverBudget::check(
            cost_center_id,
            budget.total_cash,
            cost_center.available_budget,
        );
        if let Some(over) = &over {
            warn!(
                budget_id = %budget.id,
                %cost_center_id,
                total_cash = over.total_cash,
                available = over.available,
                "budget approved over the cost center's available balance"
            );
        }
        let entry = CostCenterTransaction::new(
            cost_center_id,
            TransactionKind::Expense,
            None,
            budget.total_cash,
            format!("Budget approved: {}", budget.title),
            ctx.actor_id.clone(),
            ctx.actor_name.clone(),
            Some(BudgetRef {
                id: budget.id,
                title: budget.title.clone(),
            }),
            ctx.now,
        )?;
        let entry = self.book_entry(db_tx, entry).await?;
        Ok((Some(entry), over))
    }

    pub async fn submit(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::Submit, TransitionArgs::new())
            .await
    }

    pub async fn mark_reviewed(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::MarkReviewed, TransitionArgs::new())
            .await
    }

    pub async fn send_final_values(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::SendFinalValues, TransitionArgs::new())
            .await
    }

    /// Ask the manager for changes; the feedback is also posted as a message.
    pub async fn request_changes(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        feedback: &str,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(
            ctx,
            budget_id,
            Operation::RequestChanges,
            TransitionArgs::new().feedback(feedback),
        )
        .await
    }

    pub async fn reject(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        reason: &str,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(
            ctx,
            budget_id,
            Operation::Reject,
            TransitionArgs::new().reason(reason),
        )
        .await
    }

    pub async fn approve_values(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::ApproveValues, TransitionArgs::new())
            .await
    }

    pub async fn withdraw(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::Withdraw, TransitionArgs::new())
            .await
    }

    /// Legacy fast path: `approved -> released`, replicating every item.
    pub async fn release(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::Release, TransitionArgs::new())
            .await
    }

    pub async fn mark_awaiting_payment(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(
            ctx,
            budget_id,
            Operation::MarkAwaitingPayment,
            TransitionArgs::new(),
        )
        .await
    }

    pub async fn confirm_payment(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::ConfirmPayment, TransitionArgs::new())
            .await
    }

    pub async fn release_to_production(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(
            ctx,
            budget_id,
            Operation::ReleaseToProduction,
            TransitionArgs::new(),
        )
        .await
    }

    pub async fn replicate_to_stock(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::ReplicateToStock, TransitionArgs::new())
            .await
    }

    pub async fn mark_available(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::MarkAvailable, TransitionArgs::new())
            .await
    }

    pub async fn publish(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        scheduled_publish_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<TransitionOutcome> {
        let mut args = TransitionArgs::new();
        args.scheduled_publish_at = scheduled_publish_at;
        self.transition(ctx, budget_id, Operation::Publish, args)
            .await
    }

    /// Replicate the items a previous run left behind. Allowed while the
    /// budget is `released` or `in_stock`; the status does not change.
    pub async fn retry_replication(
        &self,
        ctx: &Context,
        budget_id: Uuid,
    ) -> ResultEngine<TransitionOutcome> {
        self.transition(ctx, budget_id, Operation::RetryReplication, TransitionArgs::new())
            .await
    }
}

/// Lifecycle timestamps are written once and never moved.
fn stamp(slot: &mut Option<DateTime<Utc>>, now: DateTime<Utc>) {
    if slot.is_none() {
        *slot = Some(now);
    }
}

fn required(value: Option<&str>, label: &str) -> ResultEngine<String> {
    normalize_optional(value)
        .ok_or_else(|| EngineError::Validation(format!("{label} must not be empty")))
}
