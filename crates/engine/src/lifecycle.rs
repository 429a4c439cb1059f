//! Budget lifecycle transition table.
//!
//! Every status change is one row of [`RULES`]: `(from, operation, actor) ->
//! (to, effects)`. Anything not in the table is illegal. Effects are applied
//! by the engine inside the same DB transaction as the status write.

use serde::{Deserialize, Serialize};

use crate::{ActorRole, BudgetStatus, EngineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Submit,
    MarkReviewed,
    SendFinalValues,
    RequestChanges,
    Reject,
    ApproveValues,
    Withdraw,
    Release,
    MarkAwaitingPayment,
    ConfirmPayment,
    ReleaseToProduction,
    ReplicateToStock,
    MarkAvailable,
    Publish,
    RetryReplication,
    AddItem,
    EditItem,
    DeleteItem,
    PostMessage,
    DeleteBudget,
}

impl Operation {
    pub const ALL: [Self; 20] = [
        Self::Submit,
        Self::MarkReviewed,
        Self::SendFinalValues,
        Self::RequestChanges,
        Self::Reject,
        Self::ApproveValues,
        Self::Withdraw,
        Self::Release,
        Self::MarkAwaitingPayment,
        Self::ConfirmPayment,
        Self::ReleaseToProduction,
        Self::ReplicateToStock,
        Self::MarkAvailable,
        Self::Publish,
        Self::RetryReplication,
        Self::AddItem,
        Self::EditItem,
        Self::DeleteItem,
        Self::PostMessage,
        Self::DeleteBudget,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::MarkReviewed => "mark_reviewed",
            Self::SendFinalValues => "send_final_values",
            Self::RequestChanges => "request_changes",
            Self::Reject => "reject",
            Self::ApproveValues => "approve_values",
            Self::Withdraw => "withdraw",
            Self::Release => "release",
            Self::MarkAwaitingPayment => "mark_awaiting_payment",
            Self::ConfirmPayment => "confirm_payment",
            Self::ReleaseToProduction => "release_to_production",
            Self::ReplicateToStock => "replicate_to_stock",
            Self::MarkAvailable => "mark_available",
            Self::Publish => "publish",
            Self::RetryReplication => "retry_replication",
            Self::AddItem => "add_item",
            Self::EditItem => "edit_item",
            Self::DeleteItem => "delete_item",
            Self::PostMessage => "post_message",
            Self::DeleteBudget => "delete_budget",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Operation {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("unknown operation: {value}")))
    }
}

/// Side effects attached to a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    StampSubmitted,
    StampApproved,
    StampReleased,
    StampCompleted,
    /// Book an `expense` for `total_cash` against the budget's cost center.
    BookExpense,
    /// Run the catalog replicator over the not-yet-replicated items.
    Replicate,
    RecordRejection,
    RecordChangeRequest,
    AppendMessage,
    SchedulePublication,
}

#[derive(Debug)]
pub struct Rule {
    pub from: BudgetStatus,
    pub operation: Operation,
    pub actor: ActorRole,
    pub to: BudgetStatus,
    pub effects: &'static [Effect],
}

const fn rule(
    from: BudgetStatus,
    operation: Operation,
    actor: ActorRole,
    to: BudgetStatus,
    effects: &'static [Effect],
) -> Rule {
    Rule {
        from,
        operation,
        actor,
        to,
        effects,
    }
}

use ActorRole::{Manager, SuperAdmin};
use BudgetStatus as S;
use Operation as Op;

pub const RULES: &[Rule] = &[
    rule(S::Draft, Op::Submit, Manager, S::Submitted, &[Effect::StampSubmitted]),
    rule(S::Submitted, Op::MarkReviewed, SuperAdmin, S::Reviewed, &[]),
    rule(S::Submitted, Op::SendFinalValues, SuperAdmin, S::AwaitingApproval, &[]),
    rule(S::Reviewed, Op::SendFinalValues, SuperAdmin, S::AwaitingApproval, &[]),
    rule(
        S::Submitted,
        Op::RequestChanges,
        SuperAdmin,
        S::Submitted,
        &[Effect::RecordChangeRequest, Effect::AppendMessage],
    ),
    rule(
        S::Reviewed,
        Op::RequestChanges,
        SuperAdmin,
        S::Reviewed,
        &[Effect::RecordChangeRequest, Effect::AppendMessage],
    ),
    rule(S::Submitted, Op::Reject, SuperAdmin, S::Rejected, &[Effect::RecordRejection]),
    rule(S::Reviewed, Op::Reject, SuperAdmin, S::Rejected, &[Effect::RecordRejection]),
    rule(
        S::AwaitingApproval,
        Op::Reject,
        SuperAdmin,
        S::Rejected,
        &[Effect::RecordRejection],
    ),
    rule(
        S::AwaitingApproval,
        Op::ApproveValues,
        Manager,
        S::Approved,
        &[Effect::StampApproved, Effect::BookExpense],
    ),
    rule(S::Submitted, Op::Withdraw, Manager, S::Draft, &[]),
    rule(
        S::Approved,
        Op::Release,
        SuperAdmin,
        S::Released,
        &[Effect::StampReleased, Effect::Replicate],
    ),
    rule(S::Approved, Op::MarkAwaitingPayment, SuperAdmin, S::AwaitingPayment, &[]),
    rule(S::AwaitingPayment, Op::ConfirmPayment, SuperAdmin, S::PaymentConfirmed, &[]),
    rule(S::PaymentConfirmed, Op::ReleaseToProduction, SuperAdmin, S::InProduction, &[]),
    rule(S::InProduction, Op::ReplicateToStock, SuperAdmin, S::InStock, &[Effect::Replicate]),
    rule(S::InStock, Op::MarkAvailable, SuperAdmin, S::Available, &[]),
    rule(
        S::Available,
        Op::Publish,
        SuperAdmin,
        S::Published,
        &[Effect::SchedulePublication, Effect::StampCompleted],
    ),
    rule(S::Released, Op::RetryReplication, SuperAdmin, S::Released, &[Effect::Replicate]),
    rule(S::InStock, Op::RetryReplication, SuperAdmin, S::InStock, &[Effect::Replicate]),
];

/// Look up the rule for `operation` by `actor` on a budget in `from`.
pub fn transition(from: BudgetStatus, operation: Operation, actor: ActorRole) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.from == from && rule.operation == operation && rule.actor == actor)
}

/// Statuses reachable from `from` through any rule.
pub fn next_statuses(from: BudgetStatus) -> Vec<BudgetStatus> {
    let mut out: Vec<BudgetStatus> = Vec::new();
    for rule in RULES.iter().filter(|rule| rule.from == from) {
        if !out.contains(&rule.to) {
            out.push(rule.to);
        }
    }
    out
}

/// Item mutations that do not move the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemAction {
    Add,
    Edit,
    Delete,
}

impl ItemAction {
    pub fn operation(self) -> Operation {
        match self {
            Self::Add => Operation::AddItem,
            Self::Edit => Operation::EditItem,
            Self::Delete => Operation::DeleteItem,
        }
    }
}

pub fn item_action_allowed(action: ItemAction, actor: ActorRole, status: BudgetStatus) -> bool {
    match (actor, action) {
        (Manager, ItemAction::Add | ItemAction::Edit) => status == S::Draft,
        (Manager, ItemAction::Delete) => matches!(status, S::Draft | S::Submitted),
        (SuperAdmin, _) => matches!(status, S::Submitted | S::Reviewed),
    }
}

/// Messages are exchanged while the budget is under negotiation.
pub fn can_post_message(status: BudgetStatus) -> bool {
    matches!(status, S::Submitted | S::Reviewed | S::AwaitingApproval)
}

pub fn can_delete_budget(actor: ActorRole, status: BudgetStatus) -> bool {
    match actor {
        Manager => status == S::Draft,
        SuperAdmin => true,
    }
}
