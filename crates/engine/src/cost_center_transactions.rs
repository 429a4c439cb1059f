//! Ledger primitives.
//!
//! A `CostCenterTransaction` is an append-only entry that changes a cost
//! center's balances. The amount is always positive; the kind (and for
//! adjustments the `AdjustmentKind`) decides which balance moves and how.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Balances, EngineError, ResultEngine,
    util::{ensure_positive, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Allocation,
    Expense,
    Refund,
    Adjustment,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allocation => "allocation",
            Self::Expense => "expense",
            Self::Refund => "refund",
            Self::Adjustment => "adjustment",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "allocation" => Ok(Self::Allocation),
            "expense" => Ok(Self::Expense),
            "refund" => Ok(Self::Refund),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Which balance an adjustment moves, and in which direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    IncreaseAllocated,
    DecreaseAllocated,
    IncreaseUsed,
    DecreaseUsed,
}

impl AdjustmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IncreaseAllocated => "increase_allocated",
            Self::DecreaseAllocated => "decrease_allocated",
            Self::IncreaseUsed => "increase_used",
            Self::DecreaseUsed => "decrease_used",
        }
    }
}

impl TryFrom<&str> for AdjustmentKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "increase_allocated" => Ok(Self::IncreaseAllocated),
            "decrease_allocated" => Ok(Self::DecreaseAllocated),
            "increase_used" => Ok(Self::IncreaseUsed),
            "decrease_used" => Ok(Self::DecreaseUsed),
            other => Err(EngineError::Validation(format!(
                "invalid adjustment kind: {other}"
            ))),
        }
    }
}

/// Signed effect of one ledger entry: `(allocated_delta, used_delta)`.
pub(crate) fn balance_effect(
    kind: TransactionKind,
    adjustment: Option<AdjustmentKind>,
    amount_minor: i64,
) -> ResultEngine<(i64, i64)> {
    match (kind, adjustment) {
        (TransactionKind::Allocation, None) => Ok((amount_minor, 0)),
        (TransactionKind::Expense, None) => Ok((0, amount_minor)),
        (TransactionKind::Refund, None) => Ok((0, -amount_minor)),
        (TransactionKind::Adjustment, Some(adj)) => Ok(match adj {
            AdjustmentKind::IncreaseAllocated => (amount_minor, 0),
            AdjustmentKind::DecreaseAllocated => (-amount_minor, 0),
            AdjustmentKind::IncreaseUsed => (0, amount_minor),
            AdjustmentKind::DecreaseUsed => (0, -amount_minor),
        }),
        (TransactionKind::Adjustment, None) => Err(EngineError::Validation(
            "adjustment requires an adjustment kind".to_string(),
        )),
        (_, Some(_)) => Err(EngineError::Validation(
            "adjustment kind is only valid on adjustments".to_string(),
        )),
    }
}

/// Reference from a ledger entry to the budget that caused it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenterTransaction {
    pub id: Uuid,
    pub cost_center_id: Uuid,
    pub kind: TransactionKind,
    pub adjustment: Option<AdjustmentKind>,
    pub amount_minor: i64,
    pub description: String,
    pub user_id: String,
    pub user_name: String,
    pub budget: Option<BudgetRef>,
    pub created_at: DateTime<Utc>,
}

impl CostCenterTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cost_center_id: Uuid,
        kind: TransactionKind,
        adjustment: Option<AdjustmentKind>,
        amount_minor: i64,
        description: String,
        user_id: String,
        user_name: String,
        budget: Option<BudgetRef>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        ensure_positive(amount_minor, "amount_minor")?;
        balance_effect(kind, adjustment, amount_minor)?;
        Ok(Self {
            id: Uuid::new_v4(),
            cost_center_id,
            kind,
            adjustment,
            amount_minor,
            description,
            user_id,
            user_name,
            budget,
            created_at,
        })
    }

    pub fn effect(&self) -> ResultEngine<(i64, i64)> {
        balance_effect(self.kind, self.adjustment, self.amount_minor)
    }
}

/// Reduce a transaction log to balances, starting from zero.
pub fn replay<'a>(
    transactions: impl IntoIterator<Item = &'a CostCenterTransaction>,
) -> ResultEngine<Balances> {
    let mut balances = Balances::default();
    for tx in transactions {
        let (allocated_delta, used_delta) = tx.effect()?;
        balances.apply(allocated_delta, used_delta)?;
    }
    Ok(balances)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_center_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub cost_center_id: String,
    pub kind: String,
    pub adjustment_kind: Option<String>,
    pub amount_minor: i64,
    pub description: String,
    pub user_id: String,
    pub user_name: String,
    pub budget_id: Option<String>,
    pub budget_title: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cost_centers::Entity",
        from = "Column::CostCenterId",
        to = "super::cost_centers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    CostCenters,
}

impl Related<super::cost_centers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostCenters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CostCenterTransaction> for ActiveModel {
    fn from(tx: &CostCenterTransaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            cost_center_id: ActiveValue::Set(tx.cost_center_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            adjustment_kind: ActiveValue::Set(tx.adjustment.map(|a| a.as_str().to_string())),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            description: ActiveValue::Set(tx.description.clone()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            user_name: ActiveValue::Set(tx.user_name.clone()),
            budget_id: ActiveValue::Set(tx.budget.as_ref().map(|b| b.id.to_string())),
            budget_title: ActiveValue::Set(tx.budget.as_ref().map(|b| b.title.clone())),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for CostCenterTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let budget = match model.budget_id.as_deref() {
            Some(id) => Some(BudgetRef {
                id: parse_uuid(id, "budget")?,
                title: model.budget_title.clone().unwrap_or_default(),
            }),
            None => None,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            cost_center_id: parse_uuid(&model.cost_center_id, "cost center")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            adjustment: model
                .adjustment_kind
                .as_deref()
                .map(AdjustmentKind::try_from)
                .transpose()?,
            amount_minor: model.amount_minor,
            description: model.description,
            user_id: model.user_id,
            user_name: model.user_name,
            budget,
            created_at: model.created_at,
        })
    }
}
