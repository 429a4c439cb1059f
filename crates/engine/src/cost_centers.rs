//! The module contains `CostCenter` and its balances.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// A cost center.
///
/// A named spending bucket scoped to one company. Balances are denormalized
/// from the transaction log and always satisfy
/// `available_budget == allocated_budget - used_budget`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: Uuid,
    pub company_id: String,
    pub name: String,
    pub code: String,
    pub allocated_budget: i64,
    pub used_budget: i64,
    /// May go negative: over-budget approvals are allowed.
    pub available_budget: i64,
    /// Budgets against this center waiting for a decision. Counted on read.
    pub pending_requests: u64,
    pub created_at: DateTime<Utc>,
}

impl CostCenter {
    pub fn new(company_id: String, name: String, code: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name,
            code,
            allocated_budget: 0,
            used_budget: 0,
            available_budget: 0,
            pending_requests: 0,
            created_at,
        }
    }

    pub fn balances(&self) -> Balances {
        Balances {
            allocated: self.allocated_budget,
            used: self.used_budget,
            available: self.available_budget,
        }
    }
}

/// Snapshot of a cost center's balances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub allocated: i64,
    pub used: i64,
    pub available: i64,
}

impl Balances {
    /// Apply a delta to allocated/used, keeping `available` derived.
    pub fn apply(&mut self, allocated_delta: i64, used_delta: i64) -> ResultEngine<()> {
        let overflow = || EngineError::InvalidAmount("balance overflow".to_string());
        let allocated = self.allocated.checked_add(allocated_delta).ok_or_else(overflow)?;
        let used = self.used.checked_add(used_delta).ok_or_else(overflow)?;
        self.available = allocated.checked_sub(used).ok_or_else(overflow)?;
        self.allocated = allocated;
        self.used = used;
        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.available == self.allocated - self.used
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_centers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub code: String,
    pub allocated_budget: i64,
    pub used_budget: i64,
    pub available_budget: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cost_center_transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::cost_center_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CostCenter> for ActiveModel {
    fn from(value: &CostCenter) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            company_id: ActiveValue::Set(value.company_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            code: ActiveValue::Set(value.code.clone()),
            allocated_budget: ActiveValue::Set(value.allocated_budget),
            used_budget: ActiveValue::Set(value.used_budget),
            available_budget: ActiveValue::Set(value.available_budget),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for CostCenter {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "cost center")?,
            company_id: model.company_id,
            name: model.name,
            code: model.code,
            allocated_budget: model.allocated_budget,
            used_budget: model.used_budget,
            available_budget: model.available_budget,
            pending_requests: 0,
            created_at: model.created_at,
        })
    }
}
