//! The module contains `Budget`, its status/type enums and the `budgets`
//! entity.
//!
//! A budget owns its items and messages. `total_cash` / `total_points` are
//! derived from the items and recomputed on every item change.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BudgetItem, EngineError, ResultEngine, util::parse_uuid};

/// The 13 lifecycle states of a budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Draft,
    Submitted,
    Reviewed,
    AwaitingApproval,
    Approved,
    AwaitingPayment,
    PaymentConfirmed,
    /// Legacy fast path out of `Approved`, skipping the production pipeline.
    Released,
    InProduction,
    InStock,
    Available,
    Published,
    Rejected,
}

impl BudgetStatus {
    pub const ALL: [BudgetStatus; 13] = [
        Self::Draft,
        Self::Submitted,
        Self::Reviewed,
        Self::AwaitingApproval,
        Self::Approved,
        Self::AwaitingPayment,
        Self::PaymentConfirmed,
        Self::Released,
        Self::InProduction,
        Self::InStock,
        Self::Available,
        Self::Published,
        Self::Rejected,
    ];

    /// Statuses counted as pending requests against a cost center.
    pub const AWAITING_DECISION: [BudgetStatus; 3] =
        [Self::Submitted, Self::Reviewed, Self::AwaitingApproval];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Reviewed => "reviewed",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Approved => "approved",
            Self::AwaitingPayment => "awaiting_payment",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Released => "released",
            Self::InProduction => "in_production",
            Self::InStock => "in_stock",
            Self::Available => "available",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_awaiting_decision(self) -> bool {
        Self::AWAITING_DECISION.contains(&self)
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BudgetStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("invalid budget status: {value}")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    #[default]
    Standard,
    Restock,
}

impl BudgetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Restock => "restock",
        }
    }
}

impl TryFrom<&str> for BudgetType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "standard" => Ok(Self::Standard),
            "restock" => Ok(Self::Restock),
            other => Err(EngineError::Validation(format!("invalid budget type: {other}"))),
        }
    }
}

/// Data attached by the transition that produced it.
///
/// Stored as JSON in `budgets.meta`; only `reject` and `request changes`
/// write it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetNote {
    Rejection { reason: String },
    ChangeRequest { feedback: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub company_id: String,
    pub cost_center_id: Option<Uuid>,
    pub title: String,
    pub budget_type: BudgetType,
    pub status: BudgetStatus,
    pub items: Vec<BudgetItem>,
    /// Sum of item `subtotal_cash`, in minor units.
    pub total_cash: i64,
    pub total_points: i64,
    pub requested_by: String,
    pub requested_by_name: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    pub note: Option<BudgetNote>,
    /// Optimistic-concurrency counter, bumped on every write.
    pub version: i64,
}

impl Budget {
    pub fn new(
        company_id: String,
        cost_center_id: Option<Uuid>,
        title: String,
        budget_type: BudgetType,
        requested_by: String,
        requested_by_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            cost_center_id,
            title,
            budget_type,
            status: BudgetStatus::Draft,
            items: Vec::new(),
            total_cash: 0,
            total_points: 0,
            created_by: requested_by.clone(),
            updated_by: requested_by.clone(),
            requested_by,
            requested_by_name,
            created_at,
            submitted_at: None,
            approved_at: None,
            released_at: None,
            completed_at: None,
            scheduled_publish_at: None,
            note: None,
            version: 0,
        }
    }

    /// Recompute the derived totals from the current items.
    pub fn recompute_totals(&mut self) -> ResultEngine<()> {
        let overflow = || EngineError::InvalidAmount("budget total overflow".to_string());
        let mut total_cash: i64 = 0;
        let mut total_points: i64 = 0;
        for item in &self.items {
            total_cash = total_cash.checked_add(item.subtotal_cash).ok_or_else(overflow)?;
            total_points = total_points
                .checked_add(item.subtotal_points)
                .ok_or_else(overflow)?;
        }
        self.total_cash = total_cash;
        self.total_points = total_points;
        Ok(())
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.note {
            Some(BudgetNote::Rejection { reason }) => Some(reason),
            _ => None,
        }
    }

    pub fn change_request_feedback(&self) -> Option<&str> {
        match &self.note {
            Some(BudgetNote::ChangeRequest { feedback }) => Some(feedback),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub company_id: String,
    pub cost_center_id: Option<String>,
    pub title: String,
    pub budget_type: String,
    pub status: String,
    pub total_cash: i64,
    pub total_points: i64,
    pub requested_by: String,
    pub requested_by_name: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTimeUtc,
    pub submitted_at: Option<DateTimeUtc>,
    pub approved_at: Option<DateTimeUtc>,
    pub released_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub scheduled_publish_at: Option<DateTimeUtc>,
    pub meta: Option<String>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_items::Entity")]
    Items,
    #[sea_orm(has_many = "super::budget_messages::Entity")]
    Messages,
    #[sea_orm(
        belongs_to = "super::cost_centers::Entity",
        from = "Column::CostCenterId",
        to = "super::cost_centers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    CostCenters,
}

impl Related<super::budget_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::budget_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::cost_centers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostCenters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn encode_note(note: Option<&BudgetNote>) -> ResultEngine<Option<String>> {
    note.map(|note| {
        serde_json::to_string(note)
            .map_err(|err| EngineError::Validation(format!("invalid budget note: {err}")))
    })
    .transpose()
}

fn decode_note(raw: Option<&str>) -> ResultEngine<Option<BudgetNote>> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_str(s)
                .map_err(|err| EngineError::Validation(format!("invalid budget note: {err}")))
        })
        .transpose()
}

impl TryFrom<&Budget> for ActiveModel {
    type Error = EngineError;

    fn try_from(value: &Budget) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(value.id.to_string()),
            company_id: ActiveValue::Set(value.company_id.clone()),
            cost_center_id: ActiveValue::Set(value.cost_center_id.map(|id| id.to_string())),
            title: ActiveValue::Set(value.title.clone()),
            budget_type: ActiveValue::Set(value.budget_type.as_str().to_string()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            total_cash: ActiveValue::Set(value.total_cash),
            total_points: ActiveValue::Set(value.total_points),
            requested_by: ActiveValue::Set(value.requested_by.clone()),
            requested_by_name: ActiveValue::Set(value.requested_by_name.clone()),
            created_by: ActiveValue::Set(value.created_by.clone()),
            updated_by: ActiveValue::Set(value.updated_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
            submitted_at: ActiveValue::Set(value.submitted_at),
            approved_at: ActiveValue::Set(value.approved_at),
            released_at: ActiveValue::Set(value.released_at),
            completed_at: ActiveValue::Set(value.completed_at),
            scheduled_publish_at: ActiveValue::Set(value.scheduled_publish_at),
            meta: ActiveValue::Set(encode_note(value.note.as_ref())?),
            version: ActiveValue::Set(value.version),
        })
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            cost_center_id: model
                .cost_center_id
                .as_deref()
                .map(|id| parse_uuid(id, "cost center"))
                .transpose()?,
            budget_type: BudgetType::try_from(model.budget_type.as_str())?,
            status: BudgetStatus::try_from(model.status.as_str())?,
            note: decode_note(model.meta.as_deref())?,
            company_id: model.company_id,
            title: model.title,
            items: Vec::new(),
            total_cash: model.total_cash,
            total_points: model.total_points,
            requested_by: model.requested_by,
            requested_by_name: model.requested_by_name,
            created_by: model.created_by,
            updated_by: model.updated_by,
            created_at: model.created_at,
            submitted_at: model.submitted_at,
            approved_at: model.approved_at,
            released_at: model.released_at,
            completed_at: model.completed_at,
            scheduled_publish_at: model.scheduled_publish_at,
            version: model.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> Budget {
        Budget::new(
            "acme".to_string(),
            None,
            "Welcome kits".to_string(),
            BudgetType::Standard,
            "u1".to_string(),
            "Ana".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn status_round_trips_through_its_storage_name() {
        for status in BudgetStatus::ALL {
            assert_eq!(BudgetStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(BudgetStatus::try_from("cancelled").is_err());
    }

    #[test]
    fn totals_follow_items() {
        let mut budget = budget();
        let id = budget.id;
        budget.items.push(BudgetItem::new(id, 0, "mug".to_string(), 3, 1500, 10).unwrap());
        budget.items.push(BudgetItem::new(id, 1, "cap".to_string(), 2, 800, 5).unwrap());
        budget.recompute_totals().unwrap();
        assert_eq!(budget.total_cash, 3 * 1500 + 2 * 800);
        assert_eq!(budget.total_points, 3 * 10 + 2 * 5);

        budget.items.remove(0);
        budget.recompute_totals().unwrap();
        assert_eq!(budget.total_cash, 1600);
    }

    #[test]
    fn total_overflow_is_an_invalid_amount() {
        let mut budget = budget();
        let id = budget.id;
        let half = i64::MAX / 2 + 1;
        budget.items.push(BudgetItem::new(id, 0, "mug".to_string(), 1, half, 0).unwrap());
        budget.items.push(BudgetItem::new(id, 1, "cap".to_string(), 1, half, 0).unwrap());
        budget.total_cash = 42;

        let err = budget.recompute_totals().unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(budget.total_cash, 42);
    }

    #[test]
    fn note_is_stored_as_tagged_json() {
        let note = BudgetNote::Rejection {
            reason: "out of season".to_string(),
        };
        let raw = encode_note(Some(&note)).unwrap().unwrap();
        assert_eq!(raw, r#"{"kind":"rejection","reason":"out of season"}"#);
        assert_eq!(decode_note(Some(&raw)).unwrap(), Some(note));
    }

    #[test]
    fn note_accessors_match_variant() {
        let mut budget = budget();
        budget.note = Some(BudgetNote::ChangeRequest {
            feedback: "cheaper mugs".to_string(),
        });
        assert_eq!(budget.change_request_feedback(), Some("cheaper mugs"));
        assert_eq!(budget.rejection_reason(), None);
    }
}
