//! Messages exchanged between the manager and the operations team on a
//! budget. Messages are immutable once posted; only `is_read` flips.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ActorRole, EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetMessage {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: ActorRole,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl BudgetMessage {
    pub fn new(
        budget_id: Uuid,
        sender_id: String,
        sender_name: String,
        sender_role: ActorRole,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget_id,
            sender_id,
            sender_name,
            sender_role,
            message,
            is_read: false,
            created_at,
        }
    }

    /// A message is unread for `role` while nobody of that role has read it
    /// and it was written by the other side.
    pub fn is_unread_for(&self, role: ActorRole) -> bool {
        !self.is_read && self.sender_role != role
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub budget_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Budgets,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BudgetMessage> for ActiveModel {
    fn from(value: &BudgetMessage) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            budget_id: ActiveValue::Set(value.budget_id.to_string()),
            sender_id: ActiveValue::Set(value.sender_id.clone()),
            sender_name: ActiveValue::Set(value.sender_name.clone()),
            sender_role: ActiveValue::Set(value.sender_role.as_str().to_string()),
            message: ActiveValue::Set(value.message.clone()),
            is_read: ActiveValue::Set(value.is_read),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for BudgetMessage {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "budget message")?,
            budget_id: parse_uuid(&model.budget_id, "budget")?,
            sender_role: ActorRole::try_from(model.sender_role.as_str())?,
            sender_id: model.sender_id,
            sender_name: model.sender_name,
            message: model.message,
            is_read: model.is_read,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_messages_are_never_unread() {
        let msg = BudgetMessage::new(
            Uuid::new_v4(),
            "u1".to_string(),
            "Ana".to_string(),
            ActorRole::Manager,
            "can we add mugs?".to_string(),
            Utc::now(),
        );
        assert!(!msg.is_unread_for(ActorRole::Manager));
        assert!(msg.is_unread_for(ActorRole::SuperAdmin));
    }
}
