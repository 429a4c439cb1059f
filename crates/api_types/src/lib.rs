use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the caller as forwarded by the gateway.
///
/// - `manager`: requests budgets for their own company.
/// - `super_admin`: operations team, acts across companies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    SuperAdmin,
}

impl Role {
    /// Returns the canonical role string used by the engine/database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::SuperAdmin => "super_admin",
        }
    }
}

pub mod budget {
    use super::*;

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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ItemNew {
        pub base_product_id: String,
        pub qty: i64,
        /// Unit price in minor units.
        pub unit_price: i64,
        pub unit_points: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub title: String,
        pub budget_type: Option<BudgetType>,
        pub cost_center_id: Option<Uuid>,
        #[serde(default)]
        pub items: Vec<ItemNew>,
    }

    /// Partial item edit; absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ItemPatch {
        pub qty: Option<i64>,
        pub unit_price: Option<i64>,
        pub unit_points: Option<i64>,
    }

    /// Query string of `GET /budgets`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetList {
        pub status: Option<String>,
        pub cost_center_id: Option<Uuid>,
        pub company_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransitionRequest {
        /// Operation name, e.g. `submit` or `approve_values`.
        pub operation: String,
        /// Required by `reject`.
        pub reason: Option<String>,
        /// Required by `request_changes`.
        pub feedback: Option<String>,
        /// Publication date for `publish`. RFC3339, including timezone offset.
        pub scheduled_date: Option<DateTime<FixedOffset>>,
    }
}

pub mod message {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageNew {
        pub message: String,
    }

    /// Query string of `GET /budgets/{id}/messages/unread`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UnreadQuery {
        pub role: Role,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UnreadCount {
        pub unread: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MarkedRead {
        pub marked: u64,
    }
}

pub mod cost_center {
    use super::*;

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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CostCenterNew {
        pub company_id: String,
        pub name: String,
        pub code: String,
        /// Booked as the first allocation when > 0.
        pub opening_allocation: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationNew {
        /// Must be > 0.
        pub amount_minor: i64,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefundNew {
        /// Must be > 0.
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Budget the refund gives money back for, if any.
        pub budget_id: Option<Uuid>,
        pub budget_title: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdjustmentNew {
        pub kind: AdjustmentKind,
        pub amount_minor: i64,
        pub description: String,
    }
}
