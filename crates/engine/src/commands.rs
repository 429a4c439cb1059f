//! Command structs for engine operations.
//!
//! These types group parameters for write operations (budget creation, item
//! edits, cost centers, ledger adjustments), keeping call sites readable and
//! avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AdjustmentKind, BudgetRef, BudgetStatus, BudgetType};

/// One line of a budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewItemCmd {
    pub base_product_id: String,
    pub qty: i64,
    pub unit_price: i64,
    pub unit_points: i64,
}

impl NewItemCmd {
    #[must_use]
    pub fn new(base_product_id: impl Into<String>, qty: i64, unit_price: i64) -> Self {
        Self {
            base_product_id: base_product_id.into(),
            qty,
            unit_price,
            unit_points: 0,
        }
    }

    #[must_use]
    pub fn unit_points(mut self, unit_points: i64) -> Self {
        self.unit_points = unit_points;
        self
    }
}

/// Create a draft budget.
#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub title: String,
    pub budget_type: BudgetType,
    pub cost_center_id: Option<Uuid>,
    pub items: Vec<NewItemCmd>,
}

impl NewBudgetCmd {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            budget_type: BudgetType::Standard,
            cost_center_id: None,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn budget_type(mut self, budget_type: BudgetType) -> Self {
        self.budget_type = budget_type;
        self
    }

    #[must_use]
    pub fn cost_center_id(mut self, cost_center_id: Uuid) -> Self {
        self.cost_center_id = Some(cost_center_id);
        self
    }

    #[must_use]
    pub fn item(mut self, item: NewItemCmd) -> Self {
        self.items.push(item);
        self
    }
}

/// Partial item update; `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub qty: Option<i64>,
    pub unit_price: Option<i64>,
    pub unit_points: Option<i64>,
}

impl ItemUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn qty(mut self, qty: i64) -> Self {
        self.qty = Some(qty);
        self
    }

    #[must_use]
    pub fn unit_price(mut self, unit_price: i64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    #[must_use]
    pub fn unit_points(mut self, unit_points: i64) -> Self {
        self.unit_points = Some(unit_points);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.qty.is_none() && self.unit_price.is_none() && self.unit_points.is_none()
    }
}

/// Create a cost center, optionally with an opening allocation.
#[derive(Clone, Debug)]
pub struct NewCostCenterCmd {
    pub company_id: String,
    pub name: String,
    pub code: String,
    pub opening_allocation: Option<i64>,
}

impl NewCostCenterCmd {
    #[must_use]
    pub fn new(
        company_id: impl Into<String>,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            name: name.into(),
            code: code.into(),
            opening_allocation: None,
        }
    }

    #[must_use]
    pub fn opening_allocation(mut self, amount_minor: i64) -> Self {
        self.opening_allocation = Some(amount_minor);
        self
    }
}

/// Book an expense or refund directly on the ledger.
#[derive(Clone, Debug)]
pub struct LedgerEntryCmd {
    pub cost_center_id: Uuid,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub budget: Option<BudgetRef>,
}

impl LedgerEntryCmd {
    #[must_use]
    pub fn new(cost_center_id: Uuid, amount_minor: i64) -> Self {
        Self {
            cost_center_id,
            amount_minor,
            description: None,
            budget: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn budget(mut self, id: Uuid, title: impl Into<String>) -> Self {
        self.budget = Some(BudgetRef {
            id,
            title: title.into(),
        });
        self
    }
}

/// Correct a cost center's balances. The description is mandatory.
#[derive(Clone, Debug)]
pub struct AdjustmentCmd {
    pub cost_center_id: Uuid,
    pub kind: AdjustmentKind,
    pub amount_minor: i64,
    pub description: String,
}

impl AdjustmentCmd {
    #[must_use]
    pub fn new(
        cost_center_id: Uuid,
        kind: AdjustmentKind,
        amount_minor: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            cost_center_id,
            kind,
            amount_minor,
            description: description.into(),
        }
    }
}

/// Filter for `list_budgets`. Managers are always restricted to their own
/// company; `company_id` only narrows a super-admin listing.
#[derive(Clone, Debug, Default)]
pub struct BudgetFilter {
    pub status: Option<BudgetStatus>,
    pub cost_center_id: Option<Uuid>,
    pub company_id: Option<String>,
}

impl BudgetFilter {
    #[must_use]
    pub fn status(mut self, status: BudgetStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn cost_center_id(mut self, cost_center_id: Uuid) -> Self {
        self.cost_center_id = Some(cost_center_id);
        self
    }

    #[must_use]
    pub fn company_id(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }
}

/// Inputs some transitions need: a reason to reject, feedback when asking for
/// changes, an optional publication date.
#[derive(Clone, Debug, Default)]
pub struct TransitionArgs {
    pub reason: Option<String>,
    pub feedback: Option<String>,
    pub scheduled_publish_at: Option<DateTime<Utc>>,
}

impl TransitionArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    #[must_use]
    pub fn scheduled_publish_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_publish_at = Some(at);
        self
    }
}
