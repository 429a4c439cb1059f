//! Budget line items.
//!
//! `subtotal_cash == qty * unit_price` is kept by construction: the fields are
//! only changed through [`BudgetItem::update`], which recomputes subtotals.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub position: i32,
    /// Template product in the external catalog.
    pub base_product_id: String,
    pub qty: i64,
    /// Cash price per unit, in minor units.
    pub unit_price: i64,
    /// Loyalty points per unit.
    pub unit_points: i64,
    pub subtotal_cash: i64,
    pub subtotal_points: i64,
    /// Company product created from this item, once replicated.
    pub replicated_product_id: Option<Uuid>,
}

impl BudgetItem {
    pub fn new(
        budget_id: Uuid,
        position: i32,
        base_product_id: String,
        qty: i64,
        unit_price: i64,
        unit_points: i64,
    ) -> ResultEngine<Self> {
        let mut item = Self {
            id: Uuid::new_v4(),
            budget_id,
            position,
            base_product_id,
            qty: 0,
            unit_price: 0,
            unit_points: 0,
            subtotal_cash: 0,
            subtotal_points: 0,
            replicated_product_id: None,
        };
        item.update(Some(qty), Some(unit_price), Some(unit_points))?;
        Ok(item)
    }

    /// Change quantity and/or pricing, recomputing subtotals.
    pub fn update(
        &mut self,
        qty: Option<i64>,
        unit_price: Option<i64>,
        unit_points: Option<i64>,
    ) -> ResultEngine<()> {
        let qty = qty.unwrap_or(self.qty);
        let unit_price = unit_price.unwrap_or(self.unit_price);
        let unit_points = unit_points.unwrap_or(self.unit_points);

        if qty < 1 {
            return Err(EngineError::Validation("qty must be >= 1".to_string()));
        }
        if unit_price < 0 {
            return Err(EngineError::InvalidAmount(
                "unit_price must be >= 0".to_string(),
            ));
        }
        if unit_points < 0 {
            return Err(EngineError::InvalidAmount(
                "unit_points must be >= 0".to_string(),
            ));
        }
        let subtotal_cash = qty
            .checked_mul(unit_price)
            .ok_or_else(|| EngineError::InvalidAmount("subtotal overflow".to_string()))?;
        let subtotal_points = qty
            .checked_mul(unit_points)
            .ok_or_else(|| EngineError::InvalidAmount("subtotal overflow".to_string()))?;

        self.qty = qty;
        self.unit_price = unit_price;
        self.unit_points = unit_points;
        self.subtotal_cash = subtotal_cash;
        self.subtotal_points = subtotal_points;
        Ok(())
    }

    pub fn is_replicated(&self) -> bool {
        self.replicated_product_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub budget_id: String,
    pub position: i32,
    pub base_product_id: String,
    pub qty: i64,
    pub unit_price: i64,
    pub unit_points: i64,
    pub subtotal_cash: i64,
    pub subtotal_points: i64,
    pub replicated_product_id: Option<String>,
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

impl From<&BudgetItem> for ActiveModel {
    fn from(value: &BudgetItem) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            budget_id: ActiveValue::Set(value.budget_id.to_string()),
            position: ActiveValue::Set(value.position),
            base_product_id: ActiveValue::Set(value.base_product_id.clone()),
            qty: ActiveValue::Set(value.qty),
            unit_price: ActiveValue::Set(value.unit_price),
            unit_points: ActiveValue::Set(value.unit_points),
            subtotal_cash: ActiveValue::Set(value.subtotal_cash),
            subtotal_points: ActiveValue::Set(value.subtotal_points),
            replicated_product_id: ActiveValue::Set(
                value.replicated_product_id.map(|id| id.to_string()),
            ),
        }
    }
}

impl TryFrom<Model> for BudgetItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "budget item")?,
            budget_id: parse_uuid(&model.budget_id, "budget")?,
            replicated_product_id: model
                .replicated_product_id
                .as_deref()
                .map(|id| parse_uuid(id, "company product"))
                .transpose()?,
            position: model.position,
            base_product_id: model.base_product_id,
            qty: model.qty,
            unit_price: model.unit_price,
            unit_points: model.unit_points,
            subtotal_cash: model.subtotal_cash,
            subtotal_points: model.subtotal_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> BudgetItem {
        BudgetItem::new(Uuid::new_v4(), 0, "mug".to_string(), 4, 1250, 3).unwrap()
    }

    #[test]
    fn subtotal_is_qty_times_price() {
        let item = item();
        assert_eq!(item.subtotal_cash, 5000);
        assert_eq!(item.subtotal_points, 12);
    }

    #[test]
    fn update_recomputes_subtotals() {
        let mut item = item();
        item.update(Some(10), None, None).unwrap();
        assert_eq!(item.subtotal_cash, 12_500);
        item.update(None, Some(1000), Some(0)).unwrap();
        assert_eq!(item.subtotal_cash, 10_000);
        assert_eq!(item.subtotal_points, 0);
    }

    #[test]
    fn failed_update_leaves_item_untouched() {
        let mut item = item();
        let before = item.clone();
        assert!(item.update(Some(0), Some(1), None).is_err());
        assert!(item.update(None, Some(-5), None).is_err());
        assert_eq!(item, before);
    }
}
