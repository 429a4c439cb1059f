use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    ActorRole, BudgetMessage, Context, Operation, ResultEngine, budget_messages,
    lifecycle::can_post_message, util::normalize_required,
};

use super::{Engine, budgets::invalid_transition, with_tx};

impl Engine {
    /// Post a message on a budget under negotiation. Messages are never
    /// edited or deleted.
    pub async fn post_message(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        text: &str,
    ) -> ResultEngine<BudgetMessage> {
        let text = normalize_required(text, "message")?;
        with_tx!(self, |db_tx| {
            let budget = self.require_budget(&db_tx, ctx, budget_id).await?;
            if !can_post_message(budget.status) {
                return Err(invalid_transition(&budget, Operation::PostMessage));
            }
            let message = BudgetMessage::new(
                budget.id,
                ctx.actor_id.clone(),
                ctx.actor_name.clone(),
                ctx.role,
                text,
                ctx.now,
            );
            budget_messages::ActiveModel::from(&message)
                .insert(&db_tx)
                .await?;
            Ok(message)
        })
    }

    /// Messages of a budget, oldest first.
    pub async fn messages(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<Vec<BudgetMessage>> {
        self.require_budget(&self.database, ctx, budget_id).await?;
        budget_messages::Entity::find()
            .filter(budget_messages::Column::BudgetId.eq(budget_id.to_string()))
            .order_by_asc(budget_messages::Column::CreatedAt)
            .order_by_asc(budget_messages::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(BudgetMessage::try_from)
            .collect()
    }

    /// Mark every message written by the other side as read for the
    /// caller's role. Returns how many messages flipped.
    pub async fn mark_read(&self, ctx: &Context, budget_id: Uuid) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            self.require_budget(&db_tx, ctx, budget_id).await?;
            let res = budget_messages::Entity::update_many()
                .col_expr(budget_messages::Column::IsRead, Expr::value(true))
                .filter(budget_messages::Column::BudgetId.eq(budget_id.to_string()))
                .filter(budget_messages::Column::SenderRole.ne(ctx.role.as_str()))
                .filter(budget_messages::Column::IsRead.eq(false))
                .exec(&db_tx)
                .await?;
            Ok(res.rows_affected)
        })
    }

    /// Messages unread for `role`: not yet read and written by the other side.
    pub async fn unread_count(
        &self,
        ctx: &Context,
        budget_id: Uuid,
        role: ActorRole,
    ) -> ResultEngine<u64> {
        self.require_budget(&self.database, ctx, budget_id).await?;
        budget_messages::Entity::find()
            .filter(budget_messages::Column::BudgetId.eq(budget_id.to_string()))
            .filter(budget_messages::Column::SenderRole.ne(role.as_str()))
            .filter(budget_messages::Column::IsRead.eq(false))
            .count(&self.database)
            .await
            .map_err(Into::into)
    }
}
