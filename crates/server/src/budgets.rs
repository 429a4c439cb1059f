//! Budget endpoints: CRUD, items and lifecycle transitions.

use api_types::budget::{BudgetList, BudgetNew, ItemNew, ItemPatch, TransitionRequest};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{
    Budget, BudgetFilter, BudgetStatus, BudgetType, Context, CostCenterTransaction, ItemUpdate,
    NewBudgetCmd, NewItemCmd, Operation, OverBudget, TransitionArgs, TransitionOutcome,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn item_cmd(item: ItemNew) -> NewItemCmd {
    let cmd = NewItemCmd::new(item.base_product_id, item.qty, item.unit_price);
    match item.unit_points {
        Some(points) => cmd.unit_points(points),
        None => cmd,
    }
}

pub async fn list(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetList>,
) -> Result<Json<Vec<Budget>>, ServerError> {
    let mut filter = BudgetFilter::default();
    if let Some(status) = query.status.as_deref() {
        filter = filter.status(BudgetStatus::try_from(status)?);
    }
    if let Some(cost_center_id) = query.cost_center_id {
        filter = filter.cost_center_id(cost_center_id);
    }
    if let Some(company_id) = query.company_id {
        filter = filter.company_id(company_id);
    }

    let budgets = state.engine.list_budgets(&ctx, filter).await?;
    Ok(Json(budgets))
}

pub async fn create(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<Budget>), ServerError> {
    let mut cmd = NewBudgetCmd::new(payload.title);
    if let Some(budget_type) = payload.budget_type {
        cmd = cmd.budget_type(BudgetType::try_from(budget_type.as_str())?);
    }
    if let Some(cost_center_id) = payload.cost_center_id {
        cmd = cmd.cost_center_id(cost_center_id);
    }
    for item in payload.items {
        cmd = cmd.item(item_cmd(item));
    }

    let budget = state.engine.create_budget(&ctx, cmd).await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn get(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<Budget>, ServerError> {
    Ok(Json(state.engine.budget(&ctx, budget_id).await?))
}

/// Opening a budget as operations team marks a submitted budget reviewed.
pub async fn open(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<Budget>, ServerError> {
    Ok(Json(state.engine.open_budget(&ctx, budget_id).await?))
}

/// Returns the refunds booked for the deleted budget, if any.
pub async fn delete(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<Vec<CostCenterTransaction>>, ServerError> {
    Ok(Json(state.engine.delete_budget(&ctx, budget_id).await?))
}

pub async fn add_item(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<ItemNew>,
) -> Result<Json<Budget>, ServerError> {
    let budget = state
        .engine
        .add_item(&ctx, budget_id, item_cmd(payload))
        .await?;
    Ok(Json(budget))
}

pub async fn update_item(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path((budget_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ItemPatch>,
) -> Result<Json<Budget>, ServerError> {
    let update = ItemUpdate {
        qty: payload.qty,
        unit_price: payload.unit_price,
        unit_points: payload.unit_points,
    };
    let budget = state
        .engine
        .update_item(&ctx, budget_id, item_id, update)
        .await?;
    Ok(Json(budget))
}

pub async fn delete_item(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path((budget_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Budget>, ServerError> {
    let budget = state.engine.delete_item(&ctx, budget_id, item_id).await?;
    Ok(Json(budget))
}

pub async fn transition(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<TransitionOutcome>, ServerError> {
    let operation = Operation::try_from(payload.operation.trim())?;
    let mut args = TransitionArgs::new();
    if let Some(reason) = payload.reason {
        args = args.reason(reason);
    }
    if let Some(feedback) = payload.feedback {
        args = args.feedback(feedback);
    }
    if let Some(at) = payload.scheduled_date {
        args = args.scheduled_publish_at(at.with_timezone(&Utc));
    }

    let outcome = state
        .engine
        .transition(&ctx, budget_id, operation, args)
        .await?;
    Ok(Json(outcome))
}

pub async fn retry_replication(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<TransitionOutcome>, ServerError> {
    Ok(Json(state.engine.retry_replication(&ctx, budget_id).await?))
}

pub async fn over_budget(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<Option<OverBudget>>, ServerError> {
    Ok(Json(state.engine.over_budget(&ctx, budget_id).await?))
}
