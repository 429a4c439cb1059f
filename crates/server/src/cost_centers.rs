//! Cost centers and their ledger.
//!
//! Writes are reserved to the operations team; managers get 403.

use api_types::cost_center::{AdjustmentNew, AllocationNew, CostCenterNew, RefundNew};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{
    AdjustmentCmd, AdjustmentKind, Balances, Context, CostCenter, CostCenterTransaction,
    LedgerEntryCmd, NewCostCenterCmd,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn list(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CostCenter>>, ServerError> {
    Ok(Json(state.engine.list_cost_centers(&ctx).await?))
}

pub async fn create(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Json(payload): Json<CostCenterNew>,
) -> Result<(StatusCode, Json<CostCenter>), ServerError> {
    let mut cmd = NewCostCenterCmd::new(payload.company_id, payload.name, payload.code);
    if let Some(amount) = payload.opening_allocation {
        cmd = cmd.opening_allocation(amount);
    }
    let cost_center = state.engine.create_cost_center(&ctx, cmd).await?;
    Ok((StatusCode::CREATED, Json(cost_center)))
}

pub async fn get(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(cost_center_id): Path<Uuid>,
) -> Result<Json<CostCenter>, ServerError> {
    Ok(Json(state.engine.cost_center(&ctx, cost_center_id).await?))
}

pub async fn transactions(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(cost_center_id): Path<Uuid>,
) -> Result<Json<Vec<CostCenterTransaction>>, ServerError> {
    Ok(Json(
        state.engine.list_transactions(&ctx, cost_center_id).await?,
    ))
}

pub async fn allocation(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(cost_center_id): Path<Uuid>,
    Json(payload): Json<AllocationNew>,
) -> Result<(StatusCode, Json<CostCenterTransaction>), ServerError> {
    let entry = state
        .engine
        .record_allocation(
            &ctx,
            cost_center_id,
            payload.amount_minor,
            payload.description.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn refund(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(cost_center_id): Path<Uuid>,
    Json(payload): Json<RefundNew>,
) -> Result<(StatusCode, Json<CostCenterTransaction>), ServerError> {
    let mut cmd = LedgerEntryCmd::new(cost_center_id, payload.amount_minor);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    match (payload.budget_id, payload.budget_title) {
        (Some(budget_id), title) => {
            cmd = cmd.budget(budget_id, title.unwrap_or_default());
        }
        (None, Some(_)) => {
            return Err(ServerError::Generic(
                "budget_title requires budget_id".to_string(),
            ));
        }
        (None, None) => {}
    }

    let entry = state.engine.record_refund(&ctx, cmd).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn adjustment(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(cost_center_id): Path<Uuid>,
    Json(payload): Json<AdjustmentNew>,
) -> Result<(StatusCode, Json<CostCenterTransaction>), ServerError> {
    let kind = AdjustmentKind::try_from(payload.kind.as_str())?;
    let cmd = AdjustmentCmd::new(
        cost_center_id,
        kind,
        payload.amount_minor,
        payload.description,
    );
    let entry = state.engine.record_adjustment(&ctx, cmd).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Rebuild the stored balances from the transaction log.
pub async fn recompute(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(cost_center_id): Path<Uuid>,
) -> Result<Json<Balances>, ServerError> {
    Ok(Json(
        state.engine.recompute_balances(&ctx, cost_center_id).await?,
    ))
}
