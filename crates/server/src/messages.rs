//! Negotiation thread of a budget.

use api_types::message::{MarkedRead, MessageNew, UnreadCount, UnreadQuery};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{ActorRole, BudgetMessage, Context};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn list(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<Vec<BudgetMessage>>, ServerError> {
    Ok(Json(state.engine.messages(&ctx, budget_id).await?))
}

pub async fn post(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<MessageNew>,
) -> Result<(StatusCode, Json<BudgetMessage>), ServerError> {
    let message = state
        .engine
        .post_message(&ctx, budget_id, &payload.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<MarkedRead>, ServerError> {
    let marked = state.engine.mark_read(&ctx, budget_id).await?;
    Ok(Json(MarkedRead { marked }))
}

pub async fn unread(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
    Path(budget_id): Path<Uuid>,
    Query(query): Query<UnreadQuery>,
) -> Result<Json<UnreadCount>, ServerError> {
    let role = ActorRole::try_from(query.role.as_str())?;
    let unread = state.engine.unread_count(&ctx, budget_id, role).await?;
    Ok(Json(UnreadCount { unread }))
}
