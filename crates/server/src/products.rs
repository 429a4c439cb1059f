use axum::{Extension, Json, extract::State};
use engine::{CompanyProduct, Context};

use crate::{ServerError, server::ServerState};

/// Catalog of the caller's company, filled by replication.
pub async fn list(
    Extension(ctx): Extension<Context>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CompanyProduct>>, ServerError> {
    Ok(Json(state.engine.company_products(&ctx).await?))
}
