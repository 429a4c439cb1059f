use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use std::sync::Arc;

use crate::{actor, budgets, cost_centers, messages, products};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };

    Router::new()
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route("/budgets/{id}", get(budgets::get).delete(budgets::delete))
        .route("/budgets/{id}/open", post(budgets::open))
        .route("/budgets/{id}/items", post(budgets::add_item))
        .route(
            "/budgets/{id}/items/{item_id}",
            patch(budgets::update_item).delete(budgets::delete_item),
        )
        .route("/budgets/{id}/transitions", post(budgets::transition))
        .route(
            "/budgets/{id}/replication/retry",
            post(budgets::retry_replication),
        )
        .route("/budgets/{id}/over-budget", get(budgets::over_budget))
        .route(
            "/budgets/{id}/messages",
            get(messages::list).post(messages::post),
        )
        .route("/budgets/{id}/messages/read", post(messages::mark_read))
        .route("/budgets/{id}/messages/unread", get(messages::unread))
        .route(
            "/cost-centers",
            get(cost_centers::list).post(cost_centers::create),
        )
        .route("/cost-centers/{id}", get(cost_centers::get))
        .route(
            "/cost-centers/{id}/transactions",
            get(cost_centers::transactions),
        )
        .route(
            "/cost-centers/{id}/allocations",
            post(cost_centers::allocation),
        )
        .route("/cost-centers/{id}/refunds", post(cost_centers::refund))
        .route(
            "/cost-centers/{id}/adjustments",
            post(cost_centers::adjustment),
        )
        .route("/cost-centers/{id}/recompute", post(cost_centers::recompute))
        .route("/products", get(products::list))
        .route_layer(middleware::from_fn(actor::actor))
        .with_state(state)
}

pub async fn run(engine: Engine, bind: &str) {
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {bind}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
