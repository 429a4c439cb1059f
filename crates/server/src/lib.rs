use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{router, run, run_with_listener, spawn_with_listener};

mod actor;
mod budgets;
mod cost_centers;
mod messages;
mod products;
mod server;

pub mod types {
    pub use api_types::Role;

    pub mod budget {
        pub use api_types::budget::{
            BudgetList, BudgetNew, BudgetType, ItemNew, ItemPatch,
            TransitionRequest,
        };
        pub use engine::{Budget, BudgetItem, BudgetStatus, OverBudget, TransitionOutcome};
    }

    pub mod message {
        pub use api_types::message::{MarkedRead, MessageNew, UnreadCount, UnreadQuery};
        pub use engine::BudgetMessage;
    }

    pub mod cost_center {
        pub use api_types::cost_center::{
            AdjustmentKind, AdjustmentNew, AllocationNew, CostCenterNew, RefundNew,
        };
        pub use engine::{Balances, CostCenter, CostCenterTransaction};
    }

    pub mod product {
        pub use engine::CompanyProduct;
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::InvalidTransition { .. } | EngineError::Conflict { .. } => {
            StatusCode::CONFLICT
        }
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::Validation(_)
        | EngineError::InvalidId(_)
        | EngineError::PartialReplication { .. }
        | EngineError::ReplicationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use engine::{BudgetStatus, EntityKind, Operation};
    use sea_orm::DbErr;

    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::NotFound {
            entity: EntityKind::Budget,
            id: "x".to_string(),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_transition_and_conflict_map_to_409() {
        let res = ServerError::from(EngineError::InvalidTransition {
            budget_id: "x".to_string(),
            status: BudgetStatus::Approved,
            operation: Operation::ApproveValues,
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = ServerError::from(EngineError::Conflict {
            entity: EntityKind::Budget,
            id: "x".to_string(),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let res = ServerError::from(EngineError::ReplicationFailed {
            budget_id: "x".to_string(),
            failures: Vec::new(),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn database_errors_are_hidden() {
        let err = EngineError::Database(DbErr::Custom("disk on fire".to_string()));
        assert_eq!(status_for_engine_error(&err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message_for_engine_error(err), "internal server error");
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
