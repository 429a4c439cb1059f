//! The module contains the errors the engine can return.
//!
//! Every failure carries its kind plus the offending entity id, so callers can
//! render a specific message:
//!
//! - [`NotFound`] a budget, item, cost center or product does not exist (or is
//!   not visible to the caller's company).
//! - [`InvalidTransition`] the operation is not allowed from the stored status
//!   or for the caller's role.
//! - [`Conflict`] a concurrent writer changed the row first; reload and retry.
//! - [`PartialReplication`] some budget items were not replicated, raised on
//!   request from a replication report.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`Conflict`]: EngineError::Conflict
//!  [`PartialReplication`]: EngineError::PartialReplication
use sea_orm::DbErr;
use thiserror::Error;

use crate::{BudgetStatus, Operation, replication::ReplicationFailure};

/// Kind of entity an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Budget,
    BudgetItem,
    CostCenter,
    BaseProduct,
    CompanyProduct,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::BudgetItem => "budget item",
            Self::CostCenter => "cost center",
            Self::BaseProduct => "base product",
            Self::CompanyProduct => "company product",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} \"{id}\" not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("cannot {operation} budget \"{budget_id}\" in status {status}")]
    InvalidTransition {
        budget_id: String,
        status: BudgetStatus,
        operation: Operation,
    },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{entity} \"{id}\" was modified concurrently")]
    Conflict { entity: EntityKind, id: String },
    /// Never returned by a transition: partial failures are reported in
    /// `TransitionOutcome::replication`. Built by
    /// [`ReplicationReport::ensure_complete`](crate::ReplicationReport::ensure_complete)
    /// for callers that treat any failed item as an error.
    #[error("budget \"{budget_id}\": {} item(s) failed to replicate", failures.len())]
    PartialReplication {
        budget_id: String,
        failures: Vec<ReplicationFailure>,
    },
    #[error("budget \"{budget_id}\": no item could be replicated")]
    ReplicationFailed {
        budget_id: String,
        failures: Vec<ReplicationFailure>,
    },
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn conflict(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::NotFound { entity: a, id: x },
                Self::NotFound { entity: b, id: y },
            ) => a == b && x == y,
            (
                Self::InvalidTransition {
                    budget_id: a,
                    status: s1,
                    operation: o1,
                },
                Self::InvalidTransition {
                    budget_id: b,
                    status: s2,
                    operation: o2,
                },
            ) => a == b && s1 == s2 && o1 == o2,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::Conflict { entity: a, id: x },
                Self::Conflict { entity: b, id: y },
            ) => a == b && x == y,
            (
                Self::PartialReplication {
                    budget_id: a,
                    failures: f1,
                },
                Self::PartialReplication {
                    budget_id: b,
                    failures: f2,
                },
            ) => a == b && f1 == f2,
            (
                Self::ReplicationFailed {
                    budget_id: a,
                    failures: f1,
                },
                Self::ReplicationFailed {
                    budget_id: b,
                    failures: f2,
                },
            ) => a == b && f1 == f2,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
