//! Outcome of replicating budget items into the company catalog.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// One item that could not be turned into a company product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationFailure {
    pub item_id: Uuid,
    pub base_product_id: String,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationStatus {
    Complete,
    Partial,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationReport {
    pub budget_id: Uuid,
    /// Items replicated by this run.
    pub replicated_count: usize,
    /// Items already carrying a `replicated_product_id` from an earlier run.
    pub skipped_count: usize,
    pub failures: Vec<ReplicationFailure>,
}

impl ReplicationReport {
    pub fn new(budget_id: Uuid) -> Self {
        Self {
            budget_id,
            ..Self::default()
        }
    }

    pub fn status(&self) -> ReplicationStatus {
        if self.failures.is_empty() {
            ReplicationStatus::Complete
        } else {
            ReplicationStatus::Partial
        }
    }

    /// Items this run tried to replicate.
    pub fn attempted(&self) -> usize {
        self.replicated_count + self.failures.len()
    }

    /// Error out when at least one item is still missing its product.
    pub fn ensure_complete(&self) -> ResultEngine<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::PartialReplication {
                budget_id: self.budget_id.to_string(),
                failures: self.failures.clone(),
            })
        }
    }
}
