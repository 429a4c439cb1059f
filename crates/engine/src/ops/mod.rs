use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::{Catalog, DbCatalog, ResultEngine};

mod access;
mod budgets;
mod cost_centers;
mod ledger;
mod lifecycle;
mod messages;
mod replication;

pub use budgets::OverBudget;
pub use lifecycle::TransitionOutcome;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// What happens to a booked expense when its budget is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundPolicy {
    /// Leave the ledger alone; an operator books the refund by hand.
    #[default]
    Manual,
    /// Book a compensating refund in the same transaction as the delete.
    Automatic,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    catalog: Arc<dyn Catalog>,
    refund_policy: RefundPolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn refund_policy(&self) -> RefundPolicy {
        self.refund_policy
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    catalog: Option<Arc<dyn Catalog>>,
    refund_policy: RefundPolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the table-backed catalog.
    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> EngineBuilder {
        self.catalog = Some(catalog);
        self
    }

    pub fn refund_policy(mut self, policy: RefundPolicy) -> EngineBuilder {
        self.refund_policy = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            catalog: self.catalog.unwrap_or_else(|| Arc::new(DbCatalog)),
            refund_policy: self.refund_policy,
        })
    }
}
