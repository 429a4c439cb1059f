//! Budget lifecycle and cost-center ledger engine.
//!
//! A [`Budget`] moves through a fixed procurement pipeline driven by
//! [`lifecycle::RULES`]. Approving a budget books an expense on its
//! [`CostCenter`]; releasing or stocking it replicates its items into the
//! company catalog through a [`Catalog`]. Every write runs in one DB
//! transaction.

pub use budget_items::BudgetItem;
pub use budget_messages::BudgetMessage;
pub use budgets::{Budget, BudgetNote, BudgetStatus, BudgetType};
pub use catalog::{
    BaseProduct, Catalog, CatalogFuture, CompanyProduct, DbCatalog, ProductUpsert,
    company_products_of, insert_base_product,
};
pub use commands::{
    AdjustmentCmd, BudgetFilter, ItemUpdate, LedgerEntryCmd, NewBudgetCmd, NewCostCenterCmd,
    NewItemCmd, TransitionArgs,
};
pub use context::{ActorRole, Context};
pub use cost_center_transactions::{
    AdjustmentKind, BudgetRef, CostCenterTransaction, TransactionKind, replay,
};
pub use cost_centers::{Balances, CostCenter};
pub use error::{EngineError, EntityKind};
pub use lifecycle::{Effect, ItemAction, Operation};
pub use ops::{Engine, EngineBuilder, OverBudget, RefundPolicy, TransitionOutcome};
pub use replication::{ReplicationFailure, ReplicationReport, ReplicationStatus};

pub mod budget_items;
pub mod budget_messages;
pub mod budgets;
pub mod catalog;
mod commands;
mod context;
pub mod cost_center_transactions;
pub mod cost_centers;
mod error;
pub mod lifecycle;
mod ops;
mod replication;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
