//! Caller context passed into every engine operation.
//!
//! Identity is supplied by the auth layer and trusted as given; the engine only
//! uses it for role guards, company scoping and attribution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Who is acting on a budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Company-side requester ("gestor").
    Manager,
    /// Central operations team.
    SuperAdmin,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ActorRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "manager" => Ok(Self::Manager),
            "super_admin" | "superAdmin" => Ok(Self::SuperAdmin),
            other => Err(EngineError::Validation(format!("invalid actor role: {other}"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Context {
    pub actor_id: String,
    pub actor_name: String,
    pub role: ActorRole,
    pub company_id: String,
    /// Clock reading used for every timestamp written by the operation.
    pub now: DateTime<Utc>,
}

impl Context {
    #[must_use]
    pub fn new(
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
        role: ActorRole,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_name: actor_name.into(),
            role,
            company_id: company_id.into(),
            now: Utc::now(),
        }
    }

    #[must_use]
    pub fn manager(
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self::new(actor_id, actor_name, ActorRole::Manager, company_id)
    }

    #[must_use]
    pub fn super_admin(
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self::new(actor_id, actor_name, ActorRole::SuperAdmin, company_id)
    }

    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == ActorRole::SuperAdmin
    }

    /// Managers only see their own company; super-admins see every company.
    pub fn can_access_company(&self, company_id: &str) -> bool {
        self.is_super_admin() || self.company_id == company_id
    }
}
