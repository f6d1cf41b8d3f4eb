//! Status service: public banner, auth status and admin statistics.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{Capability, Principal, RequestContext, Role};
use crate::store::Db;
use crate::version::{SERVICE_NAME, VERSION};

use super::{CoreResult, Gate};

/// Unauthenticated service banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInfo {
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Record counts for administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub projects: i64,
    pub blocks: i64,
    pub templates: i64,
}

pub struct StatusService<'a> {
    gate: Gate<'a>,
    db: &'a Db,
}

impl<'a> StatusService<'a> {
    pub(crate) const fn new(gate: Gate<'a>, db: &'a Db) -> Self {
        Self { gate, db }
    }

    /// Service name, version and server time. Needs no credentials.
    #[must_use]
    pub fn public_info(&self) -> PublicInfo {
        PublicInfo {
            service: SERVICE_NAME.to_string(),
            version: VERSION.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Whether the request is authenticated. Never fails.
    #[must_use]
    pub fn auth_status(&self, request: &RequestContext) -> AuthStatus {
        let principal = self.gate.auth.authenticate(request).ok();
        AuthStatus {
            is_logged_in: principal.is_some(),
            user_id: principal.as_ref().map(|p| p.user_id),
            role: principal.map(|p| p.role),
        }
    }

    /// The authenticated caller.
    #[tracing::instrument(skip_all)]
    pub fn profile(&self, request: &RequestContext) -> CoreResult<Principal> {
        self.gate.authenticate(request)
    }

    /// Record counts. Administrators only.
    #[tracing::instrument(skip_all)]
    pub fn admin_stats(&self, request: &RequestContext) -> CoreResult<AdminStats> {
        self.gate
            .require(request, Capability::ManageSite, "view site statistics")?;
        Ok(AdminStats {
            projects: self.db.projects().count()?,
            blocks: self.db.blocks().count()?,
            templates: self.db.templates().count()?,
        })
    }
}
