//! Service layer for pim-core.
//!
//! Every service operation takes the caller's [`RequestContext`], resolves it
//! through the configured [`Authenticator`], checks the capability the
//! operation needs, and only then touches a store. Store results and typed
//! errors pass through unchanged.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use pim_core::auth::RequestContext;
//! use pim_core::core::CoreContext;
//!
//! let ctx = CoreContext::new(Path::new("/srv/site")).unwrap();
//! let services = ctx.services().unwrap();
//! let request = RequestContext::with_token("secret");
//! let projects = services.projects().list(&request).unwrap();
//! ```

pub mod blocks;
pub mod errors;
pub mod projects;
pub mod status;
pub mod templates;

pub use errors::{CoreError, CoreResult};

use std::path::{Path, PathBuf};

use crate::auth::{Authenticator, Capability, Principal, RequestContext};
use crate::config::PimConfig;
use crate::store::Db;

/// Context for pim services: the root directory and its loaded config.
#[derive(Debug, Clone)]
pub struct CoreContext {
    /// Directory containing `.pim/`.
    root: PathBuf,
    config: PimConfig,
}

impl CoreContext {
    /// Load the context for `root`.
    ///
    /// Fails with `NotInitialized` when `<root>/.pim/config.toml` is missing.
    pub fn new(root: &Path) -> CoreResult<Self> {
        if !PimConfig::config_path(root).exists() {
            return Err(CoreError::NotInitialized {
                path: root.display().to_string(),
            });
        }
        let config = PimConfig::load(root)?;
        Ok(Self::with_config(root, config))
    }

    /// Build a context from an already-loaded config.
    #[must_use]
    pub fn with_config(root: &Path, config: PimConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn config(&self) -> &PimConfig {
        &self.config
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.config.database_path(&self.root)
    }

    /// Open the database and make sure the schema exists.
    pub fn open_db(&self) -> CoreResult<Db> {
        let db = Db::open(&self.db_path())?;
        db.init_schema()?;
        Ok(db)
    }

    /// Services over this context's database, authenticating with the
    /// configured tokens.
    pub fn services(&self) -> CoreResult<PimServices> {
        let db = self.open_db()?;
        Ok(PimServices::new(db, self.config.authenticator()))
    }
}

/// Facade providing all pim service APIs.
///
/// Owns the database and the authenticator; the per-domain services borrow
/// both. `PimServices` is `Send + Sync` and can be shared across threads.
pub struct PimServices {
    db: Db,
    auth: Box<dyn Authenticator + Send + Sync>,
}

impl PimServices {
    pub fn new(db: Db, auth: impl Authenticator + Send + Sync + 'static) -> Self {
        Self {
            db,
            auth: Box::new(auth),
        }
    }

    /// Access project operations.
    #[must_use]
    pub fn projects(&self) -> projects::ProjectService<'_> {
        projects::ProjectService::new(self.gate(), &self.db)
    }

    /// Access block operations.
    #[must_use]
    pub fn blocks(&self) -> blocks::BlockService<'_> {
        blocks::BlockService::new(self.gate(), &self.db)
    }

    /// Access template operations.
    #[must_use]
    pub fn templates(&self) -> templates::TemplateService<'_> {
        templates::TemplateService::new(self.gate(), &self.db)
    }

    /// Access status, profile and admin operations.
    #[must_use]
    pub fn status(&self) -> status::StatusService<'_> {
        status::StatusService::new(self.gate(), &self.db)
    }

    /// The underlying database, for maintenance tasks outside the gate.
    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// Resolve the caller without requiring any capability.
    pub fn authenticate(&self, request: &RequestContext) -> CoreResult<Principal> {
        self.gate().authenticate(request)
    }

    fn gate(&self) -> Gate<'_> {
        Gate { auth: &*self.auth }
    }
}

/// Authentication and capability check shared by all services.
#[derive(Clone, Copy)]
pub(crate) struct Gate<'a> {
    auth: &'a (dyn Authenticator + Send + Sync),
}

impl Gate<'_> {
    /// Resolve the caller, or fail with `Unauthenticated`.
    pub(crate) fn authenticate(&self, request: &RequestContext) -> CoreResult<Principal> {
        self.auth.authenticate(request).map_err(|e| {
            tracing::warn!(reason = %e, "request rejected: not authenticated");
            CoreError::Unauthenticated {
                reason: e.to_string(),
            }
        })
    }

    /// Resolve the caller and require `capability`.
    ///
    /// `action` completes the sentence "You do not have permission to ...".
    pub(crate) fn require(
        &self,
        request: &RequestContext,
        capability: Capability,
        action: &str,
    ) -> CoreResult<Principal> {
        let principal = self.authenticate(request)?;
        if !principal.can(capability) {
            tracing::warn!(
                user_id = principal.user_id,
                role = %principal.role,
                capability = %capability,
                "request rejected: missing capability"
            );
            return Err(CoreError::Forbidden {
                action: action.to_string(),
            });
        }
        Ok(principal)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::PimServices;
    use crate::auth::{Principal, RequestContext, Role, TokenAuthenticator};
    use crate::config::default_templates;
    use crate::store::Db;

    /// Services over an in-memory database with one token per role.
    ///
    /// The token for a role is its name, e.g. `"editor"`.
    pub(crate) fn services() -> PimServices {
        let db = Db::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db.templates().seed(&default_templates()).unwrap();

        let auth: TokenAuthenticator = Role::ALL
            .into_iter()
            .zip(1u64..)
            .map(|(role, user_id)| {
                (
                    role.as_str().to_string(),
                    Principal {
                        user_id,
                        name: format!("{role}-user"),
                        role,
                    },
                )
            })
            .collect();
        PimServices::new(db, auth)
    }

    pub(crate) fn as_role(role: Role) -> RequestContext {
        RequestContext::with_token(role.as_str())
    }
}
