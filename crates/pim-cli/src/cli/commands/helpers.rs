//! Shared helpers for CLI commands.

use anyhow::{anyhow, bail, Result};
use std::path::Path;

use pim_client::{ClientError, LocalClient};
use pim_core::api::Router;
use pim_core::auth::RequestContext;
use pim_core::config::PimConfig;
use pim_core::core::{CoreContext, CoreError, PimServices};

/// Ensure pim is initialized under the given root.
pub fn ensure_initialized(root: &Path) -> Result<()> {
    if !PimConfig::config_path(root).exists() {
        bail!(
            "Not a pim directory: {}. Run 'pim init' first.",
            root.display()
        );
    }
    Ok(())
}

/// An opened root: the in-process router plus the caller's credentials.
pub struct Session {
    client: LocalClient,
    request: RequestContext,
}

impl Session {
    /// Everything goes through the API router; `services()` is for
    /// operations the client trait doesn't cover.
    #[must_use]
    pub const fn client(&self) -> &LocalClient {
        &self.client
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        self.client.router()
    }

    #[must_use]
    pub const fn services(&self) -> &PimServices {
        self.client.router().services()
    }

    #[must_use]
    pub const fn request(&self) -> &RequestContext {
        &self.request
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.request.bearer_token.clone()
    }
}

/// Load config, open the database, and bind the caller's token.
pub fn open_session(root: &Path, token: Option<&str>) -> Result<Session> {
    ensure_initialized(root)?;
    let ctx = CoreContext::new(root).map_err(core_error)?;
    let services = ctx.services().map_err(core_error)?;

    let token = token.map(str::trim).filter(|t| !t.is_empty());
    let request = token.map_or_else(RequestContext::anonymous, RequestContext::with_token);
    let client = LocalClient::new(Router::new(services), request.bearer_token.clone());
    Ok(Session { client, request })
}

const TOKEN_HINT: &str = "Pass --token or set PIM_TOKEN (see .pim/config.toml).";

/// Convert a service error, adding a hint for credential failures.
pub fn core_error(err: CoreError) -> anyhow::Error {
    match err {
        CoreError::Unauthenticated { .. } => anyhow!("{err}\n  {TOKEN_HINT}"),
        CoreError::Internal(inner) => inner,
        other => anyhow!(other),
    }
}

/// Convert a client error, adding hints and listing per-field messages.
pub fn client_error(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::Api { status: 401, .. } => anyhow!("{err}\n  {TOKEN_HINT}"),
        ClientError::Validation { fields } => {
            let lines: Vec<String> = fields
                .iter()
                .map(|(field, message)| format!("  {field}: {message}"))
                .collect();
            anyhow!("Validation failed:\n{}", lines.join("\n"))
        }
        ClientError::Transport(inner) => inner,
        other => anyhow!(other),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::initialized_root;
    use super::*;
    use pim_core::validate::FieldErrors;

    #[test]
    fn test_ensure_initialized_fails_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_initialized(dir.path()).unwrap_err();
        assert!(err.to_string().contains("pim init"));
        assert!(open_session(dir.path(), None).is_err());
    }

    #[test]
    fn test_open_session_binds_token() {
        let (dir, token) = initialized_root();
        let session = open_session(dir.path(), Some(&token)).unwrap();
        assert_eq!(session.token().as_deref(), Some(token.as_str()));
        let principal = session.services().status().profile(session.request()).unwrap();
        assert_eq!(principal.name, "admin");

        let anonymous = open_session(dir.path(), Some("  ")).unwrap();
        assert!(anonymous.token().is_none());
    }

    #[test]
    fn test_client_error_hints() {
        let err = client_error(ClientError::Api {
            status: 401,
            code: "unauthenticated".to_string(),
            message: "Authentication required".to_string(),
        });
        assert!(err.to_string().contains("PIM_TOKEN"));

        let mut fields = FieldErrors::new();
        fields.insert("meeting_name", "Meeting name is required");
        fields.insert("end_date", "End date must not be before start date");
        let err = client_error(ClientError::Validation { fields });
        let message = err.to_string();
        assert!(message.contains("  end_date: End date"));
        assert!(message.contains("  meeting_name: Meeting name is required"));
    }
}
