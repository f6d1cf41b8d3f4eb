//! Request authentication and role-based capabilities.
//!
//! Verifying a caller's credentials is delegated to an [`Authenticator`].
//! What an authenticated caller may do is decided by its [`Role`], through
//! the static role → capability table below.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host CMS role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Role {
    Administrator,
    Editor,
    Author,
    Contributor,
    Subscriber,
}

/// Something a role is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadProjects,
    EditProjects,
    ManageSite,
}

const READ_ONLY: &[Capability] = &[Capability::ReadProjects];
const READ_WRITE: &[Capability] = &[Capability::ReadProjects, Capability::EditProjects];
const EVERYTHING: &[Capability] = &[
    Capability::ReadProjects,
    Capability::EditProjects,
    Capability::ManageSite,
];

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Administrator,
        Self::Editor,
        Self::Author,
        Self::Contributor,
        Self::Subscriber,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Editor => "editor",
            Self::Author => "author",
            Self::Contributor => "contributor",
            Self::Subscriber => "subscriber",
        }
    }

    /// Capabilities granted to this role.
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Administrator => EVERYTHING,
            Self::Editor | Self::Author => READ_WRITE,
            Self::Contributor | Self::Subscriber => READ_ONLY,
        }
    }

    #[must_use]
    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

impl Capability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadProjects => "read_projects",
            Self::EditProjects => "edit_projects",
            Self::ManageSite => "manage_site",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: u64,
    pub name: String,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

/// Per-request credentials, passed explicitly into every service call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub bearer_token: Option<String>,
}

impl RequestContext {
    /// A request carrying no credentials.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { bearer_token: None }
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credentials supplied")]
    MissingCredentials,

    #[error("invalid or expired token")]
    InvalidToken,
}

/// Resolves a request's credentials to a principal.
pub trait Authenticator {
    fn authenticate(&self, request: &RequestContext) -> Result<Principal, AuthError>;
}

/// Authenticator backed by a fixed table of bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, Principal>,
}

impl TokenAuthenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` for `principal`. A repeated token replaces the earlier entry.
    pub fn insert(&mut self, token: impl Into<String>, principal: Principal) {
        self.tokens.insert(token.into(), principal);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<(String, Principal)> for TokenAuthenticator {
    fn from_iter<I: IntoIterator<Item = (String, Principal)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, request: &RequestContext) -> Result<Principal, AuthError> {
        let token = request
            .bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
