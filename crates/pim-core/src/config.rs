//! pim configuration, stored at `<root>/.pim/config.toml`.
//!
//! The loaded [`PimConfig`] is passed by value into [`crate::core::CoreContext`];
//! nothing reads settings from process-wide state after startup except the
//! documented environment overrides.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{Principal, Role, TokenAuthenticator};
use crate::model::{Element, TemplateSeed, ValueType};

/// Directory under the root that holds pim state.
pub const PIM_DIR: &str = ".pim";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_DATABASE: &str = "pim.db";

/// Overrides the configured database path.
pub const ENV_DATABASE: &str = "PIM_DATABASE";

/// A bearer token and the principal it authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalEntry {
    pub token: String,
    pub user_id: u64,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PimConfig {
    /// Database path; relative paths resolve against the `.pim` directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    #[serde(default)]
    pub principals: Vec<PrincipalEntry>,

    /// Templates inserted by `pim init`.
    #[serde(default)]
    pub templates: Vec<TemplateSeed>,
}

impl PimConfig {
    /// `<root>/.pim`
    #[must_use]
    pub fn pim_dir(root: &Path) -> PathBuf {
        root.join(PIM_DIR)
    }

    /// `<root>/.pim/config.toml`
    #[must_use]
    pub fn config_path(root: &Path) -> PathBuf {
        Self::pim_dir(root).join(CONFIG_FILE)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse pim config")
    }

    /// Load `<root>/.pim/config.toml` and apply environment overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::config_path(root);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(database) = lookup(ENV_DATABASE).filter(|v| !v.trim().is_empty()) {
            self.database = Some(PathBuf::from(database));
        }
    }

    /// Write the config to `<root>/.pim/config.toml`, creating the directory.
    pub fn save(&self, root: &Path) -> Result<PathBuf> {
        let dir = Self::pim_dir(root);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = Self::config_path(root);
        let contents = toml::to_string_pretty(self).context("Failed to serialize pim config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(path)
    }

    /// Resolved database path for a given root.
    #[must_use]
    pub fn database_path(&self, root: &Path) -> PathBuf {
        let pim_dir = Self::pim_dir(root);
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => pim_dir.join(path),
            None => pim_dir.join(DEFAULT_DATABASE),
        }
    }

    /// Build a token authenticator from the configured principals.
    #[must_use]
    pub fn authenticator(&self) -> TokenAuthenticator {
        self.principals
            .iter()
            .map(|entry| {
                (
                    entry.token.clone(),
                    Principal {
                        user_id: entry.user_id,
                        name: entry.name.clone(),
                        role: entry.role,
                    },
                )
            })
            .collect()
    }

    /// Fresh config for `pim init`: one administrator and the stock templates.
    pub fn initial(admin_name: &str) -> Result<Self> {
        Ok(Self {
            database: None,
            principals: vec![PrincipalEntry {
                token: generate_token()?,
                user_id: 1,
                name: admin_name.to_string(),
                role: Role::Administrator,
            }],
            templates: default_templates(),
        })
    }
}

/// Random 32-byte bearer token, hex encoded.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|e| anyhow!("Failed to generate token: {e}"))?;
    let mut token = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(token, "{byte:02x}");
    }
    Ok(token)
}

/// Templates shipped with a new installation.
#[must_use]
pub fn default_templates() -> Vec<TemplateSeed> {
    vec![
        TemplateSeed {
            title: "Venue".to_string(),
            elements: vec![
                Element::new("Venue name", "", ValueType::Text),
                Element::new("Capacity", "", ValueType::Number),
                Element::new("Site visit", "", ValueType::Date),
                Element::new("Floor plan", "", ValueType::Url),
            ],
        },
        TemplateSeed {
            title: "Catering".to_string(),
            elements: vec![
                Element::new("Caterer", "", ValueType::Text),
                Element::new("Headcount", "", ValueType::Number),
                Element::new("Menu", "", ValueType::Url),
            ],
        },
        TemplateSeed {
            title: "Travel".to_string(),
            elements: vec![
                Element::new("Arrival", "", ValueType::Date),
                Element::new("Departure", "", ValueType::Date),
                Element::new("Hotel", "", ValueType::Text),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authenticator, RequestContext};
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
database = "data/projects.db"

[[principals]]
token = "admin-token"
user_id = 1
name = "root"
role = "administrator"

[[principals]]
token = "viewer-token"
user_id = 9
name = "viewer"
role = "subscriber"

[[templates]]
title = "Venue"

[[templates.elements]]
key = "Capacity"
value = "100"
type = "number"

[[templates.elements]]
key = "Notes"
"#;

    #[test]
    fn test_parse_sample() {
        let config = PimConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.principals.len(), 2);
        assert_eq!(config.principals[1].role, Role::Subscriber);
        assert_eq!(config.templates[0].elements.len(), 2);
        assert_eq!(config.templates[0].elements[0].value_type, ValueType::Number);
        assert_eq!(config.templates[0].elements[1].value_type, ValueType::Text);
        assert_eq!(config.templates[0].elements[1].value, "");
    }

    #[test]
    fn test_unknown_role_rejected() {
        let raw = r#"
[[principals]]
token = "t"
user_id = 1
name = "x"
role = "owner"
"#;
        assert!(PimConfig::from_toml(raw).is_err());
    }

    #[test]
    fn test_database_path_resolution() {
        let root = Path::new("/srv/site");
        let mut config = PimConfig::default();
        assert_eq!(config.database_path(root), root.join(".pim").join("pim.db"));

        config.database = Some(PathBuf::from("data/projects.db"));
        assert_eq!(
            config.database_path(root),
            root.join(".pim").join("data/projects.db")
        );

        config.database = Some(PathBuf::from("/var/lib/pim.db"));
        assert_eq!(config.database_path(root), PathBuf::from("/var/lib/pim.db"));
    }

    #[test]
    fn test_env_override() {
        let mut config = PimConfig::from_toml(SAMPLE).unwrap();
        config.apply_env(|key| (key == ENV_DATABASE).then(|| "/tmp/other.db".to_string()));
        assert_eq!(config.database, Some(PathBuf::from("/tmp/other.db")));

        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.database, Some(PathBuf::from("/tmp/other.db")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let config = PimConfig::initial("root").unwrap();
        let path = config.save(dir.path()).unwrap();
        assert!(path.ends_with(".pim/config.toml"));

        let loaded = PimConfig::from_toml(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_authenticator_from_config() {
        let config = PimConfig::from_toml(SAMPLE).unwrap();
        let auth = config.authenticator();
        let principal = auth
            .authenticate(&RequestContext::with_token("viewer-token"))
            .unwrap();
        assert_eq!(principal.user_id, 9);
        assert_eq!(principal.role, Role::Subscriber);
    }

    #[test]
    fn test_generated_tokens_are_distinct_hex() {
        let a = generate_token().unwrap();
        let b = generate_token().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
