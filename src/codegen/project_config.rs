//! Project configuration schema for pagesmith.yaml
//!
//! Every field has a default, so a missing file is the same as an empty one.
//! Values are layered: command-line flags over environment variables over the
//! file over built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::codegen::artifacts::Layout;
use crate::codegen::defaults::FormPolicy;
use crate::codegen::fs_utils;
use crate::error::{Error, Result};
use crate::schema::validation::validate_identifier;

pub const DEFAULT_CONFIG_FILE: &str = "pagesmith.yaml";

/// Top-level project configuration from pagesmith.yaml
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    #[serde(default = "default_marker_tag")]
    pub marker_tag: String,
    #[serde(default = "default_identity_table")]
    pub identity_table: String,
    #[serde(default = "default_audit_user_column")]
    pub audit_user_column: String,
    #[serde(default = "default_audit_columns")]
    pub audit_columns: Vec<String>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub reload: ReloadConfig,
    #[serde(default)]
    pub layout: Layout,
}

/// Target database probing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_options_limit")]
    pub options_limit: u32,
}

/// Service reload after generation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReloadConfig {
    #[serde(default = "default_reload_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_catalog() -> PathBuf {
    PathBuf::from("catalog.yaml")
}

fn default_marker_tag() -> String {
    "pagesmith".to_string()
}

fn default_identity_table() -> String {
    "auth_user".to_string()
}

fn default_audit_user_column() -> String {
    "id_auth_user".to_string()
}

fn default_audit_columns() -> Vec<String> {
    vec!["created_at".to_string(), "updated_at".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_options_limit() -> u32 {
    200
}

fn default_reload_timeout_secs() -> u64 {
    30
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            enabled: true,
            database_url: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            options_limit: default_options_limit(),
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        ReloadConfig {
            timeout_secs: default_reload_timeout_secs(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            catalog: default_catalog(),
            marker_tag: default_marker_tag(),
            identity_table: default_identity_table(),
            audit_user_column: default_audit_user_column(),
            audit_columns: default_audit_columns(),
            probe: ProbeConfig::default(),
            reload: ReloadConfig::default(),
            layout: Layout::default(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub catalog: Option<PathBuf>,
    pub database_url: Option<String>,
    pub no_probe: bool,
}

impl ProjectConfig {
    /// Load project configuration from pagesmith.yaml
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(ProjectConfig::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match fs_utils::read_text(path.as_ref())? {
            Some(contents) => {
                debug!(path = %path.as_ref().display(), "Loaded project configuration");
                Self::from_yaml_str(&contents)
            }
            None => {
                debug!(path = %path.as_ref().display(), "No project configuration file, using defaults");
                Ok(ProjectConfig::default())
            }
        }
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(catalog) = non_empty("PAGESMITH_CATALOG") {
            self.catalog = PathBuf::from(catalog);
        }
        if let Some(url) = non_empty("PAGESMITH_DATABASE_URL").or_else(|| non_empty("DATABASE_URL")) {
            self.probe.database_url = Some(url);
        }
    }

    /// Apply environment overrides from the process environment
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(catalog) = &cli.catalog {
            self.catalog = catalog.clone();
        }
        if let Some(url) = &cli.database_url {
            self.probe.database_url = Some(url.clone());
        }
        if cli.no_probe {
            self.probe.enabled = false;
        }
    }

    /// The catalog path, resolved against the config file's directory
    pub fn catalog_path(&self, config_dir: &Path) -> PathBuf {
        if self.catalog.is_absolute() {
            self.catalog.clone()
        } else {
            config_dir.join(&self.catalog)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.connect_timeout_secs)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload.timeout_secs)
    }

    /// Columns kept out of generated forms
    pub fn form_policy(&self) -> FormPolicy {
        let mut excluded = self.audit_columns.clone();
        if !excluded.contains(&self.audit_user_column) {
            excluded.push(self.audit_user_column.clone());
        }
        FormPolicy {
            excluded_columns: excluded,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker_tag.trim().is_empty()
            || self
                .marker_tag
                .chars()
                .any(|c| c.is_whitespace() || c == '[' || c == ']' || c == ':')
        {
            return Err(Error::Validation(format!(
                "marker_tag '{}' must be non-empty without whitespace, brackets or colons",
                self.marker_tag
            )));
        }
        validate_identifier("identity_table", &self.identity_table)?;
        validate_identifier("audit_user_column", &self.audit_user_column)?;
        for column in &self.audit_columns {
            validate_identifier("audit column", column)?;
        }
        if self.layout.templates_dir.trim().is_empty() || self.layout.modals_dir.trim().is_empty() {
            return Err(Error::Validation("layout directories cannot be empty".to_string()));
        }
        if self.probe.options_limit == 0 {
            return Err(Error::Validation("probe.options_limit must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for FormPolicy {
    fn default() -> Self {
        ProjectConfig::default().form_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_sample_config() {
        let yaml = r#"
catalog: meta/catalog.yaml
marker_tag: acme
probe:
  database_url: postgres://app@db/ventas
  options_limit: 50
layout:
  modals_dir: dialogs
"#;
        let config = ProjectConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.catalog, PathBuf::from("meta/catalog.yaml"));
        assert_eq!(config.marker_tag, "acme");
        assert!(config.probe.enabled);
        assert_eq!(config.probe.connect_timeout_secs, 5);
        assert_eq!(config.probe.options_limit, 50);
        assert_eq!(config.layout.templates_dir, "templates");
        assert_eq!(config.layout.modals_dir, "dialogs");
        assert_eq!(config.reload.timeout_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_example_project_file() {
        let config = ProjectConfig::from_file("config/examples/facturacion/pagesmith.yaml").unwrap();
        assert_eq!(config.catalog, PathBuf::from("catalog.yaml"));
        assert_eq!(config.probe.options_limit, 500);
        assert_eq!(config.reload.timeout_secs, 10);
        assert_eq!(config.layout.filters_library, "page_filters");
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_or_default(dir.path().join("pagesmith.yaml")).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_precedence_cli_env_file() {
        let mut config = ProjectConfig::from_yaml_str("catalog: file.yaml\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("PAGESMITH_CATALOG", "env.yaml"),
            ("DATABASE_URL", "postgres://generic/db"),
            ("PAGESMITH_DATABASE_URL", "postgres://specific/db"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.catalog, PathBuf::from("env.yaml"));
        assert_eq!(config.probe.database_url.as_deref(), Some("postgres://specific/db"));

        config.apply_cli(&CliOverrides {
            catalog: Some(PathBuf::from("cli.yaml")),
            database_url: None,
            no_probe: true,
        });
        assert_eq!(config.catalog, PathBuf::from("cli.yaml"));
        assert_eq!(config.probe.database_url.as_deref(), Some("postgres://specific/db"));
        assert!(!config.probe.enabled);
    }

    #[test]
    fn test_form_policy_from_audit_columns() {
        let policy = FormPolicy::default();
        assert!(policy.excludes("created_at"));
        assert!(policy.excludes("updated_at"));
        assert!(policy.excludes("id_auth_user"));
        assert!(!policy.excludes("monto"));

        let mut config = ProjectConfig::default();
        config.audit_user_column = "id_usuario".to_string();
        let policy = config.form_policy();
        assert!(policy.excludes("id_usuario"));
        assert!(!policy.excludes("id_auth_user"));
    }

    #[test]
    fn test_invalid_marker_tag() {
        let mut config = ProjectConfig::default();
        config.marker_tag = "my tag".to_string();
        assert!(config.validate().is_err());
    }
}
