//! Configuration for svnmerge.
//!
//! Values come from an optional TOML file, then command-line overrides are
//! layered on top. Loading follows the usual sequence: parse, resolve
//! `*_env` references, validate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::ignore::IgnoreMatcher;
use crate::svn::SvnClient;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub merge: MergeSection,

    /// Optional explicit SVN credentials.
    #[serde(default)]
    pub svn: SvnAuthConfig,
}

// ---------------------------------------------------------------------------
// Merge section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSection {
    /// Working copy that receives the merges.
    #[serde(default)]
    pub workspace: PathBuf,

    /// Source URL revisions are merged from.
    #[serde(default)]
    pub source: String,

    /// Workspace-relative files or directories whose conflicts are resolved
    /// to the local side and whose modifications are reverted.
    #[serde(default)]
    pub ignore_paths: Vec<String>,

    /// Where the run log, commit message and summary are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Commit the working copy after a run with no failures.
    #[serde(default)]
    pub auto_commit: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./merge-logs")
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            workspace: PathBuf::new(),
            source: String::new(),
            ignore_paths: Vec::new(),
            output_dir: default_output_dir(),
            auto_commit: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SVN credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SvnAuthConfig {
    /// SVN username. When unset, cached credentials are used.
    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable holding the SVN password.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Command-line overrides
// ---------------------------------------------------------------------------

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub source: Option<String>,
    pub ignore_paths: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    /// `true` forces auto-commit on; `false` keeps the file value.
    pub auto_commit: bool,
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl MergeConfig {
    /// Load a [`MergeConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MergeConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Layer command-line values over the file values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(workspace) = overrides.workspace {
            self.merge.workspace = workspace;
        }
        if let Some(source) = overrides.source {
            self.merge.source = source;
        }
        if let Some(ignore_paths) = overrides.ignore_paths {
            self.merge.ignore_paths = ignore_paths;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.merge.output_dir = output_dir;
        }
        if overrides.auto_commit {
            self.merge.auto_commit = true;
        }
    }

    /// Resolve all `*_env` fields from environment variables.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(env_name) = &self.svn.password_env {
            if self.svn.username.is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "svn.password_env".into(),
                    detail: "a password requires svn.username to be set".into(),
                });
            }
            self.svn.password = resolve_optional_env(env_name, "svn.password_env");
        }
        Ok(())
    }

    /// Make the workspace path absolute against the current directory.
    ///
    /// `svn` echoes its path arguments in status output, so every later path
    /// comparison assumes an absolute root.
    pub fn absolutize_workspace(&mut self) -> Result<(), ConfigError> {
        let workspace = &self.merge.workspace;
        if workspace.as_os_str().is_empty() || workspace.is_absolute() {
            return Ok(());
        }
        let absolute = std::path::absolute(workspace).map_err(|e| ConfigError::InvalidValue {
            field: "merge.workspace".into(),
            detail: format!("cannot make '{}' absolute: {}", workspace.display(), e),
        })?;
        debug!(from = %workspace.display(), to = %absolute.display(), "resolved workspace path");
        self.merge.workspace = absolute;
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merge.workspace.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "merge.workspace".into(),
                detail: "workspace must not be empty (set it in the config or pass --workspace)"
                    .into(),
            });
        }
        if !self.merge.workspace.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "merge.workspace".into(),
                detail: format!(
                    "'{}' does not exist or is not a directory",
                    self.merge.workspace.display()
                ),
            });
        }
        if self.merge.source.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "merge.source".into(),
                detail: "source URL must not be empty (set it in the config or pass --source)"
                    .into(),
            });
        }
        for rule in &self.merge.ignore_paths {
            if rule.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "merge.ignore_paths".into(),
                    detail: "ignore paths must not be empty strings".into(),
                });
            }
            if Path::new(rule).is_absolute() || rule.starts_with('/') || rule.starts_with('\\') {
                return Err(ConfigError::InvalidValue {
                    field: "merge.ignore_paths".into(),
                    detail: format!("'{}' must be relative to the workspace", rule),
                });
            }
        }
        if self.merge.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "merge.output_dir".into(),
                detail: "output directory must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Load the file (if any), apply overrides, resolve and validate.
    ///
    /// A missing file is an error only when `required` is set, i.e. the user
    /// named it explicitly.
    pub fn load_and_resolve(
        path: &Path,
        required: bool,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() || required {
            Self::load_from_file(path)?
        } else {
            debug!(path = %path.display(), "no configuration file; using defaults");
            Self::default()
        };
        config.apply_overrides(overrides);
        config.resolve_env_vars()?;
        config.absolutize_workspace()?;
        config.validate()?;
        Ok(config)
    }

    pub fn ignore_matcher(&self) -> IgnoreMatcher {
        IgnoreMatcher::new(self.merge.ignore_paths.iter().cloned())
    }

    /// SVN client carrying the configured credentials, if any.
    pub fn svn_client(&self) -> SvnClient {
        match &self.svn.username {
            Some(username) => SvnClient::with_credentials(username, self.svn.password.clone()),
            None => SvnClient::new(),
        }
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# svnmerge configuration
# Command-line flags override every value here.

[merge]
workspace = "/path/to/working-copy"
source = "https://svn.example.com/repos/project/branches/release"
# Workspace-relative paths: conflicts keep the local side, modifications
# are reverted after each merge.
ignore_paths = []
output_dir = "./merge-logs"
auto_commit = false

[svn]
# username = "your_svn_username"
# password_env = "SVNMERGE_SVN_PASSWORD"
"#
    }
}

/// Try to read an environment variable by name.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml(workspace: &Path) -> String {
        format!(
            r#"
[merge]
workspace = "{}"
source = "https://svn.example.com/repo/branches/rel"
ignore_paths = ["gen", "docs/api"]
auto_commit = true

[svn]
username = "jdoe"
password_env = "SVNMERGE_TEST_PASSWORD_UNSET"
"#,
            workspace.display().to_string().replace('\\', "/")
        )
    }

    #[test]
    fn test_parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let config: MergeConfig = toml::from_str(&sample_toml(dir.path())).unwrap();
        assert_eq!(config.merge.source, "https://svn.example.com/repo/branches/rel");
        assert_eq!(config.merge.ignore_paths, vec!["gen", "docs/api"]);
        assert_eq!(config.merge.output_dir, PathBuf::from("./merge-logs"));
        assert!(config.merge.auto_commit);
        assert_eq!(config.svn.username.as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: MergeConfig = toml::from_str("").unwrap();
        assert!(config.merge.workspace.as_os_str().is_empty());
        assert!(!config.merge.auto_commit);
        assert!(config.svn.username.is_none());
    }

    #[test]
    fn test_load_from_file_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, sample_toml(dir.path())).unwrap();

        let config = MergeConfig::load_and_resolve(&path, true, ConfigOverrides::default()).unwrap();
        assert_eq!(config.merge.ignore_paths.len(), 2);
        // Unset env var leaves the password empty rather than failing.
        assert!(config.svn.password.is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = MergeConfig::load_and_resolve(&path, true, ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));

        // Optional file: flags alone are enough.
        let overrides = ConfigOverrides {
            workspace: Some(dir.path().to_path_buf()),
            source: Some("^/trunk".into()),
            ..Default::default()
        };
        let config = MergeConfig::load_and_resolve(&path, false, overrides).unwrap();
        assert_eq!(config.merge.source, "^/trunk");
    }

    #[test]
    fn test_relative_workspace_made_absolute() {
        // Tests run from the crate root, where `src` exists.
        let dir = tempfile::tempdir().unwrap();
        let overrides = ConfigOverrides {
            workspace: Some(PathBuf::from("src")),
            source: Some("^/trunk".into()),
            ..Default::default()
        };
        let config =
            MergeConfig::load_and_resolve(&dir.path().join("nope.toml"), false, overrides).unwrap();
        assert!(config.merge.workspace.is_absolute());
        assert_eq!(
            config.merge.workspace,
            std::env::current_dir().unwrap().join("src")
        );

        let mut config = MergeConfig::default();
        config.absolutize_workspace().unwrap();
        assert!(config.merge.workspace.as_os_str().is_empty());
    }

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: MergeConfig = toml::from_str(&sample_toml(dir.path())).unwrap();
        config.apply_overrides(ConfigOverrides {
            source: Some("^/trunk".into()),
            ignore_paths: Some(vec!["vendor".into()]),
            output_dir: Some(PathBuf::from("/tmp/out")),
            ..Default::default()
        });
        assert_eq!(config.merge.source, "^/trunk");
        assert_eq!(config.merge.ignore_paths, vec!["vendor"]);
        assert_eq!(config.merge.output_dir, PathBuf::from("/tmp/out"));
        // auto_commit=false on the command line does not switch the file value off.
        assert!(config.merge.auto_commit);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let base: MergeConfig = toml::from_str(&sample_toml(dir.path())).unwrap();
        assert!(base.validate().is_ok());

        let mut c = base.clone();
        c.merge.source = "  ".into();
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "merge.source"
        ));

        let mut c = base.clone();
        c.merge.workspace = dir.path().join("missing");
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "merge.workspace"
        ));

        let mut c = base.clone();
        c.merge.ignore_paths = vec!["/abs/path".into()];
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "merge.ignore_paths"
        ));

        let mut c = base;
        c.merge.ignore_paths = vec!["".into()];
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_password_without_username_rejected() {
        let mut config = MergeConfig::default();
        config.svn.password_env = Some("X".into());
        assert!(config.resolve_env_vars().is_err());
    }

    #[test]
    fn test_default_template_parses() {
        let config: MergeConfig = toml::from_str(MergeConfig::default_template()).unwrap();
        assert!(config.merge.ignore_paths.is_empty());
        assert!(config.svn.username.is_none());
    }
}
