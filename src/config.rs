//! Configuration loader
//!
//! Loads `js2c.yaml`. Every field is optional; missing fields take the
//! values the natives build has always used.
//!
//! ```yaml
//! macros_file_name: macros.py
//! namespace: adblock
//! array_name: js_sources
//! strip_comments: false
//! param_substitution: substring   # or: token
//! forbidden:
//!   - pattern: '\beval\s*\('
//!     message: Eval disallowed in natives
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use macro_core::{ParamSubstitution, Validator, DEFAULT_FORBIDDEN};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "JS2C_CONFIG";

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "js2c.yaml";

static NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*(::[A-Za-z_]\w*)*$").unwrap());

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").unwrap());

/// A construct rejected in expanded modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenRule {
    pub pattern: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Js2cConfig {
    /// File name that marks an input as the definitions file
    pub macros_file_name: String,
    /// C++ namespace wrapping the generated arrays
    pub namespace: String,
    /// Name of the generated `std::string` array
    pub array_name: String,
    /// Strip comments and trailing whitespace from expanded modules
    pub strip_comments: bool,
    pub param_substitution: ParamSubstitution,
    pub forbidden: Vec<ForbiddenRule>,
}

impl Default for Js2cConfig {
    fn default() -> Self {
        Self {
            macros_file_name: "macros.py".to_string(),
            namespace: "adblock".to_string(),
            array_name: "js_sources".to_string(),
            strip_comments: false,
            param_substitution: ParamSubstitution::default(),
            forbidden: DEFAULT_FORBIDDEN
                .iter()
                .map(|(pattern, message)| ForbiddenRule {
                    pattern: pattern.to_string(),
                    message: message.to_string(),
                })
                .collect(),
        }
    }
}

impl Js2cConfig {
    /// Load and check a YAML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .check()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Locate the config file
    ///
    /// Path resolution order:
    /// 1. JS2C_CONFIG environment variable (explicit path)
    /// 2. js2c.yaml in the current directory
    /// 3. Built-in defaults
    pub fn from_env() -> Result<Self> {
        match Self::locate() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        local.exists().then(|| local.to_path_buf())
    }

    /// Reject values that would produce an uncompilable C++ file
    pub fn check(&self) -> Result<()> {
        if self.macros_file_name.is_empty() {
            bail!("macros_file_name must not be empty");
        }
        if !NAMESPACE_RE.is_match(&self.namespace) {
            bail!("namespace '{}' is not a C++ namespace name", self.namespace);
        }
        if !IDENTIFIER_RE.is_match(&self.array_name) || self.array_name == "sources" {
            bail!("array_name '{}' is not a usable C++ identifier", self.array_name);
        }
        self.validator()?;
        Ok(())
    }

    /// Build the forbidden-construct validator from the configured rules
    pub fn validator(&self) -> Result<Validator> {
        Validator::from_rules(
            self.forbidden
                .iter()
                .map(|rule| (rule.pattern.as_str(), rule.message.as_str())),
        )
        .context("Invalid forbidden pattern")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Js2cConfig::default();
        assert_eq!(config.macros_file_name, "macros.py");
        assert_eq!(config.namespace, "adblock");
        assert_eq!(config.array_name, "js_sources");
        assert!(!config.strip_comments);
        assert_eq!(config.param_substitution, ParamSubstitution::Substring);
        assert_eq!(config.forbidden.len(), 2);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Js2cConfig =
            serde_yaml::from_str("namespace: natives\nparam_substitution: token\n").unwrap();
        assert_eq!(config.namespace, "natives");
        assert_eq!(config.param_substitution, ParamSubstitution::Token);
        assert_eq!(config.array_name, "js_sources");
        assert_eq!(config.forbidden.len(), 2);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "strip_comments: true\nforbidden:\n  - pattern: '\\bdebugger\\b'\n    message: No debugger"
        )
        .unwrap();

        let config = Js2cConfig::load(file.path()).unwrap();
        assert!(config.strip_comments);
        assert_eq!(config.forbidden[0].message, "No debugger");
        let validator = config.validator().unwrap();
        assert!(validator.validate("debugger;", "a.js").is_err());
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        let config = Js2cConfig {
            namespace: "my-ns".to_string(),
            ..Js2cConfig::default()
        };
        assert!(config.check().is_err());

        let config = Js2cConfig {
            namespace: "v8::internal".to_string(),
            array_name: "sources".to_string(),
            ..Js2cConfig::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let config = Js2cConfig {
            forbidden: vec![ForbiddenRule {
                pattern: "(".to_string(),
                message: "broken".to_string(),
            }],
            ..Js2cConfig::default()
        };
        assert!(config.validator().is_err());
    }
}
