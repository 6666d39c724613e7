//! Dispatcher configuration.
//!
//! Two sources share one struct: the key=value format of `.zesty/config`
//! files, and JSON objects handed over by the host (which uses camelCase for
//! some keys). Every field is optional and falls back to its default.

use crate::exempt::DEFAULT_EXEMPTIONS;
use crate::skills::unquote;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid config line: {0}")]
    InvalidLine(String),
    #[error("invalid boolean value for {key}: {value}")]
    InvalidBool { key: String, value: String },
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
    #[error("invalid JSON config: {0}")]
    InvalidJson(String),
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Patterns for skills that are always kept (exact names or `prefix*`).
    pub exemptions: Vec<String>,

    // Semantic recommendation
    #[serde(alias = "routerModel")]
    pub router_model: String,
    /// Endpoint of the text-generation collaborator. Unset disables the signal.
    #[serde(alias = "generatorUrl")]
    pub generator_url: Option<String>,
    #[serde(alias = "generatorToken")]
    pub generator_token: Option<String>,
    /// Upper bound for the semantic call in seconds (0 = no timeout).
    #[serde(alias = "semanticTimeoutSec")]
    pub semantic_timeout_sec: u32,

    // Manual selection tool
    /// Expose the manual `select` entry point (default: false).
    #[serde(alias = "enableTool")]
    pub enable_tool: bool,
    /// Directories scanned by the manual `select` entry point.
    #[serde(alias = "skillsDirs")]
    pub skills_dirs: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exemptions: DEFAULT_EXEMPTIONS.iter().map(|p| (*p).to_string()).collect(),
            router_model: "github-copilot/gpt-5-mini".to_string(),
            generator_url: None,
            generator_token: None,
            semantic_timeout_sec: 30,
            enable_tool: false,
            skills_dirs: vec![
                PathBuf::from(".opencode/skills"),
                dirs::config_dir().map_or_else(
                    || PathBuf::from("~/.config/opencode/skills"),
                    |d| d.join("opencode/skills"),
                ),
            ],
        }
    }
}

impl Config {
    /// Load config from a key=value file, merging with defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.load_file(path)?;
        Ok(config)
    }

    /// Parse a host-supplied JSON object. Missing fields take their defaults;
    /// unknown keys are reported and skipped.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        if let Value::Object(map) = &value {
            for key in unknown_json_keys(map) {
                eprintln!("Warning: unknown config key: {key}");
            }
        }
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidJson(e.to_string()))
    }

    /// Load and merge values from a config file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    /// Parse config content (key=value format).
    fn parse_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let trimmed = line.trim();

            // Skip empty lines and comments
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine(line.to_string()));
            };

            self.apply_value(key.trim(), unquote(value.trim()))?;
        }
        Ok(())
    }

    /// Apply a single config value.
    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "exemptions" => self.exemptions = split_list(value).map(String::from).collect(),
            "router_model" => self.router_model = value.to_string(),
            "generator_url" => self.generator_url = non_empty(value),
            "generator_token" => self.generator_token = non_empty(value),
            "semantic_timeout_sec" => {
                self.semantic_timeout_sec = value.parse().map_err(|_| ConfigError::InvalidInt {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "enable_tool" => self.enable_tool = Self::parse_bool(key, value)?,
            "skills_dirs" => {
                self.skills_dirs = split_list(value).map(expand_home).collect();
            }
            _ => {
                // Warn but don't fail for unknown keys
                eprintln!("Warning: unknown config key: {key}");
            }
        }
        Ok(())
    }

    /// Parse a boolean value.
    fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "on" => Ok(true),
            "false" | "0" | "no" | "n" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Resolve relative skills directories against a workspace root.
    pub fn resolve_paths(&mut self, workspace_root: &Path) {
        self.skills_dirs = self
            .skills_dirs
            .iter()
            .map(|path| {
                if path.is_relative() {
                    workspace_root.join(path)
                } else {
                    path.clone()
                }
            })
            .collect();
    }
}

/// Field names accepted by [`Config::from_json`], host aliases included.
const JSON_KEYS: &[&str] = &[
    "exemptions",
    "router_model",
    "routerModel",
    "generator_url",
    "generatorUrl",
    "generator_token",
    "generatorToken",
    "semantic_timeout_sec",
    "semanticTimeoutSec",
    "enable_tool",
    "enableTool",
    "skills_dirs",
    "skillsDirs",
];

fn unknown_json_keys(map: &Map<String, Value>) -> Vec<&str> {
    map.keys()
        .map(String::as_str)
        .filter(|key| !JSON_KEYS.contains(key))
        .collect()
}

/// Split a list value on whitespace and commas.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

/// Minimal user directory lookup, kept local to avoid a dependency in the core crate.
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join(".config")))
    }

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}
