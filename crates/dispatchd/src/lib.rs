//! dispatchd - Zesty Dispatcher daemon
//!
//! Library components for the daemon process: the semantic collaborator,
//! skill selection, and the [`Dispatcher`] boundary that rewrites a host's
//! record list in place.

pub mod catalog;
pub mod generator;
pub mod recommend;
pub mod selector;
pub mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dispatch_core::config::ConfigError;
use dispatch_core::manifest::ManifestGroups;
use dispatch_core::{report_record, Candidate, Config, RewriteOutcome, SelectionResult, TransformEvent};
use generator::{HttpTextGenerator, TextGenerator};
use recommend::SemanticRecommender;
use selector::Selector;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Workspace-relative config file, used when no `--config` is given.
pub const CONFIG_FILE: &str = ".zesty/config";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 7710;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("selection task aborted: {0}")]
    SelectionAborted(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rewrites record lists down to the skills relevant to the current query.
#[derive(Debug)]
pub struct Dispatcher {
    selector: Arc<Selector>,
}

impl Dispatcher {
    pub fn new(config: &Config, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        let recommender = SemanticRecommender::from_config(config, generator);
        Self {
            selector: Arc::new(Selector::from_config(config, recommender)),
        }
    }

    /// Build with the HTTP collaborator when `generator_url` is configured.
    pub fn from_config(config: &Config) -> Self {
        let generator = HttpTextGenerator::from_config(config).map(|g| {
            info!(url = g.url(), model = %config.router_model, "semantic lookup enabled");
            Arc::new(g) as Arc<dyn TextGenerator>
        });
        if generator.is_none() {
            info!("no generator_url configured, semantic lookup disabled");
        }
        Self::new(config, generator)
    }

    /// Run a selection outside the transform path (manual `select`).
    pub async fn select(&self, query: &str, candidates: &[Candidate]) -> SelectionResult {
        self.selector.select(query, candidates).await
    }

    /// Rewrite `event.records` in place.
    ///
    /// The list is replaced with a single assignment after selection has
    /// finished. Every other outcome leaves it exactly as it was.
    pub async fn transform(&self, event: &mut TransformEvent) -> RewriteOutcome {
        match self.try_transform(event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "skill selection failed, records left unchanged");
                RewriteOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_transform(
        &self,
        event: &mut TransformEvent,
    ) -> Result<RewriteOutcome, DispatchError> {
        let Some(query) = event.query() else {
            debug!("no user query, skipping transform");
            return Ok(RewriteOutcome::NoQuery);
        };

        let groups = ManifestGroups::from_records(event.records.clone());
        let candidates = groups.candidates();
        if candidates.is_empty() {
            debug!(records = groups.len(), "no skill records, skipping transform");
            return Ok(RewriteOutcome::NoCandidates);
        }

        let selection = self.spawn_selection(query, candidates).await?;

        let before = groups.len();
        let mut rebuilt = groups.rebuild(&selection.selected);
        let removed = before - rebuilt.len();
        let report = report_record(&selection);
        let report_appended = report.is_some();
        rebuilt.extend(report);

        event.records = rebuilt;

        let selected: Vec<String> = selection.selected.into_iter().collect();
        info!(
            selected = ?selected,
            removed,
            records = event.records.len(),
            "records rewritten"
        );
        Ok(RewriteOutcome::Rewritten {
            selected,
            removed,
            report_appended,
        })
    }

    /// Panics inside selection surface as a `JoinError`.
    async fn spawn_selection(
        &self,
        query: String,
        candidates: Vec<Candidate>,
    ) -> Result<SelectionResult, DispatchError> {
        let selector = Arc::clone(&self.selector);
        let handle = tokio::spawn(async move { selector.select(&query, &candidates).await });
        Ok(handle.await?)
    }
}

/// User-level config file (`~/.config/zesty/config` on Linux).
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("zesty").join("config"))
}

/// Load configuration.
///
/// An explicit path is read as JSON when it ends in `.json` and as key=value
/// otherwise. Without one, `<workspace_root>/.zesty/config` is used if it
/// exists, then the user-level file from [`global_config_path`]. Relative
/// skills directories resolve against `workspace_root`.
pub fn load_config(path: Option<&Path>, workspace_root: &Path) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) if path.extension().is_some_and(|ext| ext == "json") => {
            Config::from_json(&std::fs::read_to_string(path)?)?
        }
        Some(path) => Config::from_file(path)?,
        None => {
            let local = workspace_root.join(CONFIG_FILE);
            if local.is_file() {
                Config::from_file(&local)?
            } else if let Some(global) = global_config_path().filter(|p| p.is_file()) {
                Config::from_file(&global)?
            } else {
                Config::default()
            }
        }
    };
    config.resolve_paths(workspace_root);
    Ok(config)
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// HTTP server port (default: 7710).
    pub port: u16,
    /// Auth token for the HTTP API (optional).
    pub auth_token: Option<String>,
    /// Explicit config file; `None` looks for `.zesty/config`.
    pub config_path: Option<PathBuf>,
    pub workspace_root: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: std::env::var("DISPATCHD_AUTH_TOKEN").ok(),
            config_path: None,
            workspace_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Daemon state.
#[derive(Debug)]
pub struct Daemon {
    config: DaemonConfig,
    settings: Arc<Config>,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
}

impl Daemon {
    /// Create a new daemon with the given configuration.
    pub fn new(config: DaemonConfig) -> Result<Self, DispatchError> {
        let settings = load_config(config.config_path.as_deref(), &config.workspace_root)?;
        let dispatcher = Arc::new(Dispatcher::from_config(&settings));
        Ok(Self {
            config,
            settings: Arc::new(settings),
            dispatcher,
            cancel: CancellationToken::new(),
        })
    }

    /// Serve the HTTP API until [`Daemon::shutdown`] is called.
    pub async fn run(&self) -> Result<(), DispatchError> {
        info!("dispatchd starting on port {}", self.config.port);
        info!("workspace: {}", self.config.workspace_root.display());
        info!("exemptions: {}", self.settings.exemptions.join(" "));
        if self.config.auth_token.is_some() {
            info!("auth token: enabled");
        }
        if self.settings.enable_tool {
            info!("manual select endpoint: enabled");
        }

        let state = Arc::new(server::AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            config: Arc::clone(&self.settings),
            auth_token: self.config.auth_token.clone(),
        });
        server::start_server(state, self.config.port, self.cancel.clone()).await?;

        info!("dispatchd stopped");
        Ok(())
    }

    /// Signal the daemon to shut down.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.cancel.cancel();
    }
}
