//! dispatchctl - CLI client for dispatchd
//!
//! Probes the daemon, runs manual selections, and replays saved transform
//! events.

mod client;
mod render;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use client::{Client, ClientError};
use dispatch_core::TransformEvent;
use serde::Serialize;

/// CLI client for the dispatchd skill dispatcher.
#[derive(Parser)]
#[command(name = "dispatchctl")]
#[command(about = "Control client for the dispatchd skill dispatcher")]
#[command(version)]
struct Cli {
    /// Daemon address (default: http://127.0.0.1:7710)
    #[arg(long, global = true, env = "DISPATCHD_ADDR")]
    addr: Option<String>,

    /// Auth token for daemon API
    #[arg(long, global = true, env = "DISPATCHD_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the daemon is up
    Health,

    /// Score installed skills against a query (requires enable_tool)
    Select {
        /// The query to select skills for
        query: String,

        /// Skills directory to scan instead of the configured ones (repeatable)
        #[arg(long = "skills-dir")]
        skills_dirs: Vec<PathBuf>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Run a saved transform event through the daemon
    Transform {
        /// Path to a JSON file holding `{ messages, records }`
        event: PathBuf,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let addr = cli
        .addr
        .unwrap_or_else(|| "http://127.0.0.1:7710".to_string());
    let client = Client::new(&addr, cli.token.as_deref());

    // Health reports a down daemon itself instead of waiting for it.
    if !matches!(cli.command, Command::Health) {
        if let Err(e) = client.wait_for_ready().await {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Command::Health => run_health(&client).await,
        Command::Select {
            query,
            skills_dirs,
            json,
        } => run_select(&client, &query, skills_dirs, json).await,
        Command::Transform { event, json } => run_transform(&client, &event, json).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_health(client: &Client) -> Result<(), ClientError> {
    if client.check_health().await? {
        println!("dispatchd is healthy at {}", client.addr());
        Ok(())
    } else {
        Err(ClientError::HttpError {
            status: 0,
            message: format!("unhealthy response from {}", client.addr()),
        })
    }
}

async fn run_select(
    client: &Client,
    query: &str,
    skills_dirs: Vec<PathBuf>,
    json: bool,
) -> Result<(), ClientError> {
    let dirs = (!skills_dirs.is_empty()).then(|| absolute_dirs(skills_dirs));
    let response = client.select(query, dirs).await?;
    if json {
        print_json(&response)
    } else {
        render::print_selection(&response);
        Ok(())
    }
}

async fn run_transform(client: &Client, path: &Path, json: bool) -> Result<(), ClientError> {
    let event = read_event(path)?;
    let response = client.transform(&event).await?;
    if json {
        print_json(&response)
    } else {
        render::print_transform(&response);
        Ok(())
    }
}

fn read_event(path: &Path) -> Result<TransformEvent, ClientError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ClientError::IoError(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| ClientError::IoError(format!("{}: invalid event JSON: {e}", path.display())))
}

/// The daemon resolves paths against its own working directory.
fn absolute_dirs(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let Ok(cwd) = std::env::current_dir() else {
        return dirs;
    };
    dirs.into_iter()
        .map(|dir| if dir.is_relative() { cwd.join(dir) } else { dir })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn select_collects_repeated_dirs() {
        let cli = Cli::parse_from([
            "dispatchctl",
            "select",
            "fill a pdf",
            "--skills-dir",
            "/a",
            "--skills-dir",
            "/b",
        ]);
        match cli.command {
            Command::Select {
                query, skills_dirs, ..
            } => {
                assert_eq!(query, "fill a pdf");
                assert_eq!(skills_dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn relative_dirs_become_absolute() {
        let dirs = absolute_dirs(vec![PathBuf::from("skills"), PathBuf::from("/abs")]);
        assert!(dirs[0].is_absolute());
        assert_eq!(dirs[1], PathBuf::from("/abs"));
    }

    #[test]
    fn read_event_parses_saved_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("event.json");
        std::fs::write(
            &path,
            r#"{"messages": [{"role": "user", "content": "hi"}], "records": ["skills/pdf/SKILL.md"]}"#,
        )
        .unwrap();

        let event = read_event(&path).unwrap();
        assert_eq!(event.query().as_deref(), Some("hi"));
        assert_eq!(event.records.len(), 1);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_event(&path), Err(ClientError::IoError(_))));
    }
}
