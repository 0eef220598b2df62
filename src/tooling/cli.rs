//! CLI Tooling
//!
//! Command-line interface over the private store: list the tree, import
//! files, duplicate an entry, clear everything.

use crate::config::StashConfig;
use crate::error::StoreError;
use crate::format::humanize_file_size;
use crate::state::Session;
use crate::store::{ImportHandle, StoreRoot};
use crate::tree::{TreeNode, TreeNodeData};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Stash CLI - Local-first private file store
#[derive(Parser)]
#[command(name = "stash")]
#[command(about = "Local-first private file store with background tree synchronization")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store root directory (overrides config and platform default)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enumerate the store into a flat tree listing
    Tree {
        /// Start from a subdirectory of the store root
        #[arg(long)]
        dir: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Import files into the store by path
    Add {
        /// Source files to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Duplicate a store entry under a fresh name
    Duplicate {
        /// Entry name as shown by `tree`
        name: String,
    },
    /// Remove every entry from the store
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// CLI context holding the opened store.
pub struct CliContext {
    store: StoreRoot,
}

impl CliContext {
    /// Load configuration and open the store once.
    pub async fn new(
        root: Option<PathBuf>,
        config_path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        let config = StashConfig::load(config_path.as_deref())?;
        let root = config.store_root(root.as_deref())?;
        let store = StoreRoot::open(&root).await?;
        info!(root = %root.display(), "store opened");
        Ok(Self { store })
    }

    /// Execute a CLI command, returning the rendered output.
    pub async fn execute(&self, command: &Commands) -> Result<String, StoreError> {
        let mut session = Session::new(self.store.clone());
        let result = self.execute_inner(&mut session, command).await;
        session.shutdown().await;
        result
    }

    async fn execute_inner(
        &self,
        session: &mut Session,
        command: &Commands,
    ) -> Result<String, StoreError> {
        match command {
            Commands::Tree { dir, format } => {
                let tree = session.refresh_from(dir.clone()).await?;
                if format == "json" {
                    Ok(render_tree_json(&tree))
                } else {
                    Ok(render_tree_table(&tree))
                }
            }
            Commands::Add { paths } => {
                let handles = paths.iter().map(ImportHandle::new).collect::<Vec<_>>();
                let count = session.add_file_handles(handles).await?;
                let noun = if count == 1 { "file" } else { "files" };
                Ok(format!(
                    "{} {count} {noun} added",
                    "Success!".green().bold()
                ))
            }
            Commands::Duplicate { name } => {
                let tree = session.refresh().await?;
                let node = tree
                    .iter()
                    .rev()
                    .find(|n| n.name == *name)
                    .ok_or_else(|| StoreError::EntryNotFound(name.clone()))?;
                let handle = node.data.handle.clone();
                let new_handle = session.duplicate(handle).await?;
                Ok(format!(
                    "{} added {} to your files",
                    "Success!".green().bold(),
                    new_handle.name()
                ))
            }
            Commands::Clear { yes } => {
                if !*yes {
                    let confirmed = dialoguer::Confirm::new()
                        .with_prompt("Remove every file in the store?")
                        .default(false)
                        .interact()
                        .map_err(|e| StoreError::Config(format!("failed to get user input: {e}")))?;
                    if !confirmed {
                        return Ok("Clear cancelled".to_string());
                    }
                }
                session.clear_all().await?;
                Ok("Files removed".to_string())
            }
        }
    }
}

fn render_tree_json(tree: &[TreeNode<TreeNodeData>]) -> String {
    let total_size: u64 = tree.iter().map(|n| n.data.file_size).sum();
    let output = json!({
        "total": tree.len(),
        "total_size": total_size,
        "files": tree,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

fn render_tree_table(tree: &[TreeNode<TreeNodeData>]) -> String {
    if tree.is_empty() {
        return "The store is empty".to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Size", "Type", "Modified"]);
    for node in tree {
        table.add_row(vec![
            Cell::new(&node.name),
            Cell::new(humanize_file_size(node.data.file_size, false)),
            Cell::new(&node.data.file_type),
            Cell::new(format_modified(node.data.last_modified)),
        ]);
    }

    let total_size: u64 = tree.iter().map(|n| n.data.file_size).sum();
    let noun = if tree.len() == 1 { "file" } else { "files" };
    format!(
        "{table}\n{} {noun}, {}",
        tree.len(),
        humanize_file_size(total_size, false)
    )
}

fn format_modified(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn tree_json_contract_has_required_fields() {
        let temp = TempDir::new().unwrap();
        let context = CliContext::new(Some(temp.path().join("store")), None)
            .await
            .unwrap();

        let source = temp.path().join("a.jpg");
        std::fs::write(&source, vec![0u8; 100]).unwrap();
        context
            .execute(&Commands::Add {
                paths: vec![source],
            })
            .await
            .unwrap();

        let output = context
            .execute(&Commands::Tree {
                dir: None,
                format: "json".to_string(),
            })
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.get("total").and_then(|v| v.as_u64()), Some(1));
        assert_eq!(parsed.get("total_size").and_then(|v| v.as_u64()), Some(100));
        let files = parsed
            .get("files")
            .and_then(|v| v.as_array())
            .expect("files array should exist");
        assert_eq!(files[0].get("name").and_then(|v| v.as_str()), Some("a.jpg"));
        assert!(files[0]["data"].get("fileSize").is_some());
        assert!(files[0]["data"].get("handle").is_none());
    }

    #[tokio::test]
    async fn clear_with_yes_empties_the_store() {
        let temp = TempDir::new().unwrap();
        let context = CliContext::new(Some(temp.path().join("store")), None)
            .await
            .unwrap();

        let source = temp.path().join("b.png");
        std::fs::write(&source, b"png").unwrap();
        context
            .execute(&Commands::Add {
                paths: vec![source],
            })
            .await
            .unwrap();

        context.execute(&Commands::Clear { yes: true }).await.unwrap();

        let output = context
            .execute(&Commands::Tree {
                dir: None,
                format: "json".to_string(),
            })
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.get("total").and_then(|v| v.as_u64()), Some(0));
    }

    #[tokio::test]
    async fn duplicate_of_unknown_entry_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let context = CliContext::new(Some(temp.path().join("store")), None)
            .await
            .unwrap();
        let err = context
            .execute(&Commands::Duplicate {
                name: "ghost.jpg".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EntryNotFound(_)));
    }
}
