//! CLI route: single route table and run context.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_config, format_decoded_text, format_mirror_json, format_mirror_text,
};
use crate::config::{ConfigLoader, TreeglassConfig};
use crate::error::AgentError;
use crate::mirror::MirrorTree;
use crate::ops::decode_operations;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and effective config.
pub struct RunContext {
    workspace_root: PathBuf,
    config: TreeglassConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, AgentError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &TreeglassConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, AgentError> {
        match command {
            Commands::Decode { file, format } => self.decode(file, format),
            Commands::Replay { file, format } => self.replay(file, format),
            Commands::Config { format } => format_config(&self.config, format),
        }
    }

    fn decode(&self, file: &Path, format: &str) -> Result<String, AgentError> {
        let payload: Vec<u32> = read_json(&self.resolve(file))?;
        let message = decode_operations(&payload)?;
        debug!(
            source_id = message.source_id,
            operations = message.operations.len(),
            "decoded payload"
        );
        if format == "json" {
            return Ok(serde_json::to_string_pretty(&message)?);
        }
        Ok(format_decoded_text(&message))
    }

    fn replay(&self, file: &Path, format: &str) -> Result<String, AgentError> {
        let payloads: Vec<Vec<u32>> = read_json(&self.resolve(file))?;
        let mut mirror = MirrorTree::new();
        for payload in &payloads {
            mirror.apply(payload)?;
        }
        info!(payloads = payloads.len(), "replayed operations");
        if format == "json" {
            return format_mirror_json(&mirror);
        }
        Ok(format_mirror_text(&mirror))
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.workspace_root.join(file)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AgentError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
