//! CLI presentation: text and json formatters.

use crate::config::TreeglassConfig;
use crate::error::AgentError;
use crate::mirror::MirrorTree;
use crate::ops::{DecodedMessage, Operation};
use crate::types::StableId;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde_json::json;

fn join_ids(ids: &[StableId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn string_or_dash(message: &DecodedMessage, id: u32) -> String {
    match message.string(id) {
        Ok(Some(value)) => value.to_string(),
        Ok(None) => "-".to_string(),
        Err(_) => format!("<bad string id {}>", id),
    }
}

fn describe(message: &DecodedMessage, op: &Operation) -> String {
    match op {
        Operation::Add {
            element_type,
            parent_id,
            owner_id,
            name_id,
            key_id,
            ..
        } => format!(
            "{:?} {} key={} parent={} owner={}",
            element_type,
            string_or_dash(message, *name_id),
            string_or_dash(message, *key_id),
            parent_id,
            owner_id.map_or_else(|| "-".to_string(), |o| o.to_string()),
        ),
        Operation::AddRoot { flags, .. } => format!("flags={:#b}", flags),
        Operation::Remove { ids } => join_ids(ids),
        Operation::RemoveRoot => format!("root={}", message.root_id),
        Operation::Reorder { children, .. } => join_ids(children),
        Operation::SetSubtreeMode { mode, .. } => format!("mode={}", mode),
        Operation::UpdateDuration { duration, .. } => format!("{}us", duration),
        Operation::UpdateErrorWarningCounts {
            errors, warnings, ..
        } => format!("errors={} warnings={}", errors, warnings),
    }
}

fn op_id(op: &Operation) -> String {
    match op {
        Operation::Add { id, .. }
        | Operation::AddRoot { id, .. }
        | Operation::Reorder { id, .. }
        | Operation::SetSubtreeMode { id, .. }
        | Operation::UpdateDuration { id, .. }
        | Operation::UpdateErrorWarningCounts { id, .. } => id.to_string(),
        Operation::Remove { .. } | Operation::RemoveRoot => "-".to_string(),
    }
}

/// One row per operation under a header line naming source and root.
pub fn format_decoded_text(message: &DecodedMessage) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Op", "Id", "Details"]);
    for (index, op) in message.operations.iter().enumerate() {
        table.add_row(vec![
            index.to_string(),
            op.name().to_string(),
            op_id(op),
            describe(message, op),
        ]);
    }
    format!(
        "source {} root {} ({} strings)\n{}",
        message.source_id,
        message.root_id,
        message.strings.len(),
        table
    )
}

pub fn format_mirror_text(mirror: &MirrorTree) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Source", "Node", "Id", "Type", "Key", "Errors", "Warnings"]);
    for source_id in mirror.source_ids() {
        for (depth, node) in mirror.walk(source_id) {
            let name = node.display_name.as_deref().unwrap_or("(anonymous)");
            table.add_row(vec![
                source_id.to_string(),
                format!("{}{}", "  ".repeat(depth), name),
                node.id.to_string(),
                format!("{:?}", node.element_type),
                node.key.clone().unwrap_or_else(|| "-".to_string()),
                node.errors.to_string(),
                node.warnings.to_string(),
            ]);
        }
    }
    table.to_string()
}

pub fn format_mirror_json(mirror: &MirrorTree) -> Result<String, AgentError> {
    let sources: Vec<serde_json::Value> = mirror
        .source_ids()
        .into_iter()
        .map(|source_id| {
            let nodes: Vec<_> = mirror
                .walk(source_id)
                .into_iter()
                .map(|(depth, node)| json!({ "depth": depth, "node": node }))
                .collect();
            json!({ "sourceId": source_id, "nodes": nodes })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&sources)?)
}

pub fn format_config(config: &TreeglassConfig, format: &str) -> Result<String, AgentError> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(config)?),
        "toml" => toml::to_string_pretty(config)
            .map_err(|e| AgentError::ConfigError(format!("Failed to render config: {}", e))),
        other => Err(AgentError::ConfigError(format!(
            "Invalid format: {} (must be 'toml' or 'json')",
            other
        ))),
    }
}
