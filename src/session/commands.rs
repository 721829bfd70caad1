//! Inbound commands.

use crate::bridge::Envelope;
use crate::error::AgentError;
use crate::host::PathSegment;
use crate::types::{SourceId, StableId};
use crate::walker::ComponentFilter;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A command from the inspector. The envelope's event name selects the
/// variant; its first payload element carries the arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    InspectNode {
        source_id: SourceId,
        node_id: StableId,
        #[serde(default)]
        path: Vec<PathSegment>,
    },
    #[serde(rename_all = "camelCase")]
    OverrideValue {
        source_id: SourceId,
        node_id: StableId,
        path: Vec<PathSegment>,
        value: Value,
    },
    #[serde(rename_all = "camelCase")]
    SetFilters {
        source_id: SourceId,
        filters: Vec<ComponentFilter>,
    },
    #[serde(rename_all = "camelCase")]
    StartProfiling { source_id: SourceId },
    #[serde(rename_all = "camelCase")]
    StopProfiling { source_id: SourceId },
    #[serde(rename_all = "camelCase")]
    SelectNode {
        source_id: SourceId,
        node_id: StableId,
    },
    #[serde(rename_all = "camelCase")]
    ClearErrorsAndWarnings {
        source_id: SourceId,
        #[serde(default)]
        node_id: Option<StableId>,
    },
    GetBridgeProtocol,
    Shutdown,
}

impl Command {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, AgentError> {
        let mut args = match envelope.payload.first() {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(AgentError::MalformedCommand(format!(
                    "{}: expected an argument object, got {other}",
                    envelope.event
                )))
            }
        };
        args.insert("command".into(), Value::String(envelope.event.clone()));
        serde_json::from_value(Value::Object(args))
            .map_err(|e| AgentError::MalformedCommand(format!("{}: {e}", envelope.event)))
    }

    /// Source the command is addressed to, if any.
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            Command::InspectNode { source_id, .. }
            | Command::OverrideValue { source_id, .. }
            | Command::SetFilters { source_id, .. }
            | Command::StartProfiling { source_id }
            | Command::StopProfiling { source_id }
            | Command::SelectNode { source_id, .. }
            | Command::ClearErrorsAndWarnings { source_id, .. } => Some(*source_id),
            Command::GetBridgeProtocol | Command::Shutdown => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::InspectNode { .. } => "inspectNode",
            Command::OverrideValue { .. } => "overrideValue",
            Command::SetFilters { .. } => "setFilters",
            Command::StartProfiling { .. } => "startProfiling",
            Command::StopProfiling { .. } => "stopProfiling",
            Command::SelectNode { .. } => "selectNode",
            Command::ClearErrorsAndWarnings { .. } => "clearErrorsAndWarnings",
            Command::GetBridgeProtocol => "getBridgeProtocol",
            Command::Shutdown => "shutdown",
        }
    }
}
