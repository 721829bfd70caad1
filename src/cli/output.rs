//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::AgentError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &AgentError) -> String {
    match e {
        AgentError::Decode(inner) => format!("Malformed operations payload: {}", inner),
        AgentError::Mirror(inner) => format!("Stream is not well formed: {}", inner),
        other => other.to_string(),
    }
}
