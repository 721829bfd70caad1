//! Wire envelope shared by both directions of the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names sent to the inspector.
pub mod events {
    pub const OPERATIONS: &str = "operations";
    pub const SHUTDOWN: &str = "shutdown";
    pub const PROVIDER_ATTACHED: &str = "providerAttached";
    pub const PROVIDER_DETACHED: &str = "providerDetached";
    pub const UNSUPPORTED_PROVIDER: &str = "unsupportedProvider";
    pub const INSPECTED_NODE: &str = "inspectedNode";
    pub const PROFILING_DATA: &str = "profilingData";
    pub const SELECT_NODE: &str = "selectNode";
    pub const BRIDGE_PROTOCOL: &str = "bridgeProtocol";
}

/// Transport-agnostic message: an event name and positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub payload: Vec<Value>,
}

impl Envelope {
    pub fn new(event: impl Into<String>, payload: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Envelope carrying one flushed operations message.
    pub fn operations(message: &[u32]) -> Self {
        Self::new(
            events::OPERATIONS,
            vec![Value::Array(message.iter().map(|v| Value::from(*v)).collect())],
        )
    }

    /// Integer payload of an `operations` envelope.
    pub fn operations_payload(&self) -> Option<Vec<u32>> {
        if self.event != events::OPERATIONS {
            return None;
        }
        self.payload.first()?.as_array()?.iter().map(as_u32).collect()
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|v| u32::try_from(v).ok())
}
