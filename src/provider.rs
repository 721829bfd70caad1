//! Provider registration
//!
//! A provider is one attached tree source. Supported providers get their
//! own [`Walker`]; a provider whose schema has no kind table is kept for
//! bookkeeping only and is never walked.

use crate::clock::Clock;
use crate::host::{KindTable, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION};
use crate::types::SourceId;
use crate::walker::{Capabilities, ComponentFilter, Walker, WalkerOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// What a host declares when it attaches a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRegistration {
    pub source_id: SourceId,
    pub schema_version: u32,
    #[serde(default)]
    pub capabilities: Capabilities,
}

pub enum Provider {
    Supported {
        registration: ProviderRegistration,
        walker: Box<Walker>,
    },
    Unsupported(ProviderRegistration),
}

impl Provider {
    /// Build the per-provider context, choosing the kind table once.
    pub fn attach(
        registration: ProviderRegistration,
        filters: &[ComponentFilter],
        options: WalkerOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        match KindTable::for_schema(registration.schema_version) {
            Some(kinds) => {
                info!(
                    source_id = registration.source_id,
                    schema_version = registration.schema_version,
                    "provider attached"
                );
                let walker = Walker::new(
                    registration.source_id,
                    kinds,
                    registration.capabilities,
                    filters,
                    options,
                    clock,
                );
                Provider::Supported {
                    registration,
                    walker: Box::new(walker),
                }
            }
            None => {
                warn!(
                    source_id = registration.source_id,
                    schema_version = registration.schema_version,
                    supported = %format!("{MIN_SCHEMA_VERSION}..={MAX_SCHEMA_VERSION}"),
                    "provider schema unsupported; not walking"
                );
                Provider::Unsupported(registration)
            }
        }
    }

    pub fn registration(&self) -> &ProviderRegistration {
        match self {
            Provider::Supported { registration, .. } | Provider::Unsupported(registration) => {
                registration
            }
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Provider::Supported { .. })
    }

    pub fn walker(&self) -> Option<&Walker> {
        match self {
            Provider::Supported { walker, .. } => Some(&**walker),
            Provider::Unsupported(_) => None,
        }
    }

    pub fn walker_mut(&mut self) -> Option<&mut Walker> {
        match self {
            Provider::Supported { walker, .. } => Some(&mut **walker),
            Provider::Unsupported(_) => None,
        }
    }
}
