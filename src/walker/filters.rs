//! Component filters
//!
//! Filtering is a view concern: a filtered node is still walked so its
//! descendants are reached, but it is not added to the mirror and its
//! visible children attach to the nearest unfiltered ancestor.

use crate::error::AgentError;
use crate::host::{ElementType, NodeKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

fn default_true() -> bool {
    true
}

/// A user-facing filter, as sent by the inspector or set in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentFilter {
    /// Hide every node of an element type.
    ElementType {
        value: ElementType,
        #[serde(default = "default_true")]
        is_enabled: bool,
    },
    /// Hide nodes whose display name matches a regex.
    DisplayName {
        value: String,
        #[serde(default = "default_true")]
        is_enabled: bool,
    },
    /// Hide nodes whose source location matches a regex.
    Location {
        value: String,
        #[serde(default = "default_true")]
        is_enabled: bool,
    },
    /// Hide higher-order wrappers such as `withRouter(Page)`.
    Hoc {
        #[serde(default = "default_true")]
        is_enabled: bool,
    },
}

impl ComponentFilter {
    pub fn is_enabled(&self) -> bool {
        match self {
            ComponentFilter::ElementType { is_enabled, .. }
            | ComponentFilter::DisplayName { is_enabled, .. }
            | ComponentFilter::Location { is_enabled, .. }
            | ComponentFilter::Hoc { is_enabled } => *is_enabled,
        }
    }

    /// Reject regex filters that do not compile.
    pub fn validate(&self) -> Result<(), AgentError> {
        match self {
            ComponentFilter::DisplayName { value, .. } | ComponentFilter::Location { value, .. } => {
                Regex::new(value)
                    .map(|_| ())
                    .map_err(|e| AgentError::InvalidFilter(format!("{value}: {e}")))
            }
            _ => Ok(()),
        }
    }
}

/// Filters shipped by default: host elements are hidden.
pub fn default_filters() -> Vec<ComponentFilter> {
    vec![ComponentFilter::ElementType {
        value: ElementType::Host,
        is_enabled: true,
    }]
}

/// Compiled filter set, evaluated in a fixed short-circuit order.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    hidden_types: HashSet<ElementType>,
    display_names: Vec<Regex>,
    locations: Vec<Regex>,
    hide_hocs: bool,
}

/// The facts a filter decision is made from.
#[derive(Debug, Clone, Copy)]
pub struct FilterSubject<'a> {
    pub kind: NodeKind,
    pub key: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub source_location: Option<&'a str>,
}

impl FilterSet {
    /// Compile enabled filters. Invalid regexes are skipped with a warning.
    pub fn compile(filters: &[ComponentFilter]) -> Self {
        let mut set = FilterSet::default();
        for filter in filters.iter().filter(|f| f.is_enabled()) {
            match filter {
                ComponentFilter::ElementType { value, .. } => {
                    set.hidden_types.insert(*value);
                }
                ComponentFilter::DisplayName { value, .. } => match Regex::new(value) {
                    Ok(re) => set.display_names.push(re),
                    Err(e) => warn!(pattern = %value, error = %e, "skipping invalid display name filter"),
                },
                ComponentFilter::Location { value, .. } => match Regex::new(value) {
                    Ok(re) => set.locations.push(re),
                    Err(e) => warn!(pattern = %value, error = %e, "skipping invalid location filter"),
                },
                ComponentFilter::Hoc { .. } => set.hide_hocs = true,
            }
        }
        set
    }

    pub fn is_filtered(&self, subject: FilterSubject<'_>) -> bool {
        if subject.kind == NodeKind::Root {
            return false;
        }
        if subject.kind.is_structural()
            || (subject.kind == NodeKind::Fragment && subject.key.is_none())
        {
            return true;
        }
        if self.hidden_types.contains(&subject.kind.element_type()) {
            return true;
        }
        if let Some(name) = subject.display_name {
            if self.display_names.iter().any(|re| re.is_match(name)) {
                return true;
            }
        }
        if let Some(location) = subject.source_location {
            if self.locations.iter().any(|re| re.is_match(location)) {
                return true;
            }
        }
        self.hide_hocs && subject.display_name.is_some_and(is_hoc_display_name)
    }
}

/// `Outer(Inner)`-shaped names produced by higher-order wrappers.
pub fn is_hoc_display_name(name: &str) -> bool {
    match (name.find('('), name.ends_with(')')) {
        (Some(open), true) => open > 0 && open + 2 < name.len(),
        _ => false,
    }
}

/// Split `withA(withB(Inner))` into `("Inner", ["withA", "withB"])`.
pub fn split_hoc_names(name: &str) -> (&str, Vec<&str>) {
    let mut hocs = Vec::new();
    let mut current = name;
    while is_hoc_display_name(current) {
        let open = current.find('(').unwrap_or(0);
        hocs.push(&current[..open]);
        current = &current[open + 1..current.len() - 1];
    }
    (current, hocs)
}
