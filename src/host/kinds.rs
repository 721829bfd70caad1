//! Versioned kind tables
//!
//! Hosts expose an integer kind tag whose numbering changes between schema
//! versions. At attach time the provider builds one [`KindTable`] for the
//! detected schema; everything downstream dispatches on [`NodeKind`] only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical node kind, independent of the host schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Class,
    Function,
    ForwardRef,
    Memo,
    SimpleMemo,
    Lazy,
    Host,
    Text,
    Fragment,
    Mode,
    Portal,
    ContextProvider,
    ContextConsumer,
    Profiler,
    Suspense,
    SuspenseList,
    Offscreen,
    LegacyHidden,
    Dehydrated,
    Unknown,
}

impl NodeKind {
    /// Element type reported to the inspector.
    pub fn element_type(self) -> ElementType {
        match self {
            NodeKind::Root => ElementType::Root,
            NodeKind::Class => ElementType::Class,
            NodeKind::Function | NodeKind::Lazy => ElementType::Function,
            NodeKind::ForwardRef => ElementType::ForwardRef,
            NodeKind::Memo | NodeKind::SimpleMemo => ElementType::Memo,
            NodeKind::Host => ElementType::Host,
            NodeKind::ContextProvider | NodeKind::ContextConsumer => ElementType::Context,
            NodeKind::Profiler => ElementType::Profiler,
            NodeKind::Suspense => ElementType::Suspense,
            NodeKind::SuspenseList => ElementType::SuspenseList,
            NodeKind::Text
            | NodeKind::Fragment
            | NodeKind::Mode
            | NodeKind::Portal
            | NodeKind::Offscreen
            | NodeKind::LegacyHidden
            | NodeKind::Dehydrated
            | NodeKind::Unknown => ElementType::Other,
        }
    }

    /// Kinds that never appear in the mirror regardless of user filters.
    ///
    /// Fragments are structural only when unkeyed; the caller checks the key.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Mode
                | NodeKind::Portal
                | NodeKind::Offscreen
                | NodeKind::LegacyHidden
                | NodeKind::Dehydrated
        )
    }

    /// Node with exactly two mutually exclusive child subtrees
    /// (`[primary, fallback]`), only one of which is walked.
    pub fn is_collapsible(self) -> bool {
        matches!(self, NodeKind::Suspense)
    }
}

/// Wire codes for element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum ElementType {
    Class = 1,
    Context = 2,
    Function = 5,
    ForwardRef = 6,
    Host = 7,
    Memo = 8,
    Other = 9,
    Profiler = 10,
    Root = 11,
    Suspense = 12,
    SuspenseList = 13,
}

impl ElementType {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => ElementType::Class,
            2 => ElementType::Context,
            5 => ElementType::Function,
            6 => ElementType::ForwardRef,
            7 => ElementType::Host,
            8 => ElementType::Memo,
            9 => ElementType::Other,
            10 => ElementType::Profiler,
            11 => ElementType::Root,
            12 => ElementType::Suspense,
            13 => ElementType::SuspenseList,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Class => "class",
            ElementType::Context => "context",
            ElementType::Function => "function",
            ElementType::ForwardRef => "forward_ref",
            ElementType::Host => "host",
            ElementType::Memo => "memo",
            ElementType::Other => "other",
            ElementType::Profiler => "profiler",
            ElementType::Root => "root",
            ElementType::Suspense => "suspense",
            ElementType::SuspenseList => "suspense_list",
        }
    }
}

/// Lowest and highest host schema versions with a kind table.
pub const MIN_SCHEMA_VERSION: u32 = 1;
pub const MAX_SCHEMA_VERSION: u32 = 3;

const SCHEMA_V1: &[(u32, NodeKind)] = &[
    (0, NodeKind::Function),
    (2, NodeKind::Class),
    (4, NodeKind::Function),
    (5, NodeKind::Root),
    (6, NodeKind::Portal),
    (7, NodeKind::Host),
    (8, NodeKind::Text),
    (9, NodeKind::Fragment),
    (10, NodeKind::Mode),
    (11, NodeKind::ContextConsumer),
    (12, NodeKind::ContextProvider),
    (13, NodeKind::ForwardRef),
    (15, NodeKind::Profiler),
    (16, NodeKind::Suspense),
];

const SCHEMA_V2: &[(u32, NodeKind)] = &[
    (0, NodeKind::Function),
    (1, NodeKind::Class),
    (2, NodeKind::Function),
    (3, NodeKind::Root),
    (4, NodeKind::Portal),
    (5, NodeKind::Host),
    (6, NodeKind::Text),
    (7, NodeKind::Fragment),
    (8, NodeKind::Mode),
    (9, NodeKind::ContextConsumer),
    (10, NodeKind::ContextProvider),
    (11, NodeKind::ForwardRef),
    (12, NodeKind::Profiler),
    (13, NodeKind::Suspense),
    (14, NodeKind::Memo),
    (15, NodeKind::SimpleMemo),
    (16, NodeKind::Lazy),
    (17, NodeKind::Class),
    (18, NodeKind::Dehydrated),
    (19, NodeKind::SuspenseList),
];

const SCHEMA_V3_EXTRA: &[(u32, NodeKind)] = &[(22, NodeKind::Offscreen), (23, NodeKind::LegacyHidden)];

/// Host tag -> canonical kind lookup for one schema version.
#[derive(Debug, Clone)]
pub struct KindTable {
    schema_version: u32,
    by_tag: HashMap<u32, NodeKind>,
    tag_of: HashMap<NodeKind, u32>,
}

impl KindTable {
    /// Build the table for `schema_version`, or `None` if unsupported.
    pub fn for_schema(schema_version: u32) -> Option<Self> {
        let entries: Vec<(u32, NodeKind)> = match schema_version {
            1 => SCHEMA_V1.to_vec(),
            2 => SCHEMA_V2.to_vec(),
            3 => SCHEMA_V2.iter().chain(SCHEMA_V3_EXTRA).copied().collect(),
            _ => return None,
        };
        let mut by_tag = HashMap::with_capacity(entries.len());
        let mut tag_of = HashMap::with_capacity(entries.len());
        for (tag, kind) in entries {
            by_tag.insert(tag, kind);
            tag_of.entry(kind).or_insert(tag);
        }
        Some(Self {
            schema_version,
            by_tag,
            tag_of,
        })
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn kind_of(&self, tag: u32) -> NodeKind {
        self.by_tag.get(&tag).copied().unwrap_or(NodeKind::Unknown)
    }

    /// Host tag used for `kind` in this schema, if the schema has one.
    pub fn tag_for(&self, kind: NodeKind) -> Option<u32> {
        self.tag_of.get(&kind).copied()
    }
}
