//! Domain model for the intentgraph property graph
//!
//! Every node except `Workspace` is content-addressed: its identity is the
//! BLAKE3 hash of `kind ‖ "\n" ‖ canonical_json(payload)` (see `crate::cas`),
//! so a payload fully determines its node and insertion is idempotent.
//! Workspaces mutate (head moves, changesets accumulate) and therefore carry
//! a freshly generated identifier instead.
//!
//! Payload field names below are the wire schema; the serde renames are
//! load-bearing because the canonical bytes feed the hash.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Raw length of a node id in bytes (64 hex characters in display form)
pub const NODE_ID_LEN: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════

/// 32-byte node identifier, displayed as 64 lowercase hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    pub fn from_bytes(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::cas::hex_encode(&self.0)
    }

    /// Freshly generated unique id for the non-content-addressed kind
    /// (Workspace): a v4 UUID widened to id length through BLAKE3.
    pub fn random() -> Self {
        let uuid = uuid::Uuid::new_v4();
        Self(*blake3::hash(uuid.as_bytes()).as_bytes())
    }

    /// Parse a full 64-character hex id. Case-insensitive on input,
    /// canonical form is lowercase.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = crate::cas::hex_decode(s)?;
        let arr: [u8; NODE_ID_LEN] = bytes.try_into().map_err(|_| {
            StoreError::invariant(format!("node id must be {} hex chars: '{}'", NODE_ID_LEN * 2, s))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for NodeId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NodeId::from_hex(&s).map_err(|e| D::Error::custom(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Kinds
// ═══════════════════════════════════════════════════════════════════════════

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Snapshot,
    File,
    Symbol,
    ChangeSet,
    ChangeType,
    Module,
    Intent,
    Workspace,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Snapshot => "Snapshot",
            NodeKind::File => "File",
            NodeKind::Symbol => "Symbol",
            NodeKind::ChangeSet => "ChangeSet",
            NodeKind::ChangeType => "ChangeType",
            NodeKind::Module => "Module",
            NodeKind::Intent => "Intent",
            NodeKind::Workspace => "Workspace",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Snapshot" => Ok(NodeKind::Snapshot),
            "File" => Ok(NodeKind::File),
            "Symbol" => Ok(NodeKind::Symbol),
            "ChangeSet" => Ok(NodeKind::ChangeSet),
            "ChangeType" => Ok(NodeKind::ChangeType),
            "Module" => Ok(NodeKind::Module),
            "Intent" => Ok(NodeKind::Intent),
            "Workspace" => Ok(NodeKind::Workspace),
            other => Err(StoreError::invariant(format!("unknown node kind '{}'", other))),
        }
    }

    /// Workspace is the one kind whose payload may be rewritten in place.
    pub fn is_content_addressed(&self) -> bool {
        !matches!(self, NodeKind::Workspace)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed set of edge types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Snapshot→File, File→Symbol
    Contains,
    /// ChangeSet→File, ChangeSet→Symbol
    Modifies,
    /// ChangeSet→ChangeType
    Has,
    /// ChangeSet→Module
    Affects,
    /// ChangeSet→Intent
    HasIntent,
    /// Workspace→ChangeSet
    Includes,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Modifies => "MODIFIES",
            EdgeKind::Has => "HAS",
            EdgeKind::Affects => "AFFECTS",
            EdgeKind::HasIntent => "HAS_INTENT",
            EdgeKind::Includes => "INCLUDES",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "CONTAINS" => Ok(EdgeKind::Contains),
            "MODIFIES" => Ok(EdgeKind::Modifies),
            "HAS" => Ok(EdgeKind::Has),
            "AFFECTS" => Ok(EdgeKind::Affects),
            "HAS_INTENT" => Ok(EdgeKind::HasIntent),
            "INCLUDES" => Ok(EdgeKind::Includes),
            other => Err(StoreError::invariant(format!("unknown edge type '{}'", other))),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Rows
// ═══════════════════════════════════════════════════════════════════════════

/// A stored node: kind + canonical payload + commit timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub payload: serde_json::Value,
    pub created_at: i64,
}

/// A directed, typed edge. `at` is an optional context tag (another node id)
/// scoping the edge; the primary key is the full 4-tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub src: NodeId,
    pub kind: EdgeKind,
    pub dst: NodeId,
    pub at: Option<NodeId>,
    pub created_at: i64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Source locations
// ═══════════════════════════════════════════════════════════════════════════

/// 0-based (row, column) position; serializes as `[row, col]`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Point(pub u32, pub u32);

impl Point {
    pub fn row(&self) -> u32 {
        self.0
    }

    pub fn col(&self) -> u32 {
        self.1
    }
}

/// Half-open-in-spirit source range; serializes as `{"end":[l,c],"start":[l,c]}`
/// under canonical key ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

impl Span {
    pub fn new(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start: Point(start_row, start_col),
            end: Point(end_row, end_col),
        }
    }

    /// True iff `a.start <= b.end && b.start <= a.end` under lexicographic
    /// (row, col) ordering.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Payloads (wire schema)
// ═══════════════════════════════════════════════════════════════════════════

/// Symbol kinds recognized by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Variable,
    Constant,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
        }
    }
}

/// Snapshot node payload. `manifest` is the BLAKE3 digest of the sorted
/// (path, digest) list — the content identity that lets a re-capture of
/// identical bytes land on the existing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub source_type: String,
    pub source_ref: String,
    pub file_count: u64,
    pub created_at: i64,
    pub manifest: String,
}

/// File node payload. `digest` is the hex BLAKE3 of the file content,
/// which doubles as the blob key in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub path: String,
    pub digest: String,
    pub size: u64,
    pub lang: String,
}

/// Symbol node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolPayload {
    #[serde(rename = "fqName")]
    pub fq_name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub range: Span,
}

/// ChangeSet node payload; `base`/`head` are hex Snapshot ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetPayload {
    pub base: String,
    pub head: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

/// Match evidence attached to a ChangeType: after-side file ranges plus the
/// ids of Symbol nodes overlapping them. For function add/remove the bare
/// name is prepended as `name:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Evidence {
    #[serde(rename = "fileRanges")]
    pub file_ranges: Vec<Span>,
    pub symbols: Vec<String>,
}

/// ChangeType node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTypePayload {
    pub category: String,
    pub evidence: Evidence,
}

/// Module node payload; immutable per (name, patterns) tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePayload {
    pub name: String,
    pub patterns: Vec<String>,
}

/// Intent node payload. A new node is written per update; the previous
/// HAS_INTENT edge is retargeted rather than the text mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentPayload {
    pub text: String,
    #[serde(rename = "changeSetID")]
    pub change_set_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// Workspace node payload — the one mutable payload in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePayload {
    pub name: String,
    pub status: String,
    pub base_snapshot: String,
    pub head_snapshot: String,
    pub change_sets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_hex_roundtrip() {
        let id = NodeId::from_bytes([0xab; 32]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(NodeId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn test_node_id_case_insensitive_parse() {
        let id = NodeId::from_bytes([0xcd; 32]);
        let upper = id.to_hex().to_uppercase();
        assert_eq!(NodeId::from_hex(&upper).unwrap(), id);
    }

    #[test]
    fn test_node_id_rejects_wrong_length() {
        assert!(NodeId::from_hex("ab12").is_err());
        assert!(NodeId::from_hex(&"f".repeat(63)).is_err());
    }

    #[test]
    fn test_node_kind_roundtrip() {
        for kind in [
            NodeKind::Snapshot,
            NodeKind::File,
            NodeKind::Symbol,
            NodeKind::ChangeSet,
            NodeKind::ChangeType,
            NodeKind::Module,
            NodeKind::Intent,
            NodeKind::Workspace,
        ] {
            assert_eq!(NodeKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(NodeKind::parse("Blob").is_err());
    }

    #[test]
    fn test_workspace_is_not_content_addressed() {
        assert!(!NodeKind::Workspace.is_content_addressed());
        assert!(NodeKind::Snapshot.is_content_addressed());
        assert!(NodeKind::ChangeSet.is_content_addressed());
    }

    #[test]
    fn test_edge_kind_roundtrip() {
        assert_eq!(EdgeKind::parse("HAS_INTENT").unwrap(), EdgeKind::HasIntent);
        assert_eq!(EdgeKind::HasIntent.as_str(), "HAS_INTENT");
        assert!(EdgeKind::parse("LINKS").is_err());
    }

    #[test]
    fn test_span_overlaps() {
        let a = Span::new(1, 0, 3, 10);
        let b = Span::new(3, 5, 7, 0);
        let c = Span::new(4, 0, 5, 0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_span_overlap_is_column_sensitive() {
        // Same row, disjoint columns
        let a = Span::new(2, 0, 2, 4);
        let b = Span::new(2, 5, 2, 9);
        assert!(!a.overlaps(&b));
        let touching = Span::new(2, 4, 2, 9);
        assert!(a.overlaps(&touching));
    }

    #[test]
    fn test_point_serializes_as_array() {
        let json = serde_json::to_string(&Point(3, 14)).unwrap();
        assert_eq!(json, "[3,14]");
    }

    #[test]
    fn test_symbol_payload_wire_keys() {
        let payload = SymbolPayload {
            fq_name: "User.greet".into(),
            kind: SymbolKind::Method,
            signature: "(name)".into(),
            range: Span::new(4, 2, 6, 3),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"fqName\":\"User.greet\""));
        assert!(json.contains("\"kind\":\"method\""));
        assert!(json.contains("\"start\":[4,2]"));
    }

    #[test]
    fn test_intent_payload_wire_keys() {
        let payload = IntentPayload {
            text: "Update Auth login".into(),
            change_set_id: "ab".repeat(32),
            created_at: 42,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"changeSetID\""));
        assert!(json.contains("\"createdAt\":42"));
    }

    #[test]
    fn test_changeset_payload_omits_absent_workspace() {
        let payload = ChangeSetPayload {
            base: "aa".repeat(32),
            head: "bb".repeat(32),
            created_at: 7,
            workspace_id: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("workspaceId"));

        let with_ws = ChangeSetPayload {
            workspace_id: Some("ws-1".into()),
            ..payload
        };
        assert!(serde_json::to_string(&with_ws).unwrap().contains("\"workspaceId\":\"ws-1\""));
    }

    #[test]
    fn test_snapshot_payload_camel_case() {
        let payload = SnapshotPayload {
            source_type: "directory".into(),
            source_ref: "/tmp/src".into(),
            file_count: 3,
            created_at: 1000,
            manifest: "ab".repeat(32),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"sourceType\""));
        assert!(json.contains("\"sourceRef\""));
        assert!(json.contains("\"fileCount\":3"));
    }

    #[test]
    fn test_workspace_payload_roundtrip() {
        let payload = WorkspacePayload {
            name: "feature-x".into(),
            status: "active".into(),
            base_snapshot: "aa".repeat(32),
            head_snapshot: "bb".repeat(32),
            change_sets: vec!["cc".repeat(32)],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"baseSnapshot\""));
        assert!(json.contains("\"headSnapshot\""));
        assert!(json.contains("\"changeSets\""));
        let back: WorkspacePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
