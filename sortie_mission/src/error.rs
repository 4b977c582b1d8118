// Error taxonomy for node construction, assembly, and encoding.
//
// Errors fall into three families, each its own enum so callers can match on
// the category without string inspection:
// - `ConstructionError`: raised immediately by builder calls (bad kind tag,
//   wrong value type, link on a kind without link lists).
// - `StructuralError`: raised by graph mutations and by the assembler
//   (double entity link, group or unknown kind reaching the encoder, symbol
//   table overflow).
// - `ValueError`: raised at encode time when a property the encoder depends
//   on is missing or malformed (Options date/time, non-numeric flags).
//
// All three fold into the crate-level `Error`. Nothing is downgraded to a
// warning and there is no partial-output mode: an `Err` from the assembler
// means no buffer exists.

use crate::types::ItemId;

/// Errors surfaced directly by construction and property-setting calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("kind tag is empty")]
    EmptyKindTag,
    #[error("invalid kind tag {0:?}")]
    InvalidKindTag(String),
    #[error("property {key} expects {expected}, got {found}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("coordinates need 2 or 3 components, got {0}")]
    ComponentCount(usize),
    #[error("damage component {0} is out of range (0..=254)")]
    DamageComponent(u32),
    #[error("damage amount {0} is outside [0, 1]")]
    DamageAmount(f64),
    #[error("{kind} items cannot hold target links")]
    LinksUnsupported { kind: String },
    #[error("{kind} items cannot hold event links")]
    EventsUnsupported { kind: String },
    #[error("unknown event kind {0:?}")]
    UnknownEvent(String),
    #[error("{kind} items do not carry {what}")]
    RecordsUnsupported { kind: String, what: &'static str },
}

/// Graph-shape and container-level failures. Fatal to the current assembly.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralError {
    #[error("item {item} already has a linked entity")]
    EntityAlreadyLinked { item: ItemId },
    #[error("group item {item} cannot be encoded")]
    GroupEncoded { item: ItemId },
    #[error("kind {tag:?} has no binary layout (item {item})")]
    Unencodable { item: ItemId, tag: String },
    #[error("item {0} is already attached to the tree")]
    AlreadyAttached(ItemId),
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: ItemId, child: ItemId },
    #[error("item {0} has no reference index")]
    UnresolvedIndex(ItemId),
    #[error("{table} table is full")]
    TableFull { table: &'static str },
    #[error("reference indices exhausted: {requested} requested, {available} left")]
    IndicesExhausted { requested: usize, available: u32 },
    #[error("item {item} is not an entity")]
    NotAnEntity { item: ItemId },
    #[error("{what} count {len} does not fit its binary field")]
    CountOverflow { what: &'static str, len: usize },
}

/// A property the encoder depends on is missing or cannot be interpreted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("{kind} items require {key}")]
    Missing { kind: String, key: &'static str },
    #[error("malformed {key} {text:?}: {reason}")]
    Malformed {
        key: &'static str,
        text: String,
        reason: String,
    },
    #[error("property {key} must be {expected}")]
    WrongType { key: String, expected: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("config is not valid JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
