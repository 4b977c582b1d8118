// sortie_mission: mission logic-node model and binary container encoder.
//
// This crate holds the in-memory object graph of a flight-simulator mission
// (objects, trigger logic, map icons, global options) and turns it into the
// simulator's binary mission container: an item stream followed by a
// deduplicated string table and damage-signature table.
//
// Module overview:
// - `types.rs`:     `ItemId` arena handles, `RefIndex`, `ItemKind`, `EventKind`, `Vec3`.
// - `props.rs`:     Property values (`Value`) and recognized property names (`PropKey`).
// - `item.rs`:      `Item`, one node (kind, index slot, property bag, links).
// - `mission.rs`:   `Mission`: the per-run arena, tree structure, graph wiring,
//                   entity linking, and walk order.
// - `index.rs`:     `IndexAuthority`: monotonic, lazily assigned reference indices.
// - `tables.rs`:    `StringTable` and `DamageTable` interning plus their binary layouts.
// - `encode.rs`:    Common header, object kinds, and the `encode_item` dispatch.
// - `logic.rs`:     Entity, icon, timer, counter, activate/deactivate payloads.
// - `options.rs`:   Mission options payload (date/time, map, weather, records).
// - `assembler.rs`: `Assembler`: walk, index, encode, and concatenate sections.
// - `wire.rs`:      Little-endian `ByteWriter` / `ByteReader`.
// - `config.rs`:    `MissionConfig`: index seed and string-table padding.
// - `error.rs`:     Construction, structural, and value error enums.
//
// The companion crate `sortie_text` parses the simulator's curly-brace block
// text into a `Mission`.
//
// Everything is per-run and owned: a `Mission` and an `Assembler` share no
// state with other runs, so independent runs can live on separate threads.
// Nothing here depends on wall-clock time or hash iteration order; the same
// mission always assembles to the same bytes.

pub mod assembler;
pub mod config;
pub mod encode;
pub mod error;
pub mod index;
pub mod item;
mod logic;
pub mod mission;
pub mod options;
pub mod props;
pub mod tables;
pub mod types;
pub mod wire;

pub use assembler::{Assembler, Assembly, SECTION_ORDER, Section};
pub use config::MissionConfig;
pub use error::{ConstructionError, Error, Result, StructuralError, ValueError};
pub use item::Item;
pub use mission::Mission;
pub use options::{CountryCoalition, WindLayer};
pub use props::{PropKey, Value};
pub use tables::DamageProfile;
pub use types::{EventKind, ItemId, ItemKind, RefIndex, Vec3};
