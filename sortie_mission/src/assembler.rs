// Container assembly: walk a mission, assign indices, encode every item,
// and concatenate the item stream with the symbol tables.
//
// One `build` call is one generation run:
// 1. Compute the emission order (`Mission::walk`: owner, its entity, then
//    its children depth-first).
// 2. Pre-scan the order for kinds with no binary layout (Group, unknown
//    tags) and count the indices still to be issued. A bad kind or an
//    index space too small aborts before a single index is assigned, so a
//    failed run leaves the mission exactly as it was.
// 3. Resolve indices in walk order: each item, its entity, its target
//    links, then its event links. Link targets that are never emitted
//    still get an index and are logged with `warn!`.
// 4. Encode every item against one `EncodeContext` shared by the whole run,
//    appending its buffers to the item stream.
//
// The index seed is a property of the `Mission`; the assembler only decides
// how far the string table is padded.
//
// The result is an `Assembly` holding the item stream and the populated
// tables; `Assembly::to_bytes` lays them out in `SECTION_ORDER`. Errors in
// any step propagate and no buffer is produced.

use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use crate::config::{DEFAULT_MIN_STRING_ENTRIES, MissionConfig};
use crate::encode::{EncodeContext, encode_item};
use crate::error::{Result, StructuralError};
use crate::mission::Mission;
use crate::tables::{DamageTable, StringTable};
use crate::types::{ItemId, ItemKind};

/// Top-level sections of the binary container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Items,
    Strings,
    Damage,
}

/// The order sections appear in the output.
pub const SECTION_ORDER: [Section; 3] = [Section::Items, Section::Strings, Section::Damage];

/// Output of one assembly run, before final concatenation.
#[derive(Clone, Debug)]
pub struct Assembly {
    items: Vec<u8>,
    item_count: usize,
    strings: StringTable,
    damage: DamageTable,
    min_string_entries: u16,
}

impl Assembly {
    /// The concatenated item stream.
    pub fn items(&self) -> &[u8] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn damage(&self) -> &DamageTable {
        &self.damage
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.items.len());
        for section in SECTION_ORDER {
            match section {
                Section::Items => out.extend_from_slice(&self.items),
                Section::Strings => out.extend(self.strings.encode(self.min_string_entries)?),
                Section::Damage => out.extend(self.damage.encode()?),
            }
        }
        Ok(out)
    }
}

#[derive(Clone, Debug)]
pub struct Assembler {
    min_string_entries: u16,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_STRING_ENTRIES)
    }
}

impl Assembler {
    pub fn new(min_string_entries: u16) -> Self {
        Self { min_string_entries }
    }

    /// Assembler with the string padding from `config`.
    pub fn from_config(config: &MissionConfig) -> Self {
        Self::new(config.min_string_entries)
    }

    pub fn min_string_entries(&self) -> u16 {
        self.min_string_entries
    }

    /// Encode the whole mission into its sections.
    pub fn build(&self, mission: &mut Mission) -> Result<Assembly> {
        let order = mission.walk();
        check_encodable(mission, &order)?;
        resolve_indices(mission, &order)?;

        let mut ctx = EncodeContext::new();
        let mut items = Vec::new();
        for &id in &order {
            let buffers = encode_item(mission, id, &mut ctx)?;
            let before = items.len();
            for buffer in &buffers {
                items.extend_from_slice(buffer);
            }
            trace!(
                item = %id,
                kind = %mission[id].kind(),
                bytes = items.len() - before,
                "encoded item"
            );
        }

        debug!(
            items = order.len(),
            item_bytes = items.len(),
            strings = ctx.strings.len(),
            damage_profiles = ctx.damage.len(),
            indices = mission.issued_indices(),
            "mission assembled"
        );
        Ok(Assembly {
            items,
            item_count: order.len(),
            strings: ctx.strings,
            damage: ctx.damage,
            min_string_entries: self.min_string_entries,
        })
    }

    /// Encode the whole mission into one buffer.
    pub fn assemble(&self, mission: &mut Mission) -> Result<Vec<u8>> {
        self.build(mission)?.to_bytes()
    }
}

fn check_encodable(mission: &Mission, order: &[ItemId]) -> Result<(), StructuralError> {
    for &id in order {
        match mission[id].kind() {
            ItemKind::Group => return Err(StructuralError::GroupEncoded { item: id }),
            ItemKind::Other(tag) => {
                return Err(StructuralError::Unencodable {
                    item: id,
                    tag: tag.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Items in the order their indices are resolved: each emitted item, its
/// entity, then its links. May repeat ids.
fn index_order(mission: &Mission, order: &[ItemId]) -> Vec<ItemId> {
    let mut sequence = Vec::with_capacity(order.len());
    for &id in order {
        let item = &mission[id];
        sequence.push(id);
        sequence.extend(item.entity());
        sequence.extend(item.linked_items());
    }
    sequence
}

fn resolve_indices(mission: &mut Mission, order: &[ItemId]) -> Result<(), StructuralError> {
    let sequence = index_order(mission, order);
    let mut pending: FxHashSet<ItemId> = FxHashSet::default();
    for &id in &sequence {
        if mission[id].index().is_none() {
            pending.insert(id);
        }
    }
    mission.ensure_indices(pending.len())?;

    let emitted: FxHashSet<ItemId> = order.iter().copied().collect();
    for &id in order {
        let links: Vec<ItemId> = mission[id].linked_items().collect();
        for &target in &links {
            if !emitted.contains(&target) {
                warn!(from = %id, target = %target, "link target is not part of the mission tree");
            }
        }
    }
    for id in sequence {
        mission.reference_index(id)?;
    }
    Ok(())
}
