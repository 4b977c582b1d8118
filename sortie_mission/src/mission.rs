// The per-run item arena: node storage, tree structure, graph wiring, and
// the reference-index authority.
//
// A `Mission` owns every `Item` of one generation run in a flat `Vec`,
// addressed by `ItemId`. Ownership (roots, children, linked entities) is
// recorded in the items themselves plus an entity -> owner lookup table;
// target and event links are plain `ItemId` lists and carry no ownership.
//
// Index assignment is lazy: nothing gets a `RefIndex` until `link_entity`
// or the assembler asks for one. `reference_index` is idempotent, so asking
// twice for the same item always returns the same value.
//
// Structural rules enforced here:
// - An item is attached at most once (as a root, a child, or an entity).
// - Attaching a child under one of its own descendants is a cycle error.
// - An owner has at most one linked entity; a second `link_entity` fails
//   before touching anything. `adopt_entity` links an existing detached
//   entity item under the same rules.
// - Operations that need fresh indices check the remaining index space
//   first, so running out never leaves a half-made link.
// - Target links only on kinds with target lists, event links only on
//   trigger-capable kinds. Self-links and cycles in the logic graph are
//   legal.
//
// See also: `item.rs` for the property bag, `assembler.rs` for the walk
// that consumes this structure.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use crate::config::MissionConfig;
use crate::error::{ConstructionError, Result, StructuralError};
use crate::index::IndexAuthority;
use crate::item::{Attachment, Item};
use crate::props::PropKey;
use crate::types::{EventKind, ItemId, ItemKind, RefIndex};

#[derive(Clone, Debug, Default)]
pub struct Mission {
    items: Vec<Item>,
    roots: Vec<ItemId>,
    indices: IndexAuthority,
    /// Entity -> owning object.
    entity_owners: BTreeMap<ItemId, ItemId>,
}

impl Mission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &MissionConfig) -> Self {
        Self {
            indices: IndexAuthority::new(config.index_seed),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Create a detached item of the given kind.
    pub fn create(&mut self, kind: ItemKind) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(Item::new(kind));
        id
    }

    /// Create a detached item from a native block tag.
    pub fn create_tagged(&mut self, tag: &str) -> Result<ItemId, ConstructionError> {
        let kind = ItemKind::from_tag(tag)?;
        Ok(self.create(kind))
    }

    pub fn create_root(&mut self, kind: ItemKind) -> ItemId {
        let id = self.create(kind);
        self.items[id.slot()].attachment = Attachment::Root;
        self.roots.push(id);
        id
    }

    pub fn create_child(&mut self, parent: ItemId, kind: ItemKind) -> ItemId {
        let id = self.create(kind);
        self.items[id.slot()].attachment = Attachment::Child(parent);
        self.items[parent.slot()].children.push(id);
        id
    }

    pub fn attach_root(&mut self, id: ItemId) -> Result<(), StructuralError> {
        self.ensure_detached(id)?;
        self.items[id.slot()].attachment = Attachment::Root;
        self.roots.push(id);
        Ok(())
    }

    pub fn attach_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), StructuralError> {
        self.ensure_detached(child)?;
        if self.ancestors(parent).any(|a| a == child) {
            return Err(StructuralError::Cycle { parent, child });
        }
        self.items[child.slot()].attachment = Attachment::Child(parent);
        self.items[parent.slot()].children.push(child);
        Ok(())
    }

    fn ensure_detached(&self, id: ItemId) -> Result<(), StructuralError> {
        match self.items[id.slot()].attachment {
            Attachment::Detached => Ok(()),
            _ => Err(StructuralError::AlreadyAttached(id)),
        }
    }

    /// `id` itself, then each owner up to its root.
    fn ancestors(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        std::iter::successors(Some(id), |cur| self.items[cur.slot()].attachment.parent())
    }

    // -----------------------------------------------------------------------
    // Indices and entity links
    // -----------------------------------------------------------------------

    /// The item's reference index, assigned on first request. Fails only
    /// when the run has used up its index space.
    pub fn reference_index(&mut self, id: ItemId) -> Result<RefIndex, StructuralError> {
        let item = &mut self.items[id.slot()];
        self.indices.resolve(&mut item.index)
    }

    /// Number of reference indices issued so far in this run.
    pub fn issued_indices(&self) -> u32 {
        self.indices.issued()
    }

    /// Fail unless `requested` more reference indices can be issued.
    pub fn ensure_indices(&self, requested: usize) -> Result<(), StructuralError> {
        self.indices.ensure_available(requested)
    }

    /// Create an entity for `owner`, cross-reference the two, and return the
    /// entity. Fails without mutating anything if `owner` already has one.
    ///
    /// The owner is indexed first, then the entity. The entity starts at the
    /// owner's position and orientation.
    pub fn link_entity(&mut self, owner: ItemId) -> Result<ItemId> {
        self.check_owner(owner)?;
        let unindexed = usize::from(self.items[owner.slot()].index.is_none());
        self.ensure_indices(unindexed + 1)?;

        let owner_item = &self.items[owner.slot()];
        let position = owner_item.position();
        let orientation = owner_item.orientation();
        let entity = self.create(ItemKind::Entity);
        let entity_item = &mut self.items[entity.slot()];
        entity_item.set_position(position);
        entity_item.set_orientation(orientation);

        self.bind_entity(owner, entity)?;
        Ok(entity)
    }

    /// Link an existing detached entity item to `owner`, the way
    /// `link_entity` links a fresh one. The entity keeps its own position.
    pub fn adopt_entity(&mut self, owner: ItemId, entity: ItemId) -> Result<()> {
        self.check_owner(owner)?;
        if self.items[entity.slot()].kind() != &ItemKind::Entity {
            return Err(StructuralError::NotAnEntity { item: entity }.into());
        }
        self.ensure_detached(entity)?;
        let unindexed = [owner, entity]
            .iter()
            .filter(|id| self.items[id.slot()].index.is_none())
            .count();
        self.ensure_indices(unindexed)?;
        self.bind_entity(owner, entity)
    }

    fn check_owner(&self, owner: ItemId) -> Result<()> {
        let owner_item = &self.items[owner.slot()];
        if owner_item.entity.is_some() {
            return Err(StructuralError::EntityAlreadyLinked { item: owner }.into());
        }
        if !owner_item.kind().is_object() {
            return Err(ConstructionError::RecordsUnsupported {
                kind: owner_item.kind().tag().to_owned(),
                what: "linked entities",
            }
            .into());
        }
        Ok(())
    }

    /// Index owner then entity and write both cross-references. Callers have
    /// already checked the owner and the index budget.
    fn bind_entity(&mut self, owner: ItemId, entity: ItemId) -> Result<()> {
        let owner_index = self.reference_index(owner)?;
        let entity_index = self.reference_index(entity)?;

        let entity_item = &mut self.items[entity.slot()];
        entity_item.attachment = Attachment::Entity(owner);
        entity_item.set(PropKey::MisObjId, f64::from(owner_index.0))?;

        let owner_item = &mut self.items[owner.slot()];
        owner_item.entity = Some(entity);
        owner_item.set(PropKey::LinkTrId, f64::from(entity_index.0))?;

        self.entity_owners.insert(entity, owner);
        Ok(())
    }

    /// The object an entity was linked to, if `entity` is a linked entity.
    pub fn owner_of(&self, entity: ItemId) -> Option<ItemId> {
        self.entity_owners.get(&entity).copied()
    }

    // -----------------------------------------------------------------------
    // Graph wiring
    // -----------------------------------------------------------------------

    /// Append `to` to `from`'s target list. Does not assign indices.
    pub fn add_target(&mut self, from: ItemId, to: ItemId) -> Result<(), ConstructionError> {
        let item = &mut self.items[from.slot()];
        if !item.kind().has_targets() {
            return Err(ConstructionError::LinksUnsupported {
                kind: item.kind().tag().to_owned(),
            });
        }
        item.targets.push(to);
        Ok(())
    }

    /// Append `to` to `from`'s list for `event`. Does not assign indices.
    pub fn add_event(
        &mut self,
        from: ItemId,
        event: EventKind,
        to: ItemId,
    ) -> Result<(), ConstructionError> {
        let item = &mut self.items[from.slot()];
        if !item.kind().has_events() {
            return Err(ConstructionError::EventsUnsupported {
                kind: item.kind().tag().to_owned(),
            });
        }
        item.events.entry(event).or_default().push(to);
        Ok(())
    }

    pub fn add_event_named(
        &mut self,
        from: ItemId,
        event: &str,
        to: ItemId,
    ) -> Result<(), ConstructionError> {
        let event = EventKind::from_name(event)?;
        self.add_event(from, event, to)
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.slot())
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id.slot())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Emission order: each owner, then its linked entity, then its children
    /// depth-first, starting from the roots in attachment order. Detached
    /// items are not visited.
    pub fn walk(&self) -> Vec<ItemId> {
        let mut order = Vec::with_capacity(self.items.len());
        let mut stack: Vec<ItemId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            let item = &self.items[id.slot()];
            stack.extend(item.children.iter().rev());
            // Pushed last so it pops first, ahead of the children.
            stack.extend(item.entity);
        }
        order
    }
}

impl Index<ItemId> for Mission {
    type Output = Item;

    fn index(&self, id: ItemId) -> &Item {
        &self.items[id.slot()]
    }
}

impl IndexMut<ItemId> for Mission {
    fn index_mut(&mut self, id: ItemId) -> &mut Item {
        &mut self.items[id.slot()]
    }
}
