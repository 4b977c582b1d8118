// The mission node ("item"): kind tag, lazily assigned reference index,
// property bag, and the link lists that make up the logic graph.
//
// Items live in a `Mission` arena (see `mission.rs`) and refer to each other
// by `ItemId`. Structural edges (children, linked entity, target and event
// links) are only mutated through `Mission`, which enforces exclusivity and
// kind rules; the property bag is mutated directly through `Item` setters.
//
// Property invariants enforced here:
// - Position/orientation components are rounded to 2 decimals on
//   assignment; a component that rounds to exactly zero is removed rather
//   than stored, so "absent" and "zero" are the same thing.
// - Name/Desc must be a string or a localized id.
// - Coalition lists are truncated to integers at assignment and stored as
//   an immutable boxed slice.

use std::collections::BTreeMap;

use crate::error::{ConstructionError, ValueError};
use crate::options::{CountryCoalition, WindLayer};
use crate::props::{PropKey, Value};
use crate::tables::DamageProfile;
use crate::types::{EventKind, ItemId, ItemKind, RefIndex, Vec3};

/// Where an item sits in the ownership tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Attachment {
    Detached,
    Root,
    Child(ItemId),
    /// Linked entity of the given owner.
    Entity(ItemId),
}

impl Attachment {
    pub(crate) fn parent(self) -> Option<ItemId> {
        match self {
            Attachment::Child(p) | Attachment::Entity(p) => Some(p),
            Attachment::Detached | Attachment::Root => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    kind: ItemKind,
    pub(crate) index: Option<RefIndex>,
    props: BTreeMap<PropKey, Value>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) entity: Option<ItemId>,
    pub(crate) targets: Vec<ItemId>,
    pub(crate) events: BTreeMap<EventKind, Vec<ItemId>>,
    pub(crate) attachment: Attachment,
    damage: Option<DamageProfile>,
    wind_layers: Vec<WindLayer>,
    countries: Vec<CountryCoalition>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn invalid(key: &PropKey, expected: &'static str, value: &Value) -> ConstructionError {
    ConstructionError::InvalidValue {
        key: key.name().to_owned(),
        expected,
        found: value.shape(),
    }
}

fn wrong_type(key: &PropKey, expected: &'static str) -> ValueError {
    ValueError::WrongType {
        key: key.name().to_owned(),
        expected,
    }
}

impl Item {
    pub(crate) fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            index: None,
            props: BTreeMap::new(),
            children: Vec::new(),
            entity: None,
            targets: Vec::new(),
            events: BTreeMap::new(),
            attachment: Attachment::Detached,
            damage: None,
            wind_layers: Vec::new(),
            countries: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// The reference index, if one has been assigned yet.
    pub fn index(&self) -> Option<RefIndex> {
        self.index
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn entity(&self) -> Option<ItemId> {
        self.entity
    }

    pub fn targets(&self) -> &[ItemId] {
        &self.targets
    }

    /// Event links grouped by event kind, in event-code order.
    pub fn events(&self) -> impl Iterator<Item = (EventKind, &[ItemId])> {
        self.events.iter().map(|(&kind, ids)| (kind, ids.as_slice()))
    }

    /// Every item this one links to: targets first, then event targets.
    pub(crate) fn linked_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.targets
            .iter()
            .chain(self.events.values().flatten())
            .copied()
    }

    // -----------------------------------------------------------------------
    // Property bag
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &PropKey) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn remove(&mut self, key: &PropKey) -> Option<Value> {
        self.props.remove(key)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&PropKey, &Value)> {
        self.props.iter()
    }

    /// Set a property, applying the per-key invariants.
    pub fn set(&mut self, key: PropKey, value: impl Into<Value>) -> Result<(), ConstructionError> {
        let value = value.into();
        if key.is_coordinate() {
            let n = value.as_num().ok_or_else(|| invalid(&key, "a number", &value))?;
            self.set_component(key, n);
            return Ok(());
        }
        let value = match key {
            PropKey::Name | PropKey::Desc => label(&key, value)?,
            PropKey::Coalitions => Value::Ints(coalition_ints(&key, &value)?),
            _ => value,
        };
        self.props.insert(key, value);
        Ok(())
    }

    fn set_component(&mut self, key: PropKey, v: f64) {
        let rounded = round2(v);
        if rounded == 0.0 {
            self.props.remove(&key);
        } else {
            self.props.insert(key, Value::Num(rounded));
        }
    }

    pub fn set_position(&mut self, pos: impl Into<Vec3>) {
        let Vec3 { x, y, z } = pos.into();
        self.set_component(PropKey::XPos, x);
        self.set_component(PropKey::YPos, y);
        self.set_component(PropKey::ZPos, z);
    }

    pub fn set_orientation(&mut self, ori: impl Into<Vec3>) {
        let Vec3 { x, y, z } = ori.into();
        self.set_component(PropKey::XOri, x);
        self.set_component(PropKey::YOri, y);
        self.set_component(PropKey::ZOri, z);
    }

    fn component(&self, key: &PropKey) -> f64 {
        self.props.get(key).and_then(Value::as_num).unwrap_or(0.0)
    }

    /// Position; absent components read as zero.
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.component(&PropKey::XPos),
            self.component(&PropKey::YPos),
            self.component(&PropKey::ZPos),
        )
    }

    pub fn orientation(&self) -> Vec3 {
        Vec3::new(
            self.component(&PropKey::XOri),
            self.component(&PropKey::YOri),
            self.component(&PropKey::ZOri),
        )
    }

    pub fn set_name(&mut self, name: impl Into<Value>) -> Result<(), ConstructionError> {
        self.set(PropKey::Name, name)
    }

    pub fn set_desc(&mut self, desc: impl Into<Value>) -> Result<(), ConstructionError> {
        self.set(PropKey::Desc, desc)
    }

    pub fn set_coalitions(&mut self, coalitions: &[f64]) {
        let ints = coalitions.iter().map(|&c| c as i32).collect();
        self.props.insert(PropKey::Coalitions, Value::Ints(ints));
    }

    pub fn coalitions(&self) -> &[i32] {
        match self.props.get(&PropKey::Coalitions) {
            Some(Value::Ints(ints)) => ints,
            _ => &[],
        }
    }

    // -----------------------------------------------------------------------
    // Kind-specific records
    // -----------------------------------------------------------------------

    fn accepts_damage(&self) -> bool {
        self.kind.is_object() || matches!(self.kind, ItemKind::Other(_))
    }

    fn unsupported(&self, what: &'static str) -> ConstructionError {
        ConstructionError::RecordsUnsupported {
            kind: self.kind.tag().to_owned(),
            what,
        }
    }

    /// Set one component of the damage profile.
    pub fn set_damage(&mut self, component: u32, amount: f64) -> Result<(), ConstructionError> {
        if !self.accepts_damage() {
            return Err(self.unsupported("damage profiles"));
        }
        self.damage
            .get_or_insert_with(DamageProfile::new)
            .set(component, amount)
    }

    pub fn set_damage_profile(&mut self, profile: DamageProfile) -> Result<(), ConstructionError> {
        if !self.accepts_damage() {
            return Err(self.unsupported("damage profiles"));
        }
        self.damage = Some(profile);
        Ok(())
    }

    pub fn damage(&self) -> Option<&DamageProfile> {
        self.damage.as_ref()
    }

    pub fn add_wind_layer(&mut self, layer: WindLayer) -> Result<(), ConstructionError> {
        if self.kind != ItemKind::Options {
            return Err(self.unsupported("wind layers"));
        }
        self.wind_layers.push(layer);
        Ok(())
    }

    pub fn wind_layers(&self) -> &[WindLayer] {
        &self.wind_layers
    }

    pub fn add_country(&mut self, entry: CountryCoalition) -> Result<(), ConstructionError> {
        if self.kind != ItemKind::Options {
            return Err(self.unsupported("country coalitions"));
        }
        self.countries.push(entry);
        Ok(())
    }

    pub fn countries(&self) -> &[CountryCoalition] {
        &self.countries
    }

    // -----------------------------------------------------------------------
    // Typed reads for the encoders
    // -----------------------------------------------------------------------

    /// Numeric property. Numeric strings are accepted; other shapes are not.
    pub(crate) fn number(&self, key: &PropKey) -> Result<Option<f64>, ValueError> {
        match self.props.get(key) {
            None => Ok(None),
            Some(Value::Num(n)) => Ok(Some(*n)),
            Some(Value::Lc(id)) => Ok(Some(f64::from(*id))),
            Some(Value::Str(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| wrong_type(key, "a number")),
            Some(Value::Numbers(_) | Value::Ints(_)) => Err(wrong_type(key, "a number")),
        }
    }

    pub(crate) fn number_or(&self, key: &PropKey, default: f64) -> Result<f64, ValueError> {
        Ok(self.number(key)?.unwrap_or(default))
    }

    /// Text property. Only string values qualify.
    pub(crate) fn text(&self, key: &PropKey) -> Result<Option<&str>, ValueError> {
        match self.props.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key, "a string")),
        }
    }
}

/// Name/Desc: strings stay strings; whole non-negative numbers become
/// localized ids.
fn label(key: &PropKey, value: Value) -> Result<Value, ConstructionError> {
    match value {
        Value::Str(_) | Value::Lc(_) => Ok(value),
        Value::Num(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => {
            Ok(Value::Lc(n as u32))
        }
        other => Err(invalid(key, "a string or localized id", &other)),
    }
}

fn coalition_ints(key: &PropKey, value: &Value) -> Result<Box<[i32]>, ConstructionError> {
    match value {
        Value::Num(n) => Ok(vec![*n as i32].into_boxed_slice()),
        Value::Numbers(list) => Ok(list.iter().map(|&c| c as i32).collect()),
        Value::Ints(ints) => Ok(ints.clone()),
        Value::Str(_) | Value::Lc(_) => Err(invalid(key, "a number list", value)),
    }
}
