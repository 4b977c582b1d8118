// Core identifier and tag types for the mission node graph.
//
// Two kinds of numeric identity exist and must not be confused:
// - `ItemId`: arena handle into a `Mission` (see `mission.rs`). Assigned at
//   creation, dense, never written to the binary output.
// - `RefIndex`: the run-unique reference index the simulator sees. Assigned
//   lazily by the `IndexAuthority` (see `index.rs`); 0 is reserved to mean
//   "no reference" in every binary field that holds one.
//
// `ItemKind` is the closed tag selecting a node's payload layout, and
// `EventKind` names the trigger events an entity can fire. Both carry the
// fixed numeric codes of the binary format.

use std::fmt;

use crate::error::ConstructionError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Arena handle for an item inside one `Mission`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Run-unique reference index as written to the binary container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefIndex(pub u32);

impl RefIndex {
    /// Binary encoding of "no reference".
    pub const NONE: RefIndex = RefIndex(0);
}

impl fmt::Display for RefIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Item kinds
// ---------------------------------------------------------------------------

/// The kind tag of an item.
///
/// Known kinds map to the simulator's native block names (`MCU_TR_Entity`,
/// `MCU_Icon`, ...). Any other well-formed identifier becomes `Other`, which
/// can be parsed and held in a tree but has no binary layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Options,
    /// Plain static object.
    Block,
    Bridge,
    /// Capturable airfield/territory marker.
    Flag,
    Plane,
    Vehicle,
    /// Logic shadow of a physical object (`MCU_TR_Entity`).
    Entity,
    /// Map marker (`MCU_Icon`).
    Icon,
    Timer,
    Counter,
    Activate,
    Deactivate,
    /// Tree-only organizational container. Never encodable.
    Group,
    Other(String),
}

impl ItemKind {
    /// Resolve a native block tag. Empty or non-identifier tags are rejected.
    pub fn from_tag(tag: &str) -> Result<Self, ConstructionError> {
        let mut chars = tag.chars();
        let Some(first) = chars.next() else {
            return Err(ConstructionError::EmptyKindTag);
        };
        if !(first.is_ascii_alphabetic() || first == '_')
            || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConstructionError::InvalidKindTag(tag.to_owned()));
        }
        Ok(match tag {
            "Options" => ItemKind::Options,
            "Block" => ItemKind::Block,
            "Bridge" => ItemKind::Bridge,
            "Flag" => ItemKind::Flag,
            "Plane" => ItemKind::Plane,
            "Vehicle" => ItemKind::Vehicle,
            "MCU_TR_Entity" => ItemKind::Entity,
            "MCU_Icon" => ItemKind::Icon,
            "MCU_Timer" => ItemKind::Timer,
            "MCU_Counter" => ItemKind::Counter,
            "MCU_Activate" => ItemKind::Activate,
            "MCU_Deactivate" => ItemKind::Deactivate,
            "Group" => ItemKind::Group,
            other => ItemKind::Other(other.to_owned()),
        })
    }

    /// The native block tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            ItemKind::Options => "Options",
            ItemKind::Block => "Block",
            ItemKind::Bridge => "Bridge",
            ItemKind::Flag => "Flag",
            ItemKind::Plane => "Plane",
            ItemKind::Vehicle => "Vehicle",
            ItemKind::Entity => "MCU_TR_Entity",
            ItemKind::Icon => "MCU_Icon",
            ItemKind::Timer => "MCU_Timer",
            ItemKind::Counter => "MCU_Counter",
            ItemKind::Activate => "MCU_Activate",
            ItemKind::Deactivate => "MCU_Deactivate",
            ItemKind::Group => "Group",
            ItemKind::Other(tag) => tag,
        }
    }

    /// Binary type code, or `None` for kinds that can never be encoded.
    pub fn type_code(&self) -> Option<u32> {
        match self {
            ItemKind::Options => Some(1),
            ItemKind::Block => Some(2),
            ItemKind::Bridge => Some(3),
            ItemKind::Flag => Some(4),
            ItemKind::Plane => Some(5),
            ItemKind::Vehicle => Some(6),
            ItemKind::Entity => Some(7),
            ItemKind::Icon => Some(8),
            ItemKind::Timer => Some(9),
            ItemKind::Counter => Some(10),
            ItemKind::Activate => Some(11),
            ItemKind::Deactivate => Some(12),
            ItemKind::Group | ItemKind::Other(_) => None,
        }
    }

    /// Physical objects: carry a model, a damage profile, and can own an entity.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            ItemKind::Block
                | ItemKind::Bridge
                | ItemKind::Flag
                | ItemKind::Plane
                | ItemKind::Vehicle
        )
    }

    /// Logic kinds whose payload ends in a target list.
    pub fn has_targets(&self) -> bool {
        matches!(
            self,
            ItemKind::Entity
                | ItemKind::Icon
                | ItemKind::Timer
                | ItemKind::Counter
                | ItemKind::Activate
                | ItemKind::Deactivate
        )
    }

    /// Trigger-capable kinds with named event lists.
    pub fn has_events(&self) -> bool {
        matches!(self, ItemKind::Entity)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// Named trigger events. Declaration order follows the numeric codes, so
/// the derived `Ord` sorts events the way the binary event list expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    OnPilotKilled,
    OnPilotWounded,
    OnPlaneCrashed,
    OnPlaneCriticalDamage,
    OnPlaneDestroyed,
    OnPlaneLanded,
    OnPlaneTookOff,
    OnPlaneBingoFuel,
    OnPlaneBingoMainMG,
    OnPlaneBingoBombs,
    OnPlaneBingoTurrets,
    OnPlaneGunnersKilled,
    OnDamaged,
    OnKilled,
    OnMovedTo,
    OnPlaneSpawned,
    OnOutOfPlanes,
    OnPlaneAdded,
    OnFlagBlocked,
    OnFlagUnblocked,
    OnFlagCapturedBy,
    OnFlagCapturedFrom,
}

impl EventKind {
    pub const ALL: [EventKind; 22] = [
        EventKind::OnPilotKilled,
        EventKind::OnPilotWounded,
        EventKind::OnPlaneCrashed,
        EventKind::OnPlaneCriticalDamage,
        EventKind::OnPlaneDestroyed,
        EventKind::OnPlaneLanded,
        EventKind::OnPlaneTookOff,
        EventKind::OnPlaneBingoFuel,
        EventKind::OnPlaneBingoMainMG,
        EventKind::OnPlaneBingoBombs,
        EventKind::OnPlaneBingoTurrets,
        EventKind::OnPlaneGunnersKilled,
        EventKind::OnDamaged,
        EventKind::OnKilled,
        EventKind::OnMovedTo,
        EventKind::OnPlaneSpawned,
        EventKind::OnOutOfPlanes,
        EventKind::OnPlaneAdded,
        EventKind::OnFlagBlocked,
        EventKind::OnFlagUnblocked,
        EventKind::OnFlagCapturedBy,
        EventKind::OnFlagCapturedFrom,
    ];

    /// Numeric event code written to the binary event list.
    pub fn code(self) -> u32 {
        match self {
            EventKind::OnPilotKilled => 0,
            EventKind::OnPilotWounded => 1,
            EventKind::OnPlaneCrashed => 2,
            EventKind::OnPlaneCriticalDamage => 3,
            EventKind::OnPlaneDestroyed => 4,
            EventKind::OnPlaneLanded => 5,
            EventKind::OnPlaneTookOff => 6,
            EventKind::OnPlaneBingoFuel => 7,
            EventKind::OnPlaneBingoMainMG => 8,
            EventKind::OnPlaneBingoBombs => 9,
            EventKind::OnPlaneBingoTurrets => 10,
            EventKind::OnPlaneGunnersKilled => 11,
            EventKind::OnDamaged => 12,
            EventKind::OnKilled => 13,
            EventKind::OnMovedTo => 15,
            EventKind::OnPlaneSpawned => 20,
            EventKind::OnOutOfPlanes => 21,
            EventKind::OnPlaneAdded => 22,
            EventKind::OnFlagBlocked => 23,
            EventKind::OnFlagUnblocked => 24,
            EventKind::OnFlagCapturedBy => 25,
            EventKind::OnFlagCapturedFrom => 26,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::OnPilotKilled => "OnPilotKilled",
            EventKind::OnPilotWounded => "OnPilotWounded",
            EventKind::OnPlaneCrashed => "OnPlaneCrashed",
            EventKind::OnPlaneCriticalDamage => "OnPlaneCriticalDamage",
            EventKind::OnPlaneDestroyed => "OnPlaneDestroyed",
            EventKind::OnPlaneLanded => "OnPlaneLanded",
            EventKind::OnPlaneTookOff => "OnPlaneTookOff",
            EventKind::OnPlaneBingoFuel => "OnPlaneBingoFuel",
            EventKind::OnPlaneBingoMainMG => "OnPlaneBingoMainMG",
            EventKind::OnPlaneBingoBombs => "OnPlaneBingoBombs",
            EventKind::OnPlaneBingoTurrets => "OnPlaneBingoTurrets",
            EventKind::OnPlaneGunnersKilled => "OnPlaneGunnersKilled",
            EventKind::OnDamaged => "OnDamaged",
            EventKind::OnKilled => "OnKilled",
            EventKind::OnMovedTo => "OnMovedTo",
            EventKind::OnPlaneSpawned => "OnPlaneSpawned",
            EventKind::OnOutOfPlanes => "OnOutOfPlanes",
            EventKind::OnPlaneAdded => "OnPlaneAdded",
            EventKind::OnFlagBlocked => "OnFlagBlocked",
            EventKind::OnFlagUnblocked => "OnFlagUnblocked",
            EventKind::OnFlagCapturedBy => "OnFlagCapturedBy",
            EventKind::OnFlagCapturedFrom => "OnFlagCapturedFrom",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConstructionError> {
        EventKind::ALL
            .into_iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| ConstructionError::UnknownEvent(name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A position or orientation triple, in simulator world units / degrees.
///
/// The simulator's ground plane is X/Z with Y up, so the two-component
/// conversion `(x, z)` leaves Y at 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// Ground-plane form: `(x, z)` with Y defaulted to 0.
impl From<(f64, f64)> for Vec3 {
    fn from((x, z): (f64, f64)) -> Self {
        Self { x, y: 0.0, z }
    }
}

impl TryFrom<&[f64]> for Vec3 {
    type Error = ConstructionError;

    fn try_from(components: &[f64]) -> Result<Self, Self::Error> {
        match *components {
            [x, y, z] => Ok(Vec3::new(x, y, z)),
            [x, z] => Ok(Vec3::new(x, 0.0, z)),
            _ => Err(ConstructionError::ComponentCount(components.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_tags_resolve_to_kinds() {
        assert_eq!(ItemKind::from_tag("MCU_TR_Entity").unwrap(), ItemKind::Entity);
        assert_eq!(ItemKind::from_tag("Plane").unwrap(), ItemKind::Plane);
        assert_eq!(
            ItemKind::from_tag("Airfield").unwrap(),
            ItemKind::Other("Airfield".into())
        );
    }

    #[test]
    fn bad_tags_are_rejected() {
        assert_eq!(ItemKind::from_tag(""), Err(ConstructionError::EmptyKindTag));
        assert!(matches!(
            ItemKind::from_tag("9lives"),
            Err(ConstructionError::InvalidKindTag(_))
        ));
        assert!(matches!(
            ItemKind::from_tag("Two Words"),
            Err(ConstructionError::InvalidKindTag(_))
        ));
    }

    #[test]
    fn tag_roundtrips_for_known_kinds() {
        for tag in ["Options", "Block", "MCU_Icon", "MCU_Counter", "Group"] {
            assert_eq!(ItemKind::from_tag(tag).unwrap().tag(), tag);
        }
    }

    #[test]
    fn group_and_other_have_no_type_code() {
        assert_eq!(ItemKind::Group.type_code(), None);
        assert_eq!(ItemKind::Other("X".into()).type_code(), None);
        assert_eq!(ItemKind::Entity.type_code(), Some(7));
    }

    #[test]
    fn event_order_matches_codes() {
        let codes: Vec<u32> = EventKind::ALL.iter().map(|e| e.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
        assert!(EventKind::OnPilotKilled < EventKind::OnPlaneSpawned);
    }

    #[test]
    fn event_names_resolve() {
        assert_eq!(EventKind::from_name("OnKilled").unwrap().code(), 13);
        assert!(matches!(
            EventKind::from_name("OnTeaTime"),
            Err(ConstructionError::UnknownEvent(_))
        ));
    }

    #[test]
    fn two_component_form_is_ground_plane() {
        let v: Vec3 = (10.0, 20.0).into();
        assert_eq!(v, Vec3::new(10.0, 0.0, 20.0));
        let pair: &[f64] = &[1.0, 2.0];
        assert_eq!(Vec3::try_from(pair).unwrap(), Vec3::new(1.0, 0.0, 2.0));
        let single: &[f64] = &[1.0];
        assert_eq!(
            Vec3::try_from(single),
            Err(ConstructionError::ComponentCount(1))
        );
    }
}
