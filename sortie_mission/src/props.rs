// Property values and the closed set of recognized property names.
//
// Every item carries a bag of named properties. Names the encoders read are
// variants of `PropKey`; anything else the block grammar throws at us lands
// in `PropKey::Other` so unknown fields survive parsing without special
// cases. Values are one of five shapes (`Value`); the per-kind encoders in
// `encode.rs` decide how each shape maps onto a binary field.
//
// Keys sort by declaration order, then `Other` names alphabetically, which
// gives `Item::properties()` a stable iteration order.

use std::fmt;

/// A property value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Free-form text.
    Str(String),
    Num(f64),
    /// Reference into the simulator's external localization table.
    Lc(u32),
    /// Ordered list of numbers.
    Numbers(Vec<f64>),
    /// Integer list, frozen at assignment (coalition lists).
    Ints(Box<[i32]>),
}

impl Value {
    /// Short name of the value's shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Num(_) => "number",
            Value::Lc(_) => "localized id",
            Value::Numbers(_) => "number list",
            Value::Ints(_) => "integer list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match *self {
            Value::Num(n) => Some(n),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Num(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Num(if b { 1.0 } else { 0.0 })
    }
}

impl From<Vec<f64>> for Value {
    fn from(list: Vec<f64>) -> Self {
        Value::Numbers(list)
    }
}

macro_rules! prop_keys {
    ($($variant:ident => $name:literal,)*) => {
        /// Recognized property names, plus an overflow case for anything else.
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum PropKey {
            $($variant,)*
            Other(String),
        }

        impl PropKey {
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($name => PropKey::$variant,)*
                    other => PropKey::Other(other.to_owned()),
                }
            }

            /// The property name as it appears in block text.
            pub fn name(&self) -> &str {
                match self {
                    $(PropKey::$variant => $name,)*
                    PropKey::Other(name) => name,
                }
            }
        }
    };
}

prop_keys! {
    Name => "Name",
    Desc => "Desc",
    Model => "Model",
    Script => "Script",
    Skin => "Skin",
    Country => "Country",
    XPos => "XPos",
    YPos => "YPos",
    ZPos => "ZPos",
    XOri => "XOri",
    YOri => "YOri",
    ZOri => "ZOri",
    LinkTrId => "LinkTrId",
    MisObjId => "MisObjID",
    Enabled => "Enabled",
    DeleteAfterDeath => "DeleteAfterDeath",
    Durability => "Durability",
    DamageThreshold => "DamageThreshold",
    DamageReport => "DamageReport",
    AiLevel => "AILevel",
    Vulnerable => "Vulnerable",
    Engageable => "Engageable",
    LimitAmmo => "LimitAmmo",
    CoopStart => "CoopStart",
    StartInAir => "StartInAir",
    NumberInFormation => "NumberInFormation",
    Callsign => "Callsign",
    Callnum => "Callnum",
    PayloadId => "PayloadId",
    WmMask => "WMMask",
    Fuel => "Fuel",
    Spotter => "Spotter",
    BeaconChannel => "BeaconChannel",
    StartHeight => "StartHeight",
    SpeedFactor => "SpeedFactor",
    BlockThreshold => "BlockThreshold",
    Radius => "Radius",
    Type => "Type",
    Time => "Time",
    Random => "Random",
    Counter => "Counter",
    Dropcount => "Dropcount",
    IconId => "IconId",
    RColor => "RColor",
    GColor => "GColor",
    BColor => "BColor",
    LineType => "LineType",
    Coalitions => "Coalitions",
    Date => "Date",
    HMap => "HMap",
    Textures => "Textures",
    Forests => "Forests",
    Layers => "Layers",
    GuiMap => "GuiMap",
    SeasonPrefix => "SeasonPrefix",
    CloudConfig => "CloudConfig",
    CloudLevel => "CloudLevel",
    CloudHeight => "CloudHeight",
    PrecLevel => "PrecLevel",
    PrecType => "PrecType",
    Turbulence => "Turbulence",
    TempPressLevel => "TempPressLevel",
    Temperature => "Temperature",
    Pressure => "Pressure",
    Haze => "Haze",
    LayerFix => "LayerFix",
    SeaState => "SeaState",
}

impl PropKey {
    /// Position and orientation components, which are rounded on assignment.
    pub fn is_coordinate(&self) -> bool {
        matches!(
            self,
            PropKey::XPos
                | PropKey::YPos
                | PropKey::ZPos
                | PropKey::XOri
                | PropKey::YOri
                | PropKey::ZOri
        )
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_variants() {
        assert_eq!(PropKey::from_name("AILevel"), PropKey::AiLevel);
        assert_eq!(PropKey::from_name("MisObjID"), PropKey::MisObjId);
        assert_eq!(PropKey::AiLevel.name(), "AILevel");
    }

    #[test]
    fn unknown_names_overflow() {
        let key = PropKey::from_name("CustomField");
        assert_eq!(key, PropKey::Other("CustomField".into()));
        assert_eq!(key.name(), "CustomField");
    }

    #[test]
    fn value_shapes() {
        assert_eq!(Value::from("x").shape(), "string");
        assert_eq!(Value::from(2).as_num(), Some(2.0));
        assert_eq!(Value::from(true), Value::Num(1.0));
        assert_eq!(Value::Lc(7).as_num(), None);
    }
}
