// Per-kind binary encoders for physical objects, plus the dispatch entry
// point for every kind.
//
// `encode_item` turns one item into an ordered list of byte buffers: the
// common 60-byte header first, then the kind's payload buffers. Object
// kinds (Block, Bridge, Flag, Plane, Vehicle) add the 9-byte object block
// and a fixed payload; logic kinds are in `logic.rs`, Options in
// `options.rs`. Every layout is an explicit sequence of `ByteWriter` calls.
//
// Encoders assume indices are already resolved for the item, its entity,
// and its link targets (the assembler does this before encoding); a missing
// index is a `StructuralError::UnresolvedIndex`, never a silent 0.
//
// Strings and damage profiles are interned into the run's `EncodeContext`
// as they are met, in field order: header Name, header Desc, Model, then
// payload strings.

use smallvec::{SmallVec, smallvec};

use crate::error::{Result, StructuralError, ValueError};
use crate::item::Item;
use crate::logic;
use crate::mission::Mission;
use crate::options;
use crate::props::{PropKey, Value};
use crate::tables::{DamageTable, NO_DAMAGE, NO_STRING, StringTable};
use crate::types::{ItemId, ItemKind, RefIndex, Vec3};
use crate::wire::ByteWriter;

pub const HEADER_LEN: usize = 60;
pub const OBJECT_BLOCK_LEN: usize = 9;

/// Reference slot value for "no item".
pub const NO_REFERENCE: RefIndex = RefIndex(0);

/// Encoded buffers for one item. Most kinds produce two or three.
pub type ItemBuffers = SmallVec<[Vec<u8>; 4]>;

/// Per-run symbol tables shared by every encoder call.
#[derive(Clone, Debug, Default)]
pub struct EncodeContext {
    pub strings: StringTable,
    pub damage: DamageTable,
}

impl EncodeContext {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Field helpers shared by all encoders
// ---------------------------------------------------------------------------

pub(crate) fn resolved(mission: &Mission, id: ItemId) -> Result<RefIndex, StructuralError> {
    mission
        .get(id)
        .and_then(Item::index)
        .ok_or(StructuralError::UnresolvedIndex(id))
}

pub(crate) fn u8_field(item: &Item, key: &PropKey, default: u8) -> Result<u8, ValueError> {
    Ok(item.number_or(key, f64::from(default))? as u8)
}

pub(crate) fn u16_field(item: &Item, key: &PropKey, default: u16) -> Result<u16, ValueError> {
    Ok(item.number_or(key, f64::from(default))? as u16)
}

pub(crate) fn u32_field(item: &Item, key: &PropKey, default: u32) -> Result<u32, ValueError> {
    Ok(item.number_or(key, f64::from(default))? as u32)
}

pub(crate) fn i32_field(item: &Item, key: &PropKey, default: i32) -> Result<i32, ValueError> {
    Ok(item.number_or(key, f64::from(default))? as i32)
}

pub(crate) fn f32_field(item: &Item, key: &PropKey, default: f32) -> Result<f32, ValueError> {
    Ok(item.number_or(key, f64::from(default))? as f32)
}

/// String-table reference for a text property, or `NO_STRING` when absent.
fn text_ref(item: &Item, key: &PropKey, strings: &mut StringTable) -> Result<u16> {
    match item.text(key)? {
        Some(text) => Ok(strings.intern(text)?),
        None => Ok(NO_STRING),
    }
}

/// Name/Desc reference: only string values go to the table. Localized ids
/// are written by kinds that have a field for them (see `logic.rs` Icon).
fn label_ref(value: Option<&Value>, strings: &mut StringTable) -> Result<u16, StructuralError> {
    match value {
        Some(Value::Str(s)) => strings.intern(s),
        _ => Ok(NO_STRING),
    }
}

fn damage_ref(item: &Item, damage: &mut DamageTable) -> Result<u16, StructuralError> {
    match item.damage().filter(|p| !p.is_empty()) {
        Some(profile) => damage.intern(profile),
        None => Ok(NO_DAMAGE),
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn type_code(item: &Item, id: ItemId) -> Result<u32, StructuralError> {
    match item.kind() {
        ItemKind::Group => Err(StructuralError::GroupEncoded { item: id }),
        kind => kind.type_code().ok_or_else(|| StructuralError::Unencodable {
            item: id,
            tag: kind.tag().to_owned(),
        }),
    }
}

/// Encode one item: header buffer, then payload buffers.
pub fn encode_item(mission: &Mission, id: ItemId, ctx: &mut EncodeContext) -> Result<ItemBuffers> {
    let item = &mission[id];
    let code = type_code(item, id)?;
    let index = resolved(mission, id)?;
    let mut buffers: ItemBuffers = smallvec![header(item, code, index, &mut ctx.strings)?];

    match item.kind() {
        ItemKind::Block | ItemKind::Bridge => {
            buffers.push(object_block(mission, id, &mut ctx.strings)?);
            buffers.push(block_payload(item, ctx)?);
        }
        ItemKind::Flag => {
            buffers.push(object_block(mission, id, &mut ctx.strings)?);
            buffers.push(flag_payload(item)?);
        }
        ItemKind::Plane => {
            buffers.push(object_block(mission, id, &mut ctx.strings)?);
            buffers.push(plane_payload(item, ctx)?);
        }
        ItemKind::Vehicle => {
            buffers.push(object_block(mission, id, &mut ctx.strings)?);
            buffers.push(vehicle_payload(item, ctx)?);
        }
        ItemKind::Entity => buffers.push(logic::entity_payload(mission, id)?),
        ItemKind::Icon => buffers.push(logic::icon_payload(mission, id)?),
        ItemKind::Timer => buffers.push(logic::timer_payload(mission, id)?),
        ItemKind::Counter => buffers.push(logic::counter_payload(mission, id)?),
        ItemKind::Activate | ItemKind::Deactivate => {
            buffers.push(logic::switch_payload(mission, id)?)
        }
        ItemKind::Options => buffers.push(options::options_payload(item)?),
        // Rejected by `type_code`.
        ItemKind::Group | ItemKind::Other(_) => {}
    }
    Ok(buffers)
}

// ---------------------------------------------------------------------------
// Header and object block
// ---------------------------------------------------------------------------

fn header(
    item: &Item,
    code: u32,
    index: RefIndex,
    strings: &mut StringTable,
) -> Result<Vec<u8>, StructuralError> {
    let mut w = ByteWriter::with_capacity(HEADER_LEN);
    w.u32(code);
    w.u32(index.0);
    let Vec3 { x, y, z } = item.position();
    w.f64(x);
    w.f64(y);
    w.f64(z);
    let Vec3 { x, y, z } = item.orientation();
    w.f64(x);
    w.f64(y);
    w.f64(z);
    w.u16(label_ref(item.get(&PropKey::Name), strings)?);
    w.u16(label_ref(item.get(&PropKey::Desc), strings)?);
    Ok(w.into_inner())
}

/// `model u16 | reserved u16 | linked_entity u32 | flags u8`.
fn object_block(mission: &Mission, id: ItemId, strings: &mut StringTable) -> Result<Vec<u8>> {
    let item = &mission[id];
    let model = text_ref(item, &PropKey::Model, strings)?;
    let linked = match item.entity() {
        Some(entity) => resolved(mission, entity)?,
        None => NO_REFERENCE,
    };
    let delete_after_death = item.number_or(&PropKey::DeleteAfterDeath, 0.0)? != 0.0;

    let mut w = ByteWriter::with_capacity(OBJECT_BLOCK_LEN);
    w.u16(model);
    w.u16(0);
    w.u32(linked.0);
    w.u8(u8::from(delete_after_death));
    Ok(w.into_inner())
}

// ---------------------------------------------------------------------------
// Object payloads
// ---------------------------------------------------------------------------

fn block_payload(item: &Item, ctx: &mut EncodeContext) -> Result<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(12);
    w.u16(u16_field(item, &PropKey::Country, 0)?);
    w.u32(u32_field(item, &PropKey::Durability, 25_000)?);
    w.u8(u8_field(item, &PropKey::DamageThreshold, 1)?);
    w.u8(u8_field(item, &PropKey::DamageReport, 50)?);
    w.u16(text_ref(item, &PropKey::Script, &mut ctx.strings)?);
    w.u16(damage_ref(item, &mut ctx.damage)?);
    Ok(w.into_inner())
}

/// Flags inline their script path instead of referencing the string table.
fn flag_payload(item: &Item) -> Result<Vec<u8>> {
    let script = item.text(&PropKey::Script)?.unwrap_or("");
    let mut w = ByteWriter::with_capacity(27 + script.len());
    w.u16(u16_field(item, &PropKey::Country, 0)?);
    w.f32(f32_field(item, &PropKey::StartHeight, 0.0)?);
    w.f32(f32_field(item, &PropKey::SpeedFactor, 1.0)?);
    w.f32(f32_field(item, &PropKey::BlockThreshold, 0.0)?);
    w.f64(item.number_or(&PropKey::Radius, 0.0)?);
    w.u8(u8_field(item, &PropKey::Type, 0)?);
    w.prefixed_str("flag script", script)?;
    Ok(w.into_inner())
}

fn plane_payload(item: &Item, ctx: &mut EncodeContext) -> Result<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(29);
    w.u16(u16_field(item, &PropKey::Country, 0)?);
    w.u16(text_ref(item, &PropKey::Script, &mut ctx.strings)?);
    w.u8(u8_field(item, &PropKey::DamageThreshold, 1)?);
    w.u8(u8_field(item, &PropKey::DamageReport, 50)?);
    w.u8(u8_field(item, &PropKey::AiLevel, 2)?);
    w.u8(u8_field(item, &PropKey::Vulnerable, 1)?);
    w.u8(u8_field(item, &PropKey::Engageable, 1)?);
    w.u8(u8_field(item, &PropKey::LimitAmmo, 1)?);
    w.u8(u8_field(item, &PropKey::CoopStart, 0)?);
    w.u8(u8_field(item, &PropKey::StartInAir, 0)?);
    w.u8(u8_field(item, &PropKey::NumberInFormation, 0)?);
    w.u8(u8_field(item, &PropKey::Callsign, 0)?);
    w.u8(u8_field(item, &PropKey::Callnum, 0)?);
    w.u16(text_ref(item, &PropKey::Skin, &mut ctx.strings)?);
    w.u16(u16_field(item, &PropKey::PayloadId, 0)?);
    w.u32(u32_field(item, &PropKey::WmMask, 1)?);
    w.f32(f32_field(item, &PropKey::Fuel, 1.0)?);
    w.u16(damage_ref(item, &mut ctx.damage)?);
    Ok(w.into_inner())
}

fn vehicle_payload(item: &Item, ctx: &mut EncodeContext) -> Result<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(19);
    w.u16(u16_field(item, &PropKey::Country, 0)?);
    w.u16(text_ref(item, &PropKey::Script, &mut ctx.strings)?);
    w.u8(u8_field(item, &PropKey::DamageThreshold, 1)?);
    w.u8(u8_field(item, &PropKey::DamageReport, 50)?);
    w.u8(u8_field(item, &PropKey::AiLevel, 2)?);
    w.u8(u8_field(item, &PropKey::Vulnerable, 1)?);
    w.u8(u8_field(item, &PropKey::Engageable, 1)?);
    w.u8(u8_field(item, &PropKey::LimitAmmo, 1)?);
    w.u8(u8_field(item, &PropKey::NumberInFormation, 0)?);
    w.u8(u8_field(item, &PropKey::CoopStart, 0)?);
    w.i32(i32_field(item, &PropKey::Spotter, -1)?);
    w.u8(u8_field(item, &PropKey::BeaconChannel, 0)?);
    w.u16(damage_ref(item, &mut ctx.damage)?);
    Ok(w.into_inner())
}
