// Payload encoders for the logic kinds: entity, icon, timer, counter,
// activate/deactivate.
//
// All of them end in a target list (`count u32 | count x index u32`); the
// entity additionally carries an event list (`count u32 | count x
// (event_code u32, index u32)`), flattened from the per-event lists in
// event-code order with insertion order kept inside each event.

use crate::encode::{NO_REFERENCE, resolved, u8_field, u32_field};
use crate::error::Result;
use crate::item::Item;
use crate::mission::Mission;
use crate::props::{PropKey, Value};
use crate::types::ItemId;
use crate::wire::{ByteWriter, count_u32};

fn target_list(w: &mut ByteWriter, mission: &Mission, item: &Item) -> Result<()> {
    w.u32(count_u32("targets", item.targets().len())?);
    for &target in item.targets() {
        w.u32(resolved(mission, target)?.0);
    }
    Ok(())
}

fn event_list(w: &mut ByteWriter, mission: &Mission, item: &Item) -> Result<()> {
    let count: usize = item.events().map(|(_, targets)| targets.len()).sum();
    w.u32(count_u32("events", count)?);
    for (event, targets) in item.events() {
        for &target in targets {
            w.u32(event.code());
            w.u32(resolved(mission, target)?.0);
        }
    }
    Ok(())
}

/// `Enabled u8 | MisObjID u32 | targets | events`.
///
/// The owner reference always comes from the entity link; an entity with no
/// owner writes 0.
pub(crate) fn entity_payload(mission: &Mission, id: ItemId) -> Result<Vec<u8>> {
    let item = &mission[id];
    let owner = match mission.owner_of(id) {
        Some(owner) => resolved(mission, owner)?,
        None => NO_REFERENCE,
    };
    let mut w = ByteWriter::with_capacity(13 + 4 * item.targets().len());
    w.u8(u8_field(item, &PropKey::Enabled, 1)?);
    w.u32(owner.0);
    target_list(&mut w, mission, item)?;
    event_list(&mut w, mission, item)?;
    Ok(w.into_inner())
}

/// `(present u8, id u32)`: a localized-id Name/Desc, or `(0, 0)`.
fn localized(w: &mut ByteWriter, value: Option<&Value>) {
    match value {
        Some(&Value::Lc(id)) => {
            w.u8(1);
            w.u32(id);
        }
        _ => {
            w.u8(0);
            w.u32(0);
        }
    }
}

pub(crate) fn icon_payload(mission: &Mission, id: ItemId) -> Result<Vec<u8>> {
    let item = &mission[id];
    let coalitions = item.coalitions();
    let mut w = ByteWriter::with_capacity(26 + 4 * coalitions.len() + 4 * item.targets().len());
    w.u32(u32_field(item, &PropKey::IconId, 0)?);
    w.u8(u8_field(item, &PropKey::RColor, 0)?);
    w.u8(u8_field(item, &PropKey::GColor, 0)?);
    w.u8(u8_field(item, &PropKey::BColor, 0)?);
    w.u8(u8_field(item, &PropKey::LineType, 0)?);
    localized(&mut w, item.get(&PropKey::Name));
    localized(&mut w, item.get(&PropKey::Desc));
    w.u32(count_u32("coalitions", coalitions.len())?);
    for &coalition in coalitions {
        w.u32(coalition as u32);
    }
    target_list(&mut w, mission, item)?;
    Ok(w.into_inner())
}

pub(crate) fn timer_payload(mission: &Mission, id: ItemId) -> Result<Vec<u8>> {
    let item = &mission[id];
    let mut w = ByteWriter::with_capacity(14 + 4 * item.targets().len());
    w.u8(u8_field(item, &PropKey::Enabled, 1)?);
    w.f64(item.number_or(&PropKey::Time, 0.0)?);
    w.u8(u8_field(item, &PropKey::Random, 100)?);
    target_list(&mut w, mission, item)?;
    Ok(w.into_inner())
}

pub(crate) fn counter_payload(mission: &Mission, id: ItemId) -> Result<Vec<u8>> {
    let item = &mission[id];
    let mut w = ByteWriter::with_capacity(10 + 4 * item.targets().len());
    w.u8(u8_field(item, &PropKey::Enabled, 1)?);
    w.u32(u32_field(item, &PropKey::Counter, 1)?);
    w.u8(u8_field(item, &PropKey::Dropcount, 0)?);
    target_list(&mut w, mission, item)?;
    Ok(w.into_inner())
}

/// Activate and Deactivate share one layout.
pub(crate) fn switch_payload(mission: &Mission, id: ItemId) -> Result<Vec<u8>> {
    let item = &mission[id];
    let mut w = ByteWriter::with_capacity(5 + 4 * item.targets().len());
    w.u8(u8_field(item, &PropKey::Enabled, 1)?);
    target_list(&mut w, mission, item)?;
    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{EncodeContext, encode_item};
    use crate::error::{Error, StructuralError};
    use crate::types::{EventKind, ItemKind};
    use crate::wire::ByteReader;

    fn encoded_len(mission: &Mission, id: ItemId) -> usize {
        let mut ctx = EncodeContext::new();
        encode_item(mission, id, &mut ctx)
            .unwrap()
            .iter()
            .map(Vec::len)
            .sum()
    }

    fn index_all(mission: &mut Mission) {
        for slot in 0..mission.len() as u32 {
            mission.reference_index(ItemId(slot)).unwrap();
        }
    }

    #[test]
    fn logic_sizes_follow_link_counts() {
        let mut mission = Mission::new();
        let timer = mission.create_root(ItemKind::Timer);
        let counter = mission.create_root(ItemKind::Counter);
        let activate = mission.create_root(ItemKind::Activate);
        let deactivate = mission.create_root(ItemKind::Deactivate);
        for from in [timer, counter, activate, deactivate] {
            mission.add_target(from, timer).unwrap();
            mission.add_target(from, counter).unwrap();
        }
        index_all(&mut mission);

        assert_eq!(encoded_len(&mission, timer), 74 + 8);
        assert_eq!(encoded_len(&mission, counter), 70 + 8);
        assert_eq!(encoded_len(&mission, activate), 65 + 8);
        assert_eq!(encoded_len(&mission, deactivate), 65 + 8);
    }

    #[test]
    fn entity_size_and_event_order() {
        let mut mission = Mission::new();
        let plane = mission.create_root(ItemKind::Plane);
        let entity = mission.link_entity(plane).unwrap();
        let a = mission.create_root(ItemKind::Timer);
        let b = mission.create_root(ItemKind::Timer);
        mission.add_target(entity, a).unwrap();
        mission.add_event(entity, EventKind::OnPlaneLanded, b).unwrap();
        mission.add_event(entity, EventKind::OnPilotKilled, a).unwrap();
        mission.add_event(entity, EventKind::OnPlaneLanded, a).unwrap();
        index_all(&mut mission);

        let mut ctx = EncodeContext::new();
        let buffers = encode_item(&mission, entity, &mut ctx).unwrap();
        assert_eq!(buffers.iter().map(Vec::len).sum::<usize>(), 73 + 4 + 3 * 8);

        let ia = mission[a].index().unwrap().0;
        let ib = mission[b].index().unwrap().0;
        let mut r = ByteReader::new(&buffers[1]);
        assert_eq!(r.u8().unwrap(), 1);
        assert_eq!(r.u32().unwrap(), mission[plane].index().unwrap().0);
        assert_eq!(r.u32().unwrap(), 1);
        assert_eq!(r.u32().unwrap(), ia);
        assert_eq!(r.u32().unwrap(), 3);
        let pairs: Vec<(u32, u32)> = (0..3)
            .map(|_| (r.u32().unwrap(), r.u32().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(0, ia), (5, ib), (5, ia)]);
    }

    #[test]
    fn icon_layout() {
        let mut mission = Mission::new();
        let icon = mission.create_root(ItemKind::Icon);
        let item = &mut mission[icon];
        item.set(PropKey::IconId, 903).unwrap();
        item.set(PropKey::RColor, 255).unwrap();
        item.set_name(Value::Lc(12)).unwrap();
        item.set_desc("Waypoint").unwrap();
        item.set_coalitions(&[1.0, 2.0]);
        mission.add_target(icon, icon).unwrap();
        index_all(&mut mission);

        let mut ctx = EncodeContext::new();
        let buffers = encode_item(&mission, icon, &mut ctx).unwrap();
        assert_eq!(
            buffers.iter().map(Vec::len).sum::<usize>(),
            60 + 26 + 4 * 2 + 4
        );
        let mut r = ByteReader::new(&buffers[1]);
        assert_eq!(r.u32().unwrap(), 903);
        assert_eq!(r.bytes(4).unwrap(), vec![255, 0, 0, 0]);
        assert_eq!(r.u8().unwrap(), 1);
        assert_eq!(r.u32().unwrap(), 12);
        assert_eq!(r.u8().unwrap(), 0);
        assert_eq!(r.u32().unwrap(), 0);
        assert_eq!(r.u32().unwrap(), 2);
        assert_eq!(r.u32().unwrap(), 1);
        assert_eq!(r.u32().unwrap(), 2);
        // Desc is a plain string, so it went to the string table.
        assert_eq!(ctx.strings.entry(0), Some("Waypoint"));
    }

    #[test]
    fn unindexed_target_is_an_error() {
        let mut mission = Mission::new();
        let timer = mission.create_root(ItemKind::Timer);
        let counter = mission.create(ItemKind::Counter);
        mission.add_target(timer, counter).unwrap();
        mission.reference_index(timer).unwrap();
        let mut ctx = EncodeContext::new();
        assert!(matches!(
            encode_item(&mission, timer, &mut ctx),
            Err(Error::Structural(StructuralError::UnresolvedIndex(id))) if id == counter
        ));
    }

    #[test]
    fn stale_owner_property_is_not_emitted() {
        let mut mission = Mission::new();
        let entity = mission.create_root(ItemKind::Entity);
        mission[entity].set(PropKey::MisObjId, 77).unwrap();
        index_all(&mut mission);
        let mut ctx = EncodeContext::new();
        let buffers = encode_item(&mission, entity, &mut ctx).unwrap();
        let mut r = ByteReader::new(&buffers[1]);
        r.u8().unwrap();
        assert_eq!(r.u32().unwrap(), 0);
    }
}
