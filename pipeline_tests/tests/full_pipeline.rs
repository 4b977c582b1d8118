// End-to-end scenarios: block text and builder calls in, binary container
// out, decoded back with `pipeline_tests::decode` and checked field by field.

use pipeline_tests::{Container, decode};
use sortie_mission::{
    Assembler, CountryCoalition, Error, EventKind, ItemId, ItemKind, Mission, MissionConfig,
    PropKey, StructuralError, Value, WindLayer,
};
use sortie_text::{ParseError, parse_str};

const AIRFIELD: &str = r#"
# Mission File Version = 1.0;

Options
{
  Date = 19.11.1942;
  Time = 6:45:0;
  HMap = "graphics\LANDSCAPE\height.raw";
  SeasonPrefix = "wi";
  Temperature = -15;
  SeaState = 0;
}

Block
{
  Name = "Hangar";
  Model = "graphics\blocks\arf_hangars_1.mgm";
  Script = "LuaScripts\WorldObjects\arf_hangars_1.txt";
  XPos = 120500.125;
  ZPos = 98000.5;
  YOri = 90;
  Damaged
  {
    0 = 1;
    2 = 0.5;
  }
}

Block
{
  Name = "Fuel tank";
  Model = "graphics\blocks\arf_tank.mgm";
  Script = "LuaScripts\WorldObjects\arf_tank.txt";
  XPos = 120560;
  ZPos = 98010;
  Damaged
  {
    2 = 0.5;
    0 = 1;
  }
}

Vehicle
{
  Name = "Flak";
  Model = "graphics\artillery\52k\52k.mgm";
  Script = "LuaScripts\WorldObjects\vehicles\52k.txt";
  Country = 101;
  AILevel = 3;
  XPos = 120600;
  ZPos = 98100;
}
"#;

fn assemble(mission: &mut Mission) -> (Vec<u8>, Container) {
    let assembly = Assembler::default().build(mission).unwrap();
    let bytes = assembly.to_bytes().unwrap();
    let container = decode(&bytes, assembly.item_count()).unwrap();
    (bytes, container)
}

#[test]
fn parsed_airfield_assembles() {
    let mut mission = parse_str(AIRFIELD).unwrap();
    assert_eq!(mission.roots().len(), 4);
    let (_, container) = assemble(&mut mission);

    let codes: Vec<u32> = container.items.iter().map(|i| i.type_code).collect();
    assert_eq!(codes, vec![1, 2, 2, 6]);
    let indices: Vec<u32> = container.items.iter().map(|i| i.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);

    let options_len = 60 + 81 + "graphics\\LANDSCAPE\\height.raw".len() + "wi".len();
    let sizes: Vec<usize> = container.items.iter().map(|i| i.len).collect();
    assert_eq!(sizes, vec![options_len, 81, 81, 88]);

    let hangar = &container.items[1];
    assert_eq!(hangar.position, [120500.13, 0.0, 98000.5]);
    assert_eq!(hangar.orientation, [0.0, 90.0, 0.0]);
    assert_eq!(container.string(hangar.name), Some("Hangar"));
    assert_eq!(
        container.string(hangar.model.unwrap()),
        Some("graphics\\blocks\\arf_hangars_1.mgm")
    );
    assert_eq!(hangar.linked_entity, Some(0));

    // Both blocks fold to the same damage signature.
    assert_eq!(container.damage, vec![vec![(0, 255), (2, 128)]]);
    assert_eq!(container.damage_width, 2);
    assert_eq!(container.free_damage_slots, Some(0));
}

#[test]
fn string_table_interns_in_encounter_order() {
    let mut mission = parse_str(AIRFIELD).unwrap();
    let (_, container) = assemble(&mut mission);
    let texts: Vec<&str> = container.strings.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec![
        "Hangar",
        "graphics\\blocks\\arf_hangars_1.mgm",
        "LuaScripts\\WorldObjects\\arf_hangars_1.txt",
        "Fuel tank",
        "graphics\\blocks\\arf_tank.mgm",
        "LuaScripts\\WorldObjects\\arf_tank.txt",
        "Flak",
        "graphics\\artillery\\52k\\52k.mgm",
        "LuaScripts\\WorldObjects\\vehicles\\52k.txt",
    ]);
    assert!(container.strings.iter().all(|e| e.usage == 1));
    let widest = texts.iter().map(|t| t.len()).max().unwrap();
    assert_eq!(container.string_width as usize, widest);
}

/// A flak emplacement whose destruction counts toward a kill counter,
/// with a timer loop that re-arms itself.
fn build_flak_trigger(mission: &mut Mission) -> [ItemId; 6] {
    let flak = mission.create_root(ItemKind::Vehicle);
    mission[flak].set_name("Flak").unwrap();
    mission[flak].set_position((1000.0, 2000.0));
    let entity = mission.link_entity(flak).unwrap();

    let counter = mission.create_root(ItemKind::Counter);
    mission[counter].set(PropKey::Counter, 3).unwrap();
    let activate = mission.create_root(ItemKind::Activate);
    let timer = mission.create_root(ItemKind::Timer);
    mission[timer].set(PropKey::Time, 60.0).unwrap();
    let icon = mission.create_root(ItemKind::Icon);
    mission[icon].set_name(Value::Lc(101)).unwrap();
    mission[icon].set_coalitions(&[1.0, 2.0]);

    mission.add_event(entity, EventKind::OnKilled, counter).unwrap();
    mission
        .add_event_named(entity, "OnPlaneSpawned", timer)
        .unwrap();
    mission.add_event(entity, EventKind::OnDamaged, icon).unwrap();
    mission.add_target(counter, activate).unwrap();
    mission.add_target(activate, timer).unwrap();
    mission.add_target(timer, timer).unwrap();
    mission.add_target(icon, flak).unwrap();
    [flak, entity, counter, activate, timer, icon]
}

#[test]
fn trigger_graph_cross_references() {
    let mut mission = Mission::new();
    let [flak, entity, counter, activate, timer, icon] = build_flak_trigger(&mut mission);
    let (_, container) = assemble(&mut mission);

    let index = |id: ItemId| mission[id].index().unwrap().0;
    assert_eq!(index(flak), 1);
    assert_eq!(index(entity), 2);

    let codes: Vec<u32> = container.items.iter().map(|i| i.type_code).collect();
    assert_eq!(codes, vec![6, 7, 10, 11, 9, 8]);

    let flak_rec = container.item_by_index(index(flak)).unwrap();
    assert_eq!(flak_rec.linked_entity, Some(index(entity)));
    assert_eq!(flak_rec.position, [1000.0, 0.0, 2000.0]);

    let entity_rec = container.item_by_index(index(entity)).unwrap();
    assert_eq!(entity_rec.owner, Some(index(flak)));
    assert_eq!(entity_rec.position, flak_rec.position);
    assert_eq!(entity_rec.events, vec![
        (12, index(icon)),
        (13, index(counter)),
        (20, index(timer)),
    ]);
    assert_eq!(entity_rec.len, 73 + 3 * 8);

    assert_eq!(
        container.item_by_index(index(counter)).unwrap().targets,
        vec![index(activate)]
    );
    let timer_rec = container.item_by_index(index(timer)).unwrap();
    assert_eq!(timer_rec.targets, vec![index(timer)]);
    assert_eq!(timer_rec.len, 74 + 4);

    let icon_rec = container.item_by_index(index(icon)).unwrap();
    assert_eq!(icon_rec.targets, vec![index(flak)]);
    assert_eq!(icon_rec.len, 60 + 26 + 2 * 4 + 4);
    // Localized names are not string-table entries.
    assert_eq!(icon_rec.name, 0xFFFF);
}

#[test]
fn every_emitted_reference_resolves() {
    let mut mission = Mission::new();
    build_flak_trigger(&mut mission);
    let (_, container) = assemble(&mut mission);

    let mut seen: Vec<u32> = container.items.iter().map(|i| i.index).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), container.items.len(), "indices are unique");
    assert!(!seen.contains(&0));

    for item in &container.items {
        let refs = item
            .targets
            .iter()
            .chain(item.events.iter().map(|(_, i)| i))
            .chain(item.owner.iter());
        for r in refs {
            assert!(seen.contains(r), "reference {r} has no item");
        }
    }
}

#[test]
fn identical_missions_assemble_identically() {
    let mut first = Mission::new();
    build_flak_trigger(&mut first);
    let mut second = Mission::new();
    build_flak_trigger(&mut second);
    let (a, _) = assemble(&mut first);
    let (b, _) = assemble(&mut second);
    assert_eq!(a, b);
}

#[test]
fn group_in_text_aborts_assembly() {
    let mut mission = parse_str("Group { Name = \"Base\"; Block { Name = \"Hut\"; } }").unwrap();
    let result = Assembler::default().assemble(&mut mission);
    assert!(matches!(
        result,
        Err(Error::Structural(StructuralError::GroupEncoded { .. }))
    ));
    assert_eq!(mission.issued_indices(), 0);
}

#[test]
fn unknown_tag_parses_but_does_not_encode() {
    let mut mission = parse_str("Airfield { Name = \"Kalach\"; }").unwrap();
    let root = mission.roots()[0];
    assert_eq!(mission[root].kind(), &ItemKind::Other("Airfield".into()));
    assert!(matches!(
        Assembler::default().assemble(&mut mission),
        Err(Error::Structural(StructuralError::Unencodable { .. }))
    ));
}

#[test]
fn options_records_and_defaults() {
    let mut mission = parse_str(
        "Options { Date = 1.7.1943; Time = \"5:0:0\"; GuiMap = \"kuban\"; }",
    )
    .unwrap();
    let options = mission.roots()[0];
    mission[options]
        .add_wind_layer(WindLayer {
            height: 0.0,
            direction: 45.0,
            speed: 2.0,
        })
        .unwrap();
    mission[options]
        .add_country(CountryCoalition {
            country: 101,
            coalition: 1,
        })
        .unwrap();

    let (bytes, container) = assemble(&mut mission);
    assert_eq!(container.items[0].len, 60 + 81 + 5 + 12 + 4);

    // Date and time fields sit right after the header.
    assert_eq!(&bytes[60..67], &[1, 7, 0x97, 0x07, 5, 0, 0]);
}

#[test]
fn options_without_date_fail_whole_assembly() {
    let mut mission = parse_str("Block { Name = \"A\"; }\nOptions { Time = 1:0:0; }").unwrap();
    assert!(matches!(
        Assembler::default().assemble(&mut mission),
        Err(Error::Value(_))
    ));
}

#[test]
fn padded_string_table_with_custom_minimum() {
    let mut mission = parse_str("MCU_Timer { Name = \"T\"; }").unwrap();
    let config = MissionConfig {
        min_string_entries: 8,
        ..MissionConfig::default()
    };
    let assembly = Assembler::from_config(&config).build(&mut mission).unwrap();
    let bytes = assembly.to_bytes().unwrap();
    let container = decode(&bytes, assembly.item_count()).unwrap();
    assert_eq!(container.strings.len(), 8);
    assert_eq!(container.string(0), Some("T"));
    assert!(container.strings[1..].iter().all(|e| e.usage == 0 && e.text.is_empty()));
}

#[test]
fn text_errors_surface_with_lines() {
    let err = parse_str("Block\n{\n  Name = \"X\";\n").unwrap_err();
    assert!(matches!(err, ParseError::Unterminated { line: 1, .. }));
    let err = parse_str("Block {\n  Model = \"a\";\n}\n}\n").unwrap_err();
    assert_eq!(err.line(), Some(4));
}

#[test]
fn parsed_and_built_entities_mix() {
    let mut mission = parse_str(AIRFIELD).unwrap();
    let hangar = mission.roots()[1];
    let entity = mission.link_entity(hangar).unwrap();
    let (_, container) = assemble(&mut mission);

    // Linking indexed the hangar first, so the walk order and the index
    // order no longer coincide.
    let codes: Vec<u32> = container.items.iter().map(|i| i.type_code).collect();
    assert_eq!(codes, vec![1, 2, 7, 2, 6]);
    let hangar_rec = &container.items[1];
    assert_eq!(hangar_rec.index, 1);
    assert_eq!(hangar_rec.linked_entity, Some(2));
    assert_eq!(container.items[2].owner, Some(1));
    assert_eq!(container.items[0].index, 3);
    assert_eq!(mission[entity].index().unwrap().0, 2);
}

#[test]
fn parsed_entity_references_use_run_indices() {
    let src = "
Block { Name = \"Depot\"; Index = 40; LinkTrId = 41; }
MCU_TR_Entity { Index = 41; MisObjID = 40; }
MCU_Timer { Index = 42; Time = 10; }
";
    let mut mission = parse_str(src).unwrap();
    let (_, container) = assemble(&mut mission);

    let codes: Vec<u32> = container.items.iter().map(|i| i.type_code).collect();
    assert_eq!(codes, vec![2, 7, 9]);
    let block = &container.items[0];
    let entity = &container.items[1];
    assert_eq!(block.linked_entity, Some(entity.index));
    assert_eq!(entity.owner, Some(block.index));
    let indices: Vec<u32> = container.items.iter().map(|i| i.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
}

#[test]
fn failed_parse_does_not_reach_the_container() {
    let mut mission = Mission::new();
    let kept = mission.create_root(ItemKind::Block);
    mission[kept].set_name("Kept").unwrap();
    let err = sortie_text::Parser::new(&mut mission)
        .parse_into("Block { Name = \"A\"; }\nBlock { Name = \"B\";")
        .unwrap_err();
    assert!(matches!(err, ParseError::Unterminated { .. }));

    let (_, container) = assemble(&mut mission);
    assert_eq!(container.items.len(), 1);
    assert_eq!(container.string(container.items[0].name), Some("Kept"));
}

#[test]
fn index_space_exhaustion_is_reported() {
    let config = MissionConfig {
        index_seed: u32::MAX - 1,
        ..MissionConfig::default()
    };
    let mut mission = sortie_text::parse_str_with("Block { }\nBlock { }", &config).unwrap();
    let result = Assembler::from_config(&config).assemble(&mut mission);
    assert!(matches!(
        result,
        Err(Error::Structural(StructuralError::IndicesExhausted { .. }))
    ));
    assert_eq!(mission.issued_indices(), 0);
}
