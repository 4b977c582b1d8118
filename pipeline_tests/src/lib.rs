// Test-only decoder for assembled mission containers.
//
// Walks the binary output of `sortie_mission::Assembler` back into plain
// records so the integration tests can assert on headers, link lists, and
// the symbol tables without hand-computing byte offsets. Payload fields the
// tests don't inspect are skipped by length; the layouts mirror the
// encoders in `sortie_mission::encode`, `logic`, and `options`.
//
// The item stream has no count prefix, so callers pass the item count
// (`Assembly::item_count`).
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::io;

use sortie_mission::wire::ByteReader;

/// One decoded item: the common header plus the cross-reference fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemRecord {
    pub type_code: u32,
    pub index: u32,
    pub position: [f64; 3],
    pub orientation: [f64; 3],
    pub name: u16,
    pub desc: u16,
    pub model: Option<u16>,
    /// Object kinds: the linked entity's index (0 when none).
    pub linked_entity: Option<u32>,
    /// Entity kind: the owning object's index.
    pub owner: Option<u32>,
    pub targets: Vec<u32>,
    pub events: Vec<(u32, u32)>,
    /// Encoded size in bytes.
    pub len: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringEntry {
    pub usage: u16,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct Container {
    pub items: Vec<ItemRecord>,
    pub strings: Vec<StringEntry>,
    pub string_width: u32,
    pub damage: Vec<Vec<(u8, u8)>>,
    pub damage_width: u32,
    pub free_damage_slots: Option<u32>,
}

impl Container {
    /// String-table text for a reference, `None` for 0xFFFF or out of range.
    pub fn string(&self, index: u16) -> Option<&str> {
        self.strings
            .get(usize::from(index))
            .map(|entry| entry.text.as_str())
    }

    pub fn item_by_index(&self, index: u32) -> Option<&ItemRecord> {
        self.items.iter().find(|item| item.index == index)
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn skip(r: &mut ByteReader<'_>, len: usize) -> io::Result<()> {
    r.bytes(len).map(|_| ())
}

fn target_list(r: &mut ByteReader<'_>) -> io::Result<Vec<u32>> {
    let count = r.u32()?;
    (0..count).map(|_| r.u32()).collect()
}

fn event_list(r: &mut ByteReader<'_>) -> io::Result<Vec<(u32, u32)>> {
    let count = r.u32()?;
    (0..count)
        .map(|_| {
            let code = r.u32()?;
            let index = r.u32()?;
            Ok((code, index))
        })
        .collect()
}

fn decode_item(r: &mut ByteReader<'_>) -> io::Result<ItemRecord> {
    let start = r.position();
    let type_code = r.u32()?;
    let index = r.u32()?;
    let position = [r.f64()?, r.f64()?, r.f64()?];
    let orientation = [r.f64()?, r.f64()?, r.f64()?];
    let name = r.u16()?;
    let desc = r.u16()?;

    let mut record = ItemRecord {
        type_code,
        index,
        position,
        orientation,
        name,
        desc,
        model: None,
        linked_entity: None,
        owner: None,
        targets: Vec::new(),
        events: Vec::new(),
        len: 0,
    };

    if (2..=6).contains(&type_code) {
        record.model = Some(r.u16()?);
        r.u16()?;
        record.linked_entity = Some(r.u32()?);
        r.u8()?;
    }

    match type_code {
        1 => {
            skip(r, 7)?;
            for _ in 0..7 {
                r.prefixed_str()?;
            }
            skip(r, 16 + 20 + 2)?;
            let winds = r.u32()? as usize;
            skip(r, winds * 12)?;
            let countries = r.u32()? as usize;
            skip(r, countries * 4)?;
        }
        2 | 3 => skip(r, 12)?,
        4 => {
            skip(r, 23)?;
            r.prefixed_str()?;
        }
        5 => skip(r, 29)?,
        6 => skip(r, 19)?,
        7 => {
            r.u8()?;
            record.owner = Some(r.u32()?);
            record.targets = target_list(r)?;
            record.events = event_list(r)?;
        }
        8 => {
            skip(r, 18)?;
            let coalitions = r.u32()? as usize;
            skip(r, coalitions * 4)?;
            record.targets = target_list(r)?;
        }
        9 => {
            skip(r, 10)?;
            record.targets = target_list(r)?;
        }
        10 => {
            skip(r, 6)?;
            record.targets = target_list(r)?;
        }
        11 | 12 => {
            skip(r, 1)?;
            record.targets = target_list(r)?;
        }
        other => return Err(invalid(format!("unknown type code {other}"))),
    }

    record.len = r.position() - start;
    Ok(record)
}

fn decode_strings(r: &mut ByteReader<'_>) -> io::Result<(u32, Vec<StringEntry>)> {
    let width = r.u32()?;
    let count = r.u16()?;
    let usage: Vec<u16> = (0..count).map(|_| r.u16()).collect::<io::Result<_>>()?;
    let mut entries = Vec::with_capacity(usize::from(count));
    for usage in usage {
        let raw = r.bytes(width as usize)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = String::from_utf8(raw[..end].to_vec())
            .map_err(|e| invalid(format!("string entry is not UTF-8: {e}")))?;
        entries.push(StringEntry { usage, text });
    }
    Ok((width, entries))
}

type DamageSection = (u32, Option<u32>, Vec<Vec<(u8, u8)>>);

fn decode_damage(r: &mut ByteReader<'_>) -> io::Result<DamageSection> {
    let width = r.u32()?;
    let count = r.u16()?;
    if count == 0 {
        return Ok((width, None, Vec::new()));
    }
    let free = r.u32()?;
    let mut entries = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let used = r.u8()?;
        let mut pairs = Vec::with_capacity(width as usize);
        for _ in 0..width {
            pairs.push((r.u8()?, r.u8()?));
        }
        pairs.truncate(usize::from(used));
        entries.push(pairs);
    }
    Ok((width, Some(free), entries))
}

/// Decode a whole container holding `item_count` items.
pub fn decode(bytes: &[u8], item_count: usize) -> io::Result<Container> {
    let mut r = ByteReader::new(bytes);
    let items = (0..item_count)
        .map(|_| decode_item(&mut r))
        .collect::<io::Result<Vec<_>>>()?;
    let (string_width, strings) = decode_strings(&mut r)?;
    let (damage_width, free_damage_slots, damage) = decode_damage(&mut r)?;
    if r.remaining() != 0 {
        return Err(invalid(format!("{} trailing bytes", r.remaining())));
    }
    Ok(Container {
        items,
        strings,
        string_width,
        damage,
        damage_width,
        free_damage_slots,
    })
}
