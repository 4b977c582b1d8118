// Per-run symbol tables: the string table and the damage-signature table.
//
// Both are append-only interning tables: a value gets a small u16 index the
// first time an encoder asks for it, and the same index on every later
// request. Nothing is ever removed or rewritten, so an index handed out
// mid-assembly stays valid for the rest of the run. A fresh pair of tables
// is created for every assembly (see `assembler.rs`).
//
// Lookup maps are `FxHashMap`s, used only for membership; output order is
// the `entries` vector, i.e. first-interned-first.
//
// Binary layouts:
// - String table: `[max_len u32][count u16][count x usage u16]
//   [count x entry, max_len bytes zero-padded]`, where
//   `count = max(min_entries, interned)`.
// - Damage table: `[max_pairs u32][count u16]`, then only if `count > 0`:
//   `[free_slots u32][count x (pair_count u8, max_pairs x (key u8, value u8))]`.
//   Unused pair slots are `(0xFF, 0x00)`.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::error::{ConstructionError, StructuralError};
use crate::wire::{ByteWriter, count_u16, count_u32};

/// Binary encoding of "no string".
pub const NO_STRING: u16 = 0xFFFF;

/// Binary encoding of "no damage profile".
pub const NO_DAMAGE: u16 = 0xFFFF;

/// Key byte marking an unused damage pair slot.
pub const UNUSED_DAMAGE_KEY: u8 = 0xFF;

// ---------------------------------------------------------------------------
// String table
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct StringTable {
    entries: Vec<String>,
    usage: Vec<u16>,
    lookup: FxHashMap<String, u16>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its stable index and bumping its usage count.
    pub fn intern(&mut self, s: &str) -> Result<u16, StructuralError> {
        if let Some(&index) = self.lookup.get(s) {
            let slot = &mut self.usage[usize::from(index)];
            *slot = slot.saturating_add(1);
            return Ok(index);
        }
        // 0xFFFF is the "no string" marker, so the last usable index is 0xFFFE.
        if self.entries.len() >= usize::from(NO_STRING) {
            return Err(StructuralError::TableFull { table: "string" });
        }
        let index = count_u16("string entries", self.entries.len())?;
        self.entries.push(s.to_owned());
        self.usage.push(1);
        self.lookup.insert(s.to_owned(), index);
        Ok(index)
    }

    pub fn index_of(&self, s: &str) -> Option<u16> {
        self.lookup.get(s).copied()
    }

    pub fn entry(&self, index: u16) -> Option<&str> {
        self.entries.get(usize::from(index)).map(String::as_str)
    }

    pub fn usage(&self, index: u16) -> Option<u16> {
        self.usage.get(usize::from(index)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest entry in bytes.
    pub fn max_entry_len(&self) -> usize {
        self.entries.iter().map(String::len).max().unwrap_or(0)
    }

    /// Serialize the table, padding to at least `min_entries` entries.
    pub fn encode(&self, min_entries: u16) -> Result<Vec<u8>, StructuralError> {
        let width = self.max_entry_len();
        let count = count_u16("string entries", self.entries.len())?.max(min_entries);
        let padding = usize::from(count) - self.entries.len();

        let mut w = ByteWriter::with_capacity(6 + usize::from(count) * (2 + width));
        w.u32(count_u32("string width", width)?);
        w.u16(count);
        for &usage in &self.usage {
            w.u16(usage);
        }
        for _ in 0..padding {
            w.u16(0);
        }
        for entry in &self.entries {
            w.padded(entry.as_bytes(), width);
        }
        for _ in 0..padding {
            w.padded(&[], width);
        }
        Ok(w.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Damage profiles and the damage table
// ---------------------------------------------------------------------------

/// Per-component damage amounts for one object, keyed by component id.
///
/// Amounts are in [0, 1]; component ids are 0..=254 (0xFF marks unused slots
/// in the binary table).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DamageProfile {
    amounts: BTreeMap<u8, f64>,
}

impl DamageProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, component: u32, amount: f64) -> Result<(), ConstructionError> {
        let key = u8::try_from(component)
            .ok()
            .filter(|&k| k != UNUSED_DAMAGE_KEY)
            .ok_or(ConstructionError::DamageComponent(component))?;
        if !(0.0..=1.0).contains(&amount) {
            return Err(ConstructionError::DamageAmount(amount));
        }
        self.amounts.insert(key, amount);
        Ok(())
    }

    pub fn get(&self, component: u8) -> Option<f64> {
        self.amounts.get(&component).copied()
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Normalized form: pairs sorted by component, amounts scaled to 0..=255.
    pub fn signature(&self) -> DamageSignature {
        DamageSignature(
            self.amounts
                .iter()
                .map(|(&key, &amount)| (key, (amount * 255.0).round() as u8))
                .collect(),
        )
    }
}

/// Structural identity of a damage profile as stored in the table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DamageSignature(Vec<(u8, u8)>);

impl DamageSignature {
    pub fn pairs(&self) -> &[(u8, u8)] {
        &self.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct DamageTable {
    entries: Vec<DamageSignature>,
    lookup: FxHashMap<DamageSignature, u16>,
}

impl DamageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a profile by signature. Equal signatures share one index.
    pub fn intern(&mut self, profile: &DamageProfile) -> Result<u16, StructuralError> {
        let signature = profile.signature();
        if let Some(&index) = self.lookup.get(&signature) {
            return Ok(index);
        }
        if self.entries.len() >= usize::from(NO_DAMAGE) {
            return Err(StructuralError::TableFull { table: "damage" });
        }
        let index = count_u16("damage entries", self.entries.len())?;
        self.entries.push(signature.clone());
        self.lookup.insert(signature, index);
        Ok(index)
    }

    pub fn entry(&self, index: u16) -> Option<&DamageSignature> {
        self.entries.get(usize::from(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Widest entry, in pairs. Every entry is padded to this width.
    pub fn max_pairs(&self) -> usize {
        self.entries.iter().map(|e| e.0.len()).max().unwrap_or(0)
    }

    pub fn encode(&self) -> Result<Vec<u8>, StructuralError> {
        let max_pairs = self.max_pairs();
        let count = count_u16("damage entries", self.entries.len())?;

        let mut w = ByteWriter::with_capacity(10 + self.entries.len() * (1 + 2 * max_pairs));
        w.u32(count_u32("damage pairs", max_pairs)?);
        w.u16(count);
        if count == 0 {
            return Ok(w.into_inner());
        }

        let used: usize = self.entries.iter().map(|e| e.0.len()).sum();
        w.u32(count_u32("free damage slots", self.entries.len() * max_pairs - used)?);
        for entry in &self.entries {
            // Pair keys are 0..=254, so a profile holds at most 255 pairs.
            w.u8(entry.0.len() as u8);
            for &(key, value) in &entry.0 {
                w.u8(key);
                w.u8(value);
            }
            for _ in entry.0.len()..max_pairs {
                w.u8(UNUSED_DAMAGE_KEY);
                w.u8(0);
            }
        }
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteReader;

    #[test]
    fn interning_is_stable_and_counts_usage() {
        let mut table = StringTable::new();
        let a = table.intern("graphics\\blocks\\hangar.mgm").unwrap();
        let b = table.intern("Hangar").unwrap();
        let again = table.intern("graphics\\blocks\\hangar.mgm").unwrap();
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(table.usage(a), Some(2));
        assert_eq!(table.usage(b), Some(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn string_table_layout() {
        let mut table = StringTable::new();
        table.intern("ab").unwrap();
        table.intern("xyz").unwrap();
        table.intern("ab").unwrap();
        let bytes = table.encode(0).unwrap();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u32().unwrap(), 3);
        assert_eq!(r.u16().unwrap(), 2);
        assert_eq!(r.u16().unwrap(), 2);
        assert_eq!(r.u16().unwrap(), 1);
        assert_eq!(r.bytes(3).unwrap(), b"ab\0");
        assert_eq!(r.bytes(3).unwrap(), b"xyz");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn string_table_pads_to_minimum() {
        let mut table = StringTable::new();
        table.intern("abcd").unwrap();
        let bytes = table.encode(3).unwrap();
        // 4 + 2 + 3 usage slots + 3 entries of 4 bytes.
        assert_eq!(bytes.len(), 4 + 2 + 3 * 2 + 3 * 4);
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u32().unwrap(), 4);
        assert_eq!(r.u16().unwrap(), 3);
        assert_eq!(r.u16().unwrap(), 1);
        assert_eq!(r.u16().unwrap(), 0);
        assert_eq!(r.u16().unwrap(), 0);
    }

    #[test]
    fn empty_string_table() {
        let bytes = StringTable::new().encode(0).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn damage_profile_validation() {
        let mut profile = DamageProfile::new();
        assert_eq!(
            profile.set(255, 0.5),
            Err(ConstructionError::DamageComponent(255))
        );
        assert_eq!(profile.set(1, 1.5), Err(ConstructionError::DamageAmount(1.5)));
        assert!(profile.set(1, 1.0).is_ok());
        assert_eq!(profile.get(1), Some(1.0));
    }

    #[test]
    fn equal_signatures_share_an_index() {
        let mut first = DamageProfile::new();
        first.set(3, 0.5).unwrap();
        first.set(1, 1.0).unwrap();
        let mut second = DamageProfile::new();
        second.set(1, 1.0).unwrap();
        second.set(3, 0.5).unwrap();
        let mut other = DamageProfile::new();
        other.set(1, 0.25).unwrap();

        let mut table = DamageTable::new();
        let a = table.intern(&first).unwrap();
        let b = table.intern(&second).unwrap();
        let c = table.intern(&other).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.entry(a).unwrap().pairs(), &[(1, 255), (3, 128)]);
    }

    #[test]
    fn empty_damage_table_has_no_slot_count() {
        let bytes = DamageTable::new().encode().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn damage_table_layout() {
        let mut wide = DamageProfile::new();
        wide.set(0, 1.0).unwrap();
        wide.set(2, 0.0).unwrap();
        let mut narrow = DamageProfile::new();
        narrow.set(4, 0.5).unwrap();

        let mut table = DamageTable::new();
        table.intern(&wide).unwrap();
        table.intern(&narrow).unwrap();
        let bytes = table.encode().unwrap();
        assert_eq!(bytes.len(), 4 + 2 + 4 + 2 * (1 + 2 * 2));

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u32().unwrap(), 2);
        assert_eq!(r.u16().unwrap(), 2);
        assert_eq!(r.u32().unwrap(), 1);
        assert_eq!(r.bytes(5).unwrap(), vec![2, 0, 255, 2, 0]);
        assert_eq!(r.bytes(5).unwrap(), vec![1, 4, 128, UNUSED_DAMAGE_KEY, 0]);
    }
}
