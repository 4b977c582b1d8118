// Reference-index authority for one generation run.
//
// Hands out run-unique `RefIndex` values from a monotonic counter. The
// counter starts at a fixed seed (`DEFAULT_INDEX_SEED` unless the run's
// `MissionConfig` says otherwise) and only ever moves forward; indices are
// never reused. 0 is the binary "no reference" marker, so a seed of 0 is
// bumped to 1. The counter never wraps: `u32::MAX` is never issued, and a
// request once the space is used up fails with `IndicesExhausted`.
//
// Idempotence lives in `resolve`: it takes the item's index slot and only
// issues a new value when the slot is empty.

use crate::error::StructuralError;
use crate::types::RefIndex;

pub const DEFAULT_INDEX_SEED: u32 = 1;

#[derive(Clone, Debug)]
pub struct IndexAuthority {
    next: u32,
    issued: u32,
}

impl Default for IndexAuthority {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_SEED)
    }
}

impl IndexAuthority {
    pub fn new(seed: u32) -> Self {
        Self {
            next: seed.max(1),
            issued: 0,
        }
    }

    /// Return the slot's index, issuing a fresh one if it has none yet.
    pub fn resolve(&mut self, slot: &mut Option<RefIndex>) -> Result<RefIndex, StructuralError> {
        if let Some(index) = *slot {
            return Ok(index);
        }
        let next = self
            .next
            .checked_add(1)
            .ok_or(StructuralError::IndicesExhausted {
                requested: 1,
                available: 0,
            })?;
        let index = RefIndex(self.next);
        self.next = next;
        self.issued += 1;
        *slot = Some(index);
        Ok(index)
    }

    /// How many more indices can be issued before the counter runs out.
    pub fn available(&self) -> u32 {
        u32::MAX - self.next
    }

    /// Fail unless `requested` more indices can still be issued.
    pub fn ensure_available(&self, requested: usize) -> Result<(), StructuralError> {
        let available = self.available();
        if requested > available as usize {
            return Err(StructuralError::IndicesExhausted {
                requested,
                available,
            });
        }
        Ok(())
    }

    /// How many indices this authority has issued.
    pub fn issued(&self) -> u32 {
        self.issued
    }

    /// The index the next request will receive.
    pub fn peek(&self) -> RefIndex {
        RefIndex(self.next)
    }
}
