//! Fixed-capacity slot arena with generation-checked handles.
//!
//! Occupancy is tracked one bit per slot in 64-bit words. Allocation resumes
//! scanning at the word of the last allocation (or of the lowest release since),
//! so alternating bursts of allocate/release stay cheap; a full scan from word
//! zero is the fallback. There is no compaction and no growth past the
//! configured capacity: slot storage is materialised lazily, but never beyond it.
//!
//! Every release bumps the slot's generation, so a [`SlotId`] kept after its
//! release is rejected instead of aliasing whatever reuses the slot.

use thiserror::Error;

const WORD_BITS: usize = u64::BITS as usize;

/// Handle to an occupied slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    pub fn index(self) -> u32 {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena full ({capacity} slots)")]
    OutOfCapacity { capacity: usize },
    #[error("stale or foreign slot handle")]
    StaleHandle,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: T,
}

#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    occupied: Vec<u64>,
    capacity: usize,
    scan_hint: usize,
    live: usize,
}

impl<T> Arena<T> {
    /// # Panics
    ///
    /// Panics if `capacity` does not fit the 32-bit slot index.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity <= u32::MAX as usize, "arena capacity {capacity} exceeds u32 indices");
        Self {
            slots: Vec::new(),
            occupied: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
            scan_hint: 0,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Place `value` in a free slot.
    pub fn allocate(&mut self, value: T) -> Result<SlotId, ArenaError> {
        let index = self
            .find_free(self.scan_hint, self.occupied.len())
            .or_else(|| self.find_free(0, self.scan_hint))
            .ok_or(ArenaError::OutOfCapacity {
                capacity: self.capacity,
            })?;

        let word = index / WORD_BITS;
        self.occupied[word] |= 1u64 << (index % WORD_BITS);
        self.scan_hint = word;
        self.live += 1;

        if index < self.slots.len() {
            let slot = &mut self.slots[index];
            slot.value = value;
            Ok(SlotId {
                index: index as u32,
                generation: slot.generation,
            })
        } else {
            // The lowest free index at or past the materialised end is the end itself.
            debug_assert_eq!(index, self.slots.len());
            self.slots.push(Slot {
                generation: 0,
                value,
            });
            Ok(SlotId {
                index: index as u32,
                generation: 0,
            })
        }
    }

    fn find_free(&self, from_word: usize, to_word: usize) -> Option<usize> {
        for w in from_word..to_word {
            let bits = self.occupied[w];
            if bits != u64::MAX {
                let index = w * WORD_BITS + (!bits).trailing_zeros() as usize;
                return (index < self.capacity).then_some(index);
            }
        }
        None
    }

    /// Return a slot to the pool.
    pub fn release(&mut self, id: SlotId) -> Result<(), ArenaError> {
        self.release_with(id, |_| {})
    }

    /// Run `reset` on the slot's value, then return the slot to the pool.
    pub fn release_with(
        &mut self,
        id: SlotId,
        reset: impl FnOnce(&mut T),
    ) -> Result<(), ArenaError> {
        if !self.contains(id) {
            return Err(ArenaError::StaleHandle);
        }
        let index = id.index as usize;
        let slot = &mut self.slots[index];
        reset(&mut slot.value);
        slot.generation = slot.generation.wrapping_add(1);

        let word = index / WORD_BITS;
        self.occupied[word] &= !(1u64 << (index % WORD_BITS));
        self.scan_hint = self.scan_hint.min(word);
        self.live -= 1;
        Ok(())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        let index = id.index as usize;
        index < self.slots.len()
            && self.occupied[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
            && self.slots[index].generation == id.generation
    }

    pub fn get(&self, id: SlotId) -> Result<&T, ArenaError> {
        if !self.contains(id) {
            return Err(ArenaError::StaleHandle);
        }
        Ok(&self.slots[id.index as usize].value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Result<&mut T, ArenaError> {
        if !self.contains(id) {
            return Err(ArenaError::StaleHandle);
        }
        Ok(&mut self.slots[id.index as usize].value)
    }

    /// Unchecked-generation access for links owned by a live structure.
    #[inline]
    pub(crate) fn at(&self, index: u32) -> &T {
        &self.slots[index as usize].value
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, index: u32) -> &mut T {
        &mut self.slots[index as usize].value
    }

    /// Release by raw index; the caller guarantees the slot is occupied.
    pub(crate) fn release_at(&mut self, index: u32) {
        let generation = self.slots[index as usize].generation;
        let released = self.release(SlotId { index, generation });
        debug_assert!(released.is_ok(), "slot {index} released twice");
    }
}
