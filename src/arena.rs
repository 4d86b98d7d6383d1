// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Generational arena with free list for slot reuse.

use std::{fmt, marker::PhantomData};

/// A typed, generation-checked index into an arena.
///
/// Freeing a slot bumps its generation, so an index obtained before the free no longer resolves
/// even once the slot is reused.
pub(crate) struct Idx<T> {
    slot: u32,
    generation: u32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({}v{})", self.slot, self.generation)
    }
}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.generation == other.generation
    }
}

impl<T> Eq for Idx<T> {}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn alloc(&mut self, value: T) -> Idx<T> {
        let slot = if let Some(slot) = self.free_list.pop() {
            debug_assert!(self.slots[slot as usize].value.is_none());
            self.slots[slot as usize].value = Some(value);
            slot
        } else {
            let slot = self.slots.len();
            assert!(slot < u32::MAX as usize, "arena full");
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            slot as u32
        };
        Idx {
            slot,
            generation: self.slots[slot as usize].generation,
            _ty: PhantomData,
        }
    }

    /// Frees the slot behind `id`, returning its value, or `None` if `id` is stale.
    pub fn free(&mut self, id: Idx<T>) -> Option<T> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.slot);
        Some(value)
    }

    pub fn get(&self, id: Idx<T>) -> Option<&T> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: Idx<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    #[cfg(test)]
    pub fn contains(&self, id: Idx<T>) -> bool {
        self.get(id).is_some()
    }

    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
