//! # Entity Management
//!
//! An entity is nothing but a handle: a slot index shared by every
//! component store, plus the slot's generation at the time it was issued.
//!
//! Index `0` is reserved and never issued, so a zeroed handle is always
//! [`EntityId::INVALID`].

use std::collections::VecDeque;

use super::error::{EcsError, EcsResult};

/// Default size of the entity pool, including the reserved index 0.
pub const DEFAULT_MAX_ENTITIES: usize = 100_000;

/// Generational entity handle.
///
/// Packed as `generation << 32 | index`. A handle goes stale the moment
/// its slot is released, even if the index is reissued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// The reserved invalid handle. Never returned by the allocator.
    pub const INVALID: Self = Self(0);

    /// Packs an index and a generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation the slot had when this handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks if this is the reserved invalid handle (index 0).
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.index() == 0
    }

    /// Returns the packed 64-bit representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds an ID from its packed representation.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Issues and recycles entity handles from a bounded pool.
///
/// Free indices are handed out first-in first-out, so a destroyed index is
/// only reused after every other free index has been issued once.
pub struct EntityAllocator {
    /// Free indices, oldest first.
    free: VecDeque<u32>,
    /// Current generation of every slot.
    generations: Box<[u32]>,
    /// Liveness of every slot.
    alive: Box<[bool]>,
    /// Slots currently issued.
    living_count: usize,
}

impl EntityAllocator {
    /// Creates an allocator with `max_entities` slots (index 0 included).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidCapacity`] if the pool could not hold a
    /// single entity or does not fit in a `u32` index.
    pub fn new(max_entities: usize) -> EcsResult<Self> {
        if max_entities < 2 || max_entities > u32::MAX as usize {
            return Err(EcsError::InvalidCapacity(max_entities));
        }

        #[allow(clippy::cast_possible_truncation)]
        let free = (1..max_entities as u32).collect();

        Ok(Self {
            free,
            generations: vec![0; max_entities].into_boxed_slice(),
            alive: vec![false; max_entities].into_boxed_slice(),
            living_count: 0,
        })
    }

    /// Total slot count, including the reserved index.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn living_count(&self) -> usize {
        self.living_count
    }

    /// Number of handles that can still be issued.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Pops the oldest free index and returns a live handle for it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::PoolExhausted`] when every slot is in use.
    pub fn allocate(&mut self) -> EcsResult<EntityId> {
        let index = self
            .free
            .pop_front()
            .ok_or(EcsError::PoolExhausted(self.capacity()))?;

        let slot = index as usize;
        self.alive[slot] = true;
        self.living_count += 1;

        Ok(EntityId::new(index, self.generations[slot]))
    }

    /// Returns a handle's index to the free-list and bumps its generation.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the handle is not currently alive.
    pub fn release(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.is_alive(id) {
            return Err(EcsError::StaleEntity(id));
        }

        let slot = id.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.living_count -= 1;
        self.free.push_back(id.index());

        Ok(())
    }

    /// Checks that the handle is issued and its generation is current.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        if id.is_invalid() {
            return false;
        }

        let slot = id.index() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == id.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn test_invalid_is_default() {
        assert!(EntityId::default().is_invalid());
        assert!(EntityId::new(0, 7).is_invalid());
        assert!(!EntityId::new(1, 0).is_invalid());
    }

    #[test]
    fn test_never_issues_index_zero() {
        let mut alloc = EntityAllocator::new(4).unwrap();
        let ids: Vec<_> = (0..3).map(|_| alloc.allocate().unwrap()).collect();
        assert_eq!(
            ids.iter().map(|id| id.index()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(alloc.allocate(), Err(EcsError::PoolExhausted(4)));
    }

    #[test]
    fn test_fifo_reuse_bumps_generation() {
        let mut alloc = EntityAllocator::new(3).unwrap();
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();

        alloc.release(a).unwrap();
        assert!(!alloc.is_alive(a));
        assert!(alloc.is_alive(b));

        let c = alloc.allocate().unwrap();
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(!alloc.is_alive(a), "stale handle must stay dead");
        assert_eq!(alloc.living_count(), 2);
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut alloc = EntityAllocator::new(8).unwrap();
        let a = alloc.allocate().unwrap();
        alloc.release(a).unwrap();
        assert_eq!(alloc.release(a), Err(EcsError::StaleEntity(a)));
        assert_eq!(alloc.living_count(), 0);
    }

    #[test]
    fn test_rejects_tiny_pool() {
        assert!(EntityAllocator::new(1).is_err());
        assert!(EntityAllocator::new(0).is_err());
    }
}
