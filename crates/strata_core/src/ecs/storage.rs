//! # Component Storage
//!
//! Sparse-set storage for a single component type.
//!
//! ```text
//! sparse:   [ -, 2, -, 0, 1, ... ]   entity index -> dense slot
//! entities: [ e3, e4, e1 ]           dense slot   -> entity
//! dense:    [ c3, c4, c1 ]           dense slot   -> component
//! ```
//!
//! - Insert, remove and lookup are O(1)
//! - Iteration walks a packed array (no tombstones)
//! - Removal swaps the last element into the hole, so dense order is not
//!   stable across mutations; never cache a dense slot across a removal

use std::any::{type_name, Any};

use super::component::Component;
use super::entity::EntityId;
use super::error::{EcsError, EcsResult};

/// Sparse marker for "no component for this index".
const EMPTY: u32 = u32::MAX;

/// Type-erased view of a component store.
///
/// This is the only dynamically dispatched seam in the ECS: the registry
/// uses it to cascade entity destruction and to plan views without knowing
/// the concrete component types.
pub trait ErasedStore: Any + Send {
    /// Drops the entity's component, if it has one.
    fn entity_destroyed(&mut self, id: EntityId);

    /// Checks whether the entity holds a component in this store.
    fn contains(&self, id: EntityId) -> bool;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Checks whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities in dense order.
    fn entities(&self) -> &[EntityId];

    /// Name of the stored component type (diagnostics only).
    fn component_name(&self) -> &'static str;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Densely packed storage for every live instance of one component type.
///
/// # Invariant
///
/// For every stored entity `e` at dense slot `i`:
/// `sparse[e.index()] == i` and `entities[i] == e`, and
/// `dense.len() == entities.len()`.
pub struct ComponentStore<C: Component> {
    /// Entity index -> dense slot, or `EMPTY`.
    sparse: Vec<u32>,
    /// Dense slot -> owning entity.
    entities: Vec<EntityId>,
    /// Dense slot -> component value.
    dense: Vec<C>,
}

impl<C: Component> Default for ComponentStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentStore<C> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Creates an empty store sized for `capacity` entity indices.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: vec![EMPTY; capacity],
            entities: Vec::with_capacity(capacity.min(1024)),
            dense: Vec::with_capacity(capacity.min(1024)),
        }
    }

    /// Dense slot of `id`, if this exact handle is stored.
    #[inline]
    fn slot(&self, id: EntityId) -> Option<usize> {
        let slot = *self.sparse.get(id.index() as usize)?;
        if slot == EMPTY {
            return None;
        }
        let slot = slot as usize;
        (self.entities[slot] == id).then_some(slot)
    }

    /// Checks whether `id` holds a component here.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Appends a component for `id` at a fresh dense slot.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if `id` already holds one.
    pub fn insert(&mut self, id: EntityId, component: C) -> EcsResult<&mut C> {
        if self.contains(id) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                component: type_name::<C>(),
            });
        }

        let index = id.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        } else if self.sparse[index] != EMPTY {
            // A previous generation of this index was never cleaned up.
            let stale = self.entities[self.sparse[index] as usize];
            self.remove(stale);
        }

        let slot = self.dense.len();
        #[allow(clippy::cast_possible_truncation)]
        {
            self.sparse[index] = slot as u32;
        }
        self.entities.push(id);
        self.dense.push(component);

        Ok(&mut self.dense[slot])
    }

    /// Removes `id`'s component by swapping the last element into its slot.
    ///
    /// Returns `None` if `id` has no component here.
    pub fn remove(&mut self, id: EntityId) -> Option<C> {
        let slot = self.slot(id)?;

        let value = self.dense.swap_remove(slot);
        self.entities.swap_remove(slot);
        self.sparse[id.index() as usize] = EMPTY;

        if let Some(&moved) = self.entities.get(slot) {
            #[allow(clippy::cast_possible_truncation)]
            {
                self.sparse[moved.index() as usize] = slot as u32;
            }
        }

        Some(value)
    }

    /// Gets `id`'s component.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&C> {
        self.slot(id).map(|slot| &self.dense[slot])
    }

    /// Gets `id`'s component mutably.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut C> {
        self.slot(id).map(|slot| &mut self.dense[slot])
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Checks whether the store is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Entities in dense order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Components in dense order (parallel to [`Self::entities`]).
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[C] {
        &self.dense
    }

    /// Iterates over `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterates mutably over `(entity, component)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut C)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// Applies `f` to every component, last inserted first.
    ///
    /// Removals reorder the dense array, so the order is only meaningful
    /// within a single pass.
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(EntityId, &mut C),
    {
        for (id, component) in self.entities.iter().zip(self.dense.iter_mut()).rev() {
            f(*id, component);
        }
    }

    /// Verifies the sparse/dense mutual-inverse invariant.
    ///
    /// O(n); meant for tests and debug tooling.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.entities.len() != self.dense.len() {
            return false;
        }

        let mapped = self.sparse.iter().filter(|&&slot| slot != EMPTY).count();
        if mapped != self.entities.len() {
            return false;
        }

        self.entities.iter().enumerate().all(|(slot, id)| {
            self.sparse.get(id.index() as usize).copied() == u32::try_from(slot).ok()
        })
    }
}

impl<C: Component> ErasedStore for ComponentStore<C> {
    fn entity_destroyed(&mut self, id: EntityId) {
        self.remove(id);
    }

    fn contains(&self, id: EntityId) -> bool {
        ComponentStore::contains(self, id)
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn entities(&self) -> &[EntityId] {
        ComponentStore::entities(self)
    }

    fn component_name(&self) -> &'static str {
        type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tag(u32);
    impl Component for Tag {}

    fn id(index: u32) -> EntityId {
        EntityId::new(index, 0)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = ComponentStore::new();
        store.insert(id(5), Tag(50)).unwrap();
        store.insert(id(2), Tag(20)).unwrap();

        assert_eq!(store.get(id(5)), Some(&Tag(50)));
        assert_eq!(store.len(), 2);

        assert_eq!(store.remove(id(5)), Some(Tag(50)));
        assert!(!store.contains(id(5)));
        assert_eq!(store.get(id(2)), Some(&Tag(20)));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = ComponentStore::new();
        store.insert(id(1), Tag(1)).unwrap();
        let err = store.insert(id(1), Tag(2)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(store.get(id(1)), Some(&Tag(1)));
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut store = ComponentStore::new();
        for i in 1..=4 {
            store.insert(id(i), Tag(i)).unwrap();
        }

        store.remove(id(1));

        assert_eq!(store.entities(), &[id(4), id(2), id(3)]);
        assert_eq!(store.get(id(4)), Some(&Tag(4)));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_stale_generation_is_absent() {
        let mut store = ComponentStore::new();
        store.insert(EntityId::new(3, 0), Tag(3)).unwrap();

        let reissued = EntityId::new(3, 1);
        assert!(!store.contains(reissued));
        assert!(store.get(reissued).is_none());
        assert!(store.remove(reissued).is_none());

        // Inserting the new generation replaces the leftover slot.
        store.insert(reissued, Tag(33)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(reissued), Some(&Tag(33)));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_for_each_visits_reverse_insertion_order() {
        let mut store = ComponentStore::with_capacity(16);
        for i in 1..=3 {
            store.insert(id(i), Tag(i)).unwrap();
        }

        let mut seen = Vec::new();
        store.for_each(|e, tag| {
            tag.0 *= 10;
            seen.push(e.index());
        });

        assert_eq!(seen, vec![3, 2, 1]);
        assert_eq!(store.get(id(2)), Some(&Tag(20)));
    }

    #[test]
    fn test_dense_invariant_under_random_ops() {
        let mut store = ComponentStore::new();
        let mut state = 0x2545_F491_4F6C_DD1Du64;

        for _ in 0..5_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;

            #[allow(clippy::cast_possible_truncation)]
            let index = (state % 64) as u32 + 1;
            if state & (1 << 40) == 0 {
                let _ = store.insert(id(index), Tag(index));
            } else {
                store.remove(id(index));
            }

            assert!(store.is_consistent());
            assert_eq!(store.components().len(), store.entities().len());
        }
    }

    #[test]
    fn test_erased_downcast() {
        let mut store: Box<dyn ErasedStore> = Box::new(ComponentStore::<Tag>::new());
        store
            .as_any_mut()
            .downcast_mut::<ComponentStore<Tag>>()
            .unwrap()
            .insert(id(9), Tag(9))
            .unwrap();

        assert!(store.contains(id(9)));
        store.entity_destroyed(id(9));
        assert!(store.is_empty());
        assert!(store.component_name().ends_with("Tag"));
    }
}
