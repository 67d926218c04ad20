//! # Registry
//!
//! The central container for all entities and components.
//!
//! Owns the entity allocator and one sparse-set store per registered
//! component type. Destroying an entity cascades into every store and is
//! published to destroy subscribers.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::component::Component;
use super::entity::{EntityAllocator, EntityId};
use super::error::{EcsError, EcsResult};
use super::storage::{ComponentStore, ErasedStore};
use super::view::ComponentSet;

/// The ECS registry - container for all game state.
///
/// Single-threaded by contract: one simulation thread owns it, everything
/// else talks to that thread through command queues.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = Registry::new(10_000)?;
/// registry.register_component::<Position>();
///
/// let e = registry.create_entity()?;
/// registry.add_component(e, Position::new(1.0, 2.0))?;
/// assert_eq!(registry.view::<(Position,)>(), vec![e]);
/// ```
pub struct Registry {
    /// Entity handle pool.
    allocator: EntityAllocator,
    /// One store per registered component type, in registration order.
    stores: Vec<Box<dyn ErasedStore>>,
    /// Component type -> position in `stores`.
    store_index: HashMap<TypeId, usize>,
    /// Destroy notification subscribers.
    destroy_subscribers: Vec<Sender<EntityId>>,
}

impl Registry {
    /// Creates a registry with a pool of `max_entities` handles
    /// (index 0 included, so `max_entities - 1` are usable).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidCapacity`] for pools that cannot hold an
    /// entity.
    pub fn new(max_entities: usize) -> EcsResult<Self> {
        Ok(Self {
            allocator: EntityAllocator::new(max_entities)?,
            stores: Vec::new(),
            store_index: HashMap::new(),
            destroy_subscribers: Vec::new(),
        })
    }

    /// Total handle slots, including the reserved index.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.allocator.living_count()
    }

    /// Checks that `id` is issued and not destroyed since.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Issues a fresh entity handle.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::PoolExhausted`] when the pool is empty. This is a
    /// sizing mistake, not a condition to retry.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        self.allocator.allocate()
    }

    /// Destroys an entity, dropping every component it holds.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if `id` is not alive.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.allocator.is_alive(id) {
            return Err(EcsError::StaleEntity(id));
        }

        for store in &mut self.stores {
            store.entity_destroyed(id);
        }
        self.allocator.release(id)?;

        self.destroy_subscribers.retain(|tx| tx.send(id).is_ok());
        tracing::trace!(entity = %id, "entity destroyed");

        Ok(())
    }

    /// Subscribes to destroy notifications.
    ///
    /// Every successful [`Self::destroy_entity`] sends the handle to each
    /// live receiver. Dropping the receiver unsubscribes.
    pub fn subscribe_destroyed(&mut self) -> Receiver<EntityId> {
        let (tx, rx) = unbounded();
        self.destroy_subscribers.push(tx);
        rx
    }

    // =========================================================================
    // Component types
    // =========================================================================

    /// Registers a component type. Calling it again is a no-op.
    pub fn register_component<C: Component>(&mut self) {
        let type_id = TypeId::of::<C>();
        if self.store_index.contains_key(&type_id) {
            return;
        }

        let capacity = self.allocator.capacity();
        self.store_index.insert(type_id, self.stores.len());
        self.stores.push(Box::new(ComponentStore::<C>::with_capacity(capacity)));
    }

    /// Checks whether `C` has been registered.
    #[inline]
    #[must_use]
    pub fn is_registered<C: Component>(&self) -> bool {
        self.store_index.contains_key(&TypeId::of::<C>())
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.stores.len()
    }

    /// Read access to the whole store of `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `C` is not registered.
    pub fn storage<C: Component>(&self) -> EcsResult<&ComponentStore<C>> {
        self.store_index
            .get(&TypeId::of::<C>())
            .and_then(|&i| self.stores[i].as_any().downcast_ref::<ComponentStore<C>>())
            .ok_or(EcsError::UnregisteredComponent(type_name::<C>()))
    }

    /// Mutable access to the whole store of `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `C` is not registered.
    pub fn storage_mut<C: Component>(&mut self) -> EcsResult<&mut ComponentStore<C>> {
        self.store_index
            .get(&TypeId::of::<C>())
            .and_then(|&i| self.stores[i].as_any_mut().downcast_mut::<ComponentStore<C>>())
            .ok_or(EcsError::UnregisteredComponent(type_name::<C>()))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches `component` to `id` and returns a reference to the stored value.
    ///
    /// # Errors
    ///
    /// - [`EcsError::StaleEntity`] if `id` is not alive
    /// - [`EcsError::UnregisteredComponent`] if `C` is not registered
    /// - [`EcsError::DuplicateComponent`] if `id` already holds a `C`
    pub fn add_component<C: Component>(&mut self, id: EntityId, component: C) -> EcsResult<&mut C> {
        if !self.allocator.is_alive(id) {
            return Err(EcsError::StaleEntity(id));
        }
        self.storage_mut::<C>()?.insert(id, component)
    }

    /// Attaches a default `C` to `id` for in-place construction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_component`].
    pub fn emplace_component<C: Component + Default>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        self.add_component(id, C::default())
    }

    /// Detaches and returns `id`'s `C`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnregisteredComponent`] if `C` is not registered
    /// - [`EcsError::MissingComponent`] if `id` holds no `C`
    pub fn remove_component<C: Component>(&mut self, id: EntityId) -> EcsResult<C> {
        self.storage_mut::<C>()?
            .remove(id)
            .ok_or(EcsError::MissingComponent {
                entity: id,
                component: type_name::<C>(),
            })
    }

    /// Gets `id`'s `C`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnregisteredComponent`] if `C` is not registered
    /// - [`EcsError::MissingComponent`] if `id` holds no `C`
    pub fn get_component<C: Component>(&self, id: EntityId) -> EcsResult<&C> {
        self.storage::<C>()?
            .get(id)
            .ok_or(EcsError::MissingComponent {
                entity: id,
                component: type_name::<C>(),
            })
    }

    /// Gets `id`'s `C` mutably.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_component`].
    pub fn get_component_mut<C: Component>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        self.storage_mut::<C>()?
            .get_mut(id)
            .ok_or(EcsError::MissingComponent {
                entity: id,
                component: type_name::<C>(),
            })
    }

    /// Checks whether `id` holds a `C`. Unregistered types simply answer `false`.
    #[inline]
    #[must_use]
    pub fn has_component<C: Component>(&self, id: EntityId) -> bool {
        self.storage::<C>().is_ok_and(|store| store.contains(id))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns every entity holding all components in `Q`.
    ///
    /// Order is unspecified. If any member type is unregistered the view is
    /// empty.
    #[must_use]
    pub fn view<Q: ComponentSet>(&self) -> Vec<EntityId> {
        let mut members = Vec::new();
        for type_id in Q::type_ids() {
            match self.store_index.get(&type_id) {
                Some(&index) => members.push(index),
                None => return Vec::new(),
            }
        }
        members.sort_unstable();
        members.dedup();

        // Smallest store seeds the scan; ties go to the earlier registration.
        let Some(&seed) = members
            .iter()
            .min_by_key(|&&index| (self.stores[index].len(), index))
        else {
            return Vec::new();
        };

        self.stores[seed]
            .entities()
            .iter()
            .copied()
            .filter(|&entity| {
                members
                    .iter()
                    .all(|&index| index == seed || self.stores[index].contains(entity))
            })
            .collect()
    }

    /// Applies `f` to every `C` in the store's internal order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] if `C` is not registered.
    pub fn for_each<C, F>(&mut self, f: F) -> EcsResult<()>
    where
        C: Component,
        F: FnMut(EntityId, &mut C),
    {
        self.storage_mut::<C>()?.for_each(f);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Inactive, Position};
    use std::collections::HashSet;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Speed(f32);
    impl Component for Speed {}

    fn registry() -> Registry {
        let mut registry = Registry::new(1_000).unwrap();
        registry.register_component::<Position>();
        registry.register_component::<Health>();
        registry.register_component::<Speed>();
        registry
    }

    #[test]
    fn test_registry_creation() {
        let registry = registry();
        assert_eq!(registry.capacity(), 1_000);
        assert_eq!(registry.living_count(), 0);
        assert_eq!(registry.registered_count(), 3);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = registry();
        let e = registry.create_entity().unwrap();
        registry.add_component(e, Health(3)).unwrap();

        registry.register_component::<Health>();

        assert_eq!(registry.registered_count(), 3);
        assert_eq!(registry.get_component::<Health>(e), Ok(&Health(3)));
    }

    #[test]
    fn test_unregistered_component_errors() {
        let mut registry = Registry::new(16).unwrap();
        let e = registry.create_entity().unwrap();

        assert!(!registry.has_component::<Health>(e));
        assert!(matches!(
            registry.add_component(e, Health(1)),
            Err(EcsError::UnregisteredComponent(_))
        ));
        assert!(registry.view::<(Health,)>().is_empty());
    }

    #[test]
    fn test_add_get_remove() {
        let mut registry = registry();
        let e = registry.create_entity().unwrap();

        registry.add_component(e, Position::new(1.0, 2.0)).unwrap();
        registry.get_component_mut::<Position>(e).unwrap().x = 5.0;

        assert!(registry.has_component::<Position>(e));
        assert_eq!(registry.get_component::<Position>(e).unwrap().x, 5.0);

        let removed = registry.remove_component::<Position>(e).unwrap();
        assert_eq!(removed, Position::new(5.0, 2.0));
        assert!(!registry.has_component::<Position>(e));
        assert!(matches!(
            registry.remove_component::<Position>(e),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut registry = registry();
        let e = registry.create_entity().unwrap();
        registry.add_component(e, Health(1)).unwrap();

        assert!(matches!(
            registry.add_component(e, Health(2)),
            Err(EcsError::DuplicateComponent { .. })
        ));
        assert_eq!(registry.get_component::<Health>(e), Ok(&Health(1)));
    }

    #[test]
    fn test_emplace_component() {
        let mut registry = registry();
        let e = registry.create_entity().unwrap();

        registry.emplace_component::<Health>(e).unwrap().0 = 42;

        assert_eq!(registry.get_component::<Health>(e), Ok(&Health(42)));
    }

    #[test]
    fn test_destroy_cascades_to_every_store() {
        let mut registry = registry();
        let e = registry.create_entity().unwrap();
        registry.add_component(e, Position::default()).unwrap();
        registry.add_component(e, Health(1)).unwrap();

        registry.destroy_entity(e).unwrap();

        assert!(!registry.is_alive(e));
        assert!(registry.storage::<Position>().unwrap().is_empty());
        assert!(registry.storage::<Health>().unwrap().is_empty());
        assert_eq!(registry.destroy_entity(e), Err(EcsError::StaleEntity(e)));
    }

    #[test]
    fn test_stale_handle_cannot_touch_reissued_entity() {
        let mut registry = Registry::new(2).unwrap();
        registry.register_component::<Health>();

        let old = registry.create_entity().unwrap();
        registry.destroy_entity(old).unwrap();
        let new = registry.create_entity().unwrap();
        registry.add_component(new, Health(9)).unwrap();

        assert_eq!(old.index(), new.index());
        assert!(!registry.has_component::<Health>(old));
        assert!(registry.get_component::<Health>(old).is_err());
        assert!(matches!(
            registry.add_component(old, Health(1)),
            Err(EcsError::StaleEntity(_))
        ));
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut registry = Registry::new(3).unwrap();
        registry.create_entity().unwrap();
        registry.create_entity().unwrap();
        assert_eq!(registry.create_entity(), Err(EcsError::PoolExhausted(3)));
    }

    #[test]
    fn test_live_ids_are_unique() {
        let mut registry = registry();
        let mut live = HashSet::new();

        for round in 0..200 {
            let e = registry.create_entity().unwrap();
            assert!(live.insert(e), "duplicate live id {e}");
            if round % 3 == 0 {
                let victim = *live.iter().next().unwrap();
                registry.destroy_entity(victim).unwrap();
                live.remove(&victim);
            }
        }

        assert_eq!(registry.living_count(), live.len());
    }

    #[test]
    fn test_view_matches_has_component() {
        let mut registry = registry();
        let mut expected = HashSet::new();

        for i in 0..300u32 {
            let e = registry.create_entity().unwrap();
            if i % 2 == 0 {
                registry.add_component(e, Position::default()).unwrap();
            }
            if i % 3 == 0 {
                registry.add_component(e, Health(i)).unwrap();
            }
            if i % 5 == 0 {
                registry.add_component(e, Speed(1.0)).unwrap();
            }
            if i % 2 == 0 && i % 3 == 0 {
                expected.insert(e);
            }
        }

        let view = registry.view::<(Position, Health)>();
        let unique: HashSet<_> = view.iter().copied().collect();
        assert_eq!(unique.len(), view.len(), "view returned duplicates");
        assert_eq!(unique, expected);

        for e in registry.view::<(Position, Health, Speed)>() {
            assert!(registry.has_component::<Position>(e));
            assert!(registry.has_component::<Health>(e));
            assert!(registry.has_component::<Speed>(e));
        }
        assert_eq!(registry.view::<(Position, Health, Speed)>().len(), 10);
    }

    #[test]
    fn test_view_after_removals() {
        let mut registry = registry();
        let a = registry.create_entity().unwrap();
        let b = registry.create_entity().unwrap();
        for e in [a, b] {
            registry.add_component(e, Position::default()).unwrap();
            registry.add_component(e, Health(1)).unwrap();
        }

        registry.remove_component::<Health>(a).unwrap();

        assert_eq!(registry.view::<(Position, Health)>(), vec![b]);
        assert!(registry.view::<(Inactive,)>().is_empty());
    }

    #[test]
    fn test_for_each_mutates_in_place() {
        let mut registry = registry();
        for i in 0..5 {
            let e = registry.create_entity().unwrap();
            registry.add_component(e, Health(i)).unwrap();
        }

        registry.for_each::<Health, _>(|_, h| h.0 += 100).unwrap();

        let total: u32 = registry
            .storage::<Health>()
            .unwrap()
            .components()
            .iter()
            .map(|h| h.0)
            .sum();
        assert_eq!(total, 510);
    }

    #[test]
    fn test_destroy_notifications() {
        let mut registry = registry();
        let rx = registry.subscribe_destroyed();
        let dropped = registry.subscribe_destroyed();
        drop(dropped);

        let e = registry.create_entity().unwrap();
        registry.destroy_entity(e).unwrap();

        assert_eq!(rx.try_recv(), Ok(e));
        assert!(rx.try_recv().is_err());
    }
}
