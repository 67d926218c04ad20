//! # View Queries
//!
//! A view names a set of component types with a tuple, e.g.
//! `registry.view::<(Position, Health)>()`. The registry seeds the
//! intersection from the smallest store and probes the others, so the cost
//! is linear in the seed size rather than the product of store sizes.

use std::any::TypeId;

use super::component::Component;

/// A tuple of component types usable as a view query.
///
/// Implemented for tuples of 1 to 8 components.
pub trait ComponentSet {
    /// Type IDs of every member, in tuple order.
    fn type_ids() -> Vec<TypeId>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(TypeId::of::<$name>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
