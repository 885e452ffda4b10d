//! Per-context registry of typed entity wrappers.
//!
//! Every typed view is built through a [`TypeDescriptor`] looked up by the
//! wrapper's `TypeId`. Descriptors are created the first time a wrapper type
//! is used with a context and never change afterwards.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entity::{Entity, TypedEntity};

type Constructor = fn(Entity) -> Box<dyn Any + Send + Sync>;

fn construct_boxed<T: TypedEntity>(entity: Entity) -> Box<dyn Any + Send + Sync> {
    Box::new(T::from_entity(entity))
}

/// Static type information for one wrapper type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Declared type name, e.g. `http://schema.org/Place`
    pub type_name: &'static str,
    /// Singleton id for enumerated values
    pub enum_id: Option<&'static str>,
    construct: Constructor,
}

impl TypeDescriptor {
    fn of<T: TypedEntity>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            enum_id: T::ENUM_ID,
            construct: construct_boxed::<T>,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TypeRegistry {
    types: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// Returns the descriptor for `T`, registering it on first use.
    pub fn descriptor<T: TypedEntity>(&self) -> Arc<TypeDescriptor> {
        let key = TypeId::of::<T>();
        if let Some(found) = self.types.read().get(&key) {
            return Arc::clone(found);
        }

        let mut types = self.types.write();
        Arc::clone(
            types
                .entry(key)
                .or_insert_with(|| Arc::new(TypeDescriptor::of::<T>())),
        )
    }

    /// Builds a `T` view over `entity` through the registered constructor.
    pub fn construct<T: TypedEntity>(&self, entity: Entity) -> Option<T> {
        let descriptor = self.descriptor::<T>();
        (descriptor.construct)(entity)
            .downcast::<T>()
            .ok()
            .map(|boxed| *boxed)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.read().values().map(|d| d.type_name).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
