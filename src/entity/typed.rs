//! Typed entity wrappers and entity references.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use super::Entity;
use crate::context::KnowledgeContext;
use crate::error::KnowledgeResult;

/// Type name reported by the untyped [`Entity`] view, which matches every type.
pub const WILDCARD_TYPE_NAME: &str = "*";

/// A typed view over an [`Entity`].
///
/// Implementations declare their schema type name, the ancestor types every
/// instance inherits from and, for enumerated values, the singleton id that
/// identifies the value. Use [`entity_type!`](crate::entity_type) rather than
/// implementing this by hand.
pub trait TypedEntity: Clone + Send + Sync + Sized + 'static {
    /// Schema type name, e.g. `http://schema.org/Place`.
    const TYPE_NAME: &'static str;

    /// Ancestor type names recorded when an instance is created.
    const ANCESTORS: &'static [&'static str] = &[];

    /// Id of the single entity this type denotes, for enumerated values.
    const ENUM_ID: Option<&'static str> = None;

    /// Wraps an entity view. Callers have already checked the type.
    fn from_entity(entity: Entity) -> Self;

    fn entity(&self) -> &Entity;

    /// Returns true for the untyped [`Entity`] view.
    #[must_use]
    fn is_wildcard() -> bool {
        TypeId::of::<Self>() == TypeId::of::<Entity>()
    }
}

impl TypedEntity for Entity {
    const TYPE_NAME: &'static str = WILDCARD_TYPE_NAME;

    fn from_entity(entity: Entity) -> Self {
        entity
    }

    fn entity(&self) -> &Entity {
        self
    }
}

/// Anything that names an entity id: typed views, [`Entity`] and [`EntityReference`].
pub trait HasEntityId {
    fn entity_id(&self) -> &str;
}

impl<T: TypedEntity> HasEntityId for T {
    fn entity_id(&self) -> &str {
        self.entity().id()
    }
}

/// A context-less reference to an entity of type `T`.
///
/// References can be stored in reference fields without the referenced
/// entity being present in the context.
pub struct EntityReference<T> {
    id: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypedEntity> EntityReference<T> {
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            id: entity_id.into(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Looks the entity up in `context`, consulting sources if needed.
    ///
    /// # Errors
    ///
    /// Propagates source failures.
    pub async fn resolve(&self, context: &KnowledgeContext) -> KnowledgeResult<Option<T>> {
        context.get_entity_typed::<T>(&self.id).await
    }
}

impl<T> HasEntityId for EntityReference<T> {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl<T> Clone for EntityReference<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for EntityReference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for EntityReference<T> {}

impl<T> fmt::Debug for EntityReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityReference").field(&self.id).finish()
    }
}

impl<T: TypedEntity> From<&T> for EntityReference<T> {
    fn from(entity: &T) -> Self {
        Self::new(entity.entity().id())
    }
}

/// Declares a typed entity wrapper.
///
/// ```
/// use knowledge_context::{entity_type, KnowledgeContext, TextField};
///
/// entity_type! {
///     /// A place.
///     pub struct Place: "http://schema.org/Place" extends ["http://schema.org/Thing"];
/// }
///
/// impl Place {
///     pub fn name(&self) -> TextField {
///         self.text("name")
///     }
/// }
///
/// entity_type! {
///     /// The enumerated value `Male` of `GenderType`.
///     pub struct Male: "http://schema.org/GenderType" singleton "enum://http://schema.org/Male";
/// }
///
/// let ctx = KnowledgeContext::new();
/// let place = Place::new(&ctx);
/// place.name().set("London");
/// assert_eq!(place.name().value().as_deref(), Some("London"));
///
/// let male = Male::new(&ctx);
/// assert_eq!(male.id(), "enum://http://schema.org/Male");
/// ```
///
/// The generated struct derefs to [`Entity`](crate::Entity) and gets `new`
/// (fresh id, or the singleton id for enumerated values) and `with_id`
/// constructors that register the entity with the context.
#[macro_export]
macro_rules! entity_type {
    (@enum_id) => {
        ::core::option::Option::None
    };
    (@enum_id $id:literal) => {
        ::core::option::Option::Some($id)
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $type_name:literal
        $(extends [$($ancestor:literal),* $(,)?])?
        $(singleton $enum_id:literal)?
        ;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        $vis struct $name($crate::Entity);

        impl $crate::TypedEntity for $name {
            const TYPE_NAME: &'static str = $type_name;
            const ANCESTORS: &'static [&'static str] = &[$($($ancestor),*)?];
            const ENUM_ID: ::core::option::Option<&'static str> =
                $crate::entity_type!(@enum_id $($enum_id)?);

            fn from_entity(entity: $crate::Entity) -> Self {
                Self(entity)
            }

            fn entity(&self) -> &$crate::Entity {
                &self.0
            }
        }

        impl $name {
            /// Creates and registers a new entity of this type.
            #[must_use]
            pub fn new(context: &$crate::KnowledgeContext) -> Self {
                Self($crate::Entity::with_inheritance(
                    context,
                    <Self as $crate::TypedEntity>::TYPE_NAME,
                    <Self as $crate::TypedEntity>::ENUM_ID.map(::std::string::ToString::to_string),
                    <Self as $crate::TypedEntity>::ANCESTORS.iter().copied(),
                ))
            }

            /// Creates and registers an entity of this type with an explicit id.
            #[must_use]
            pub fn with_id(
                context: &$crate::KnowledgeContext,
                entity_id: impl ::std::convert::Into<::std::string::String>,
            ) -> Self {
                Self($crate::Entity::with_inheritance(
                    context,
                    <Self as $crate::TypedEntity>::TYPE_NAME,
                    ::core::option::Option::Some(entity_id.into()),
                    <Self as $crate::TypedEntity>::ANCESTORS.iter().copied(),
                ))
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::Entity;

            fn deref(&self) -> &$crate::Entity {
                &self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
