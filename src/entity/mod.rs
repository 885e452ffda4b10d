//! Entity views.
//!
//! An [`Entity`] is an id, a declared type name and a cached ancestor set,
//! bound to the [`KnowledgeContext`] that owns its facts. Views are cheap to
//! clone and hold no facts themselves; every field read or write goes
//! straight to the context.
//!
//! Typed views implement [`TypedEntity`], usually through [`entity_type!`](crate::entity_type).

mod render;
mod typed;

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use uuid::Uuid;

use crate::context::{KnowledgeContext, MEMORY_ID_PREFIX};
use crate::field::{BooleanField, NumberField, ReferenceField, TextField, TimeField};

pub use typed::{EntityReference, HasEntityId, TypedEntity, WILDCARD_TYPE_NAME};

/// A view of one entity in a knowledge context.
///
/// # Examples
///
/// ```
/// use knowledge_context::{Entity, KnowledgeContext};
///
/// let ctx = KnowledgeContext::new();
/// let e = Entity::new(&ctx, "http://schema.org/Thing");
/// assert!(e.id().starts_with("mem://"));
/// assert_eq!(ctx.entity_count(), 1);
/// ```
#[derive(Clone)]
pub struct Entity {
    context: KnowledgeContext,
    id: String,
    type_name: String,
    inherits_from: BTreeSet<String>,
}

impl Entity {
    /// Creates and registers a new entity with a fresh `mem://` id.
    #[must_use]
    pub fn new(context: &KnowledgeContext, type_name: impl Into<String>) -> Self {
        Self::with_inheritance(context, type_name, None, std::iter::empty::<String>())
    }

    /// Creates and registers an entity with the given id.
    ///
    /// An empty id is replaced with a fresh `mem://` id.
    #[must_use]
    pub fn with_id(
        context: &KnowledgeContext,
        type_name: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::with_inheritance(
            context,
            type_name,
            Some(entity_id.into()),
            std::iter::empty::<String>(),
        )
    }

    /// Creates and registers an entity that declares the given ancestor types.
    #[must_use]
    pub fn with_inheritance<I, S>(
        context: &KnowledgeContext,
        type_name: impl Into<String>,
        entity_id: Option<String>,
        ancestors: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = entity_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_memory_id);
        let entity = Self::from_parts(
            context.clone(),
            id,
            type_name.into(),
            ancestors.into_iter().map(Into::into).collect(),
        );
        context.associate_entity(&entity);
        entity
    }

    /// Builds a view without registering it.
    pub(crate) fn from_parts(
        context: KnowledgeContext,
        id: String,
        type_name: String,
        inherits_from: BTreeSet<String>,
    ) -> Self {
        Self {
            context,
            id,
            type_name,
            inherits_from,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the declared type name, e.g. `http://schema.org/Place`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the ancestor types this view was created or looked up with.
    #[must_use]
    pub fn inherits_from(&self) -> &BTreeSet<String> {
        &self.inherits_from
    }

    /// Returns the owning context.
    #[must_use]
    pub fn context(&self) -> &KnowledgeContext {
        &self.context
    }

    /// Returns true if this entity can be viewed as a `T`.
    #[must_use]
    pub fn is_a<T: TypedEntity>(&self) -> bool {
        self.context.is_a::<T>(&self.type_name, &self.id)
    }

    /// Returns true if this entity's type is `type_name` or inherits from it.
    ///
    /// Unlike [`is_a`](Self::is_a) this never applies enum identity rules.
    #[must_use]
    pub fn is_a_type(&self, type_name: &str) -> bool {
        type_name == WILDCARD_TYPE_NAME || self.context.inherits_from(&self.type_name, type_name)
    }

    /// Returns a `T` view with the same identity, or `None` if this is not a `T`.
    #[must_use]
    pub fn as_type<T: TypedEntity>(&self) -> Option<T> {
        self.context.cast(self.clone())
    }

    /// Copies this entity's registration and facts into `target`.
    ///
    /// Every fact the target holds about this id is replaced. With `recursive`
    /// set, entities referenced through identifier facts are copied too if
    /// they are registered in this context; each id is visited once, so
    /// reference cycles terminate. Copying into the same context does nothing.
    pub fn copy_to(&self, target: &KnowledgeContext, recursive: bool) {
        if self.context == *target {
            return;
        }

        if recursive {
            let mut visited = HashSet::new();
            self.copy_recursive(target, &mut visited);
        } else {
            self.copy_facts(target);
        }
    }

    fn copy_facts(&self, target: &KnowledgeContext) -> Vec<String> {
        target.associate_entity(self);
        let facts = self.context.facts_of(&self.id, None);
        let referenced = facts
            .iter()
            .filter_map(|fact| fact.referenced_id().map(str::to_string))
            .collect();
        target.replace_facts(&self.id, facts);
        referenced
    }

    fn copy_recursive(&self, target: &KnowledgeContext, visited: &mut HashSet<String>) {
        if !visited.insert(self.id.clone()) {
            return;
        }

        for referenced_id in self.copy_facts(target) {
            if let Some(referenced) = self.context.get_entity_in_memory(&referenced_id) {
                referenced.copy_recursive(target, visited);
            }
        }
    }

    // Field factories

    #[must_use]
    pub fn text(&self, relation: &str) -> TextField {
        TextField::new(self.context.clone(), &self.id, relation)
    }

    #[must_use]
    pub fn number(&self, relation: &str) -> NumberField {
        NumberField::new(self.context.clone(), &self.id, relation)
    }

    #[must_use]
    pub fn boolean(&self, relation: &str) -> BooleanField {
        BooleanField::new(self.context.clone(), &self.id, relation)
    }

    #[must_use]
    pub fn time(&self, relation: &str) -> TimeField {
        TimeField::new(self.context.clone(), &self.id, relation)
    }

    /// Returns an accessor for a relation whose values reference `T` entities.
    #[must_use]
    pub fn reference<T: TypedEntity>(&self, relation: &str) -> ReferenceField<T> {
        ReferenceField::new(self.context.clone(), &self.id, relation)
    }

    /// Lists the raw ids referenced through `relation`, in insertion order.
    #[must_use]
    pub fn entity_ids(&self, relation: &str) -> Vec<String> {
        self.context
            .facts_of(&self.id, Some(relation))
            .iter()
            .filter_map(|fact| fact.referenced_id().map(str::to_string))
            .collect()
    }
}

fn new_memory_id() -> String {
    format!("{MEMORY_ID_PREFIX}{}", Uuid::new_v4())
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.type_name == other.type_name && self.context == other.context
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("inherits_from", &self.inherits_from)
            .field("context_id", &self.context.context_id())
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.type_name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_type;
    use crate::primitive::Primitive;

    entity_type! {
        pub struct Thing: "http://schema.org/Thing";
    }

    entity_type! {
        pub struct Place: "http://schema.org/Place" extends ["http://schema.org/Thing"];
    }

    entity_type! {
        pub struct LocalBusiness: "http://schema.org/LocalBusiness"
            extends ["http://schema.org/Place", "http://schema.org/Thing"];
    }

    #[test]
    fn test_new_entity_gets_memory_id() {
        let ctx = KnowledgeContext::new();
        let a = Entity::new(&ctx, "Thing");
        let b = Entity::with_id(&ctx, "Thing", "");
        assert!(a.id().starts_with("mem://"));
        assert!(b.id().starts_with("mem://"));
        assert_ne!(a.id(), b.id());
        assert_eq!(ctx.entity_count(), 2);
    }

    #[test]
    fn test_display() {
        let ctx = KnowledgeContext::new();
        let e = Entity::with_id(&ctx, "http://schema.org/Place", "mem://x");
        assert_eq!(e.to_string(), "http://schema.org/Place (mem://x)");
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let ctx = KnowledgeContext::new();
        let e = Entity::new(&ctx, "http://example.com/Unrelated");
        assert!(e.is_a::<Entity>());
        assert!(e.is_a_type(WILDCARD_TYPE_NAME));
        assert!(!e.is_a::<Place>());
    }

    #[test]
    fn test_cast_down_and_back() {
        let ctx = KnowledgeContext::new();
        let business = LocalBusiness::new(&ctx);
        business.text("name").set("Joe's Diner");

        let as_place: Place = business.as_type().unwrap();
        assert_eq!(as_place.id(), business.id());
        assert_eq!(as_place.type_name(), "http://schema.org/LocalBusiness");
        assert_eq!(as_place.text("name").value().as_deref(), Some("Joe's Diner"));

        // Still a business after the downcast.
        assert!(as_place.is_a::<LocalBusiness>());
        let back: LocalBusiness = as_place.as_type().unwrap();
        assert_eq!(back.id(), business.id());

        let thing = Thing::new(&ctx);
        assert!(thing.as_type::<Place>().is_none());
    }

    #[test]
    fn test_is_a_type_uses_table() {
        let ctx = KnowledgeContext::new();
        let place = Place::new(&ctx);
        assert!(place.is_a_type("http://schema.org/Thing"));
        assert!(place.is_a_type("http://schema.org/Place"));
        assert!(!place.is_a_type("http://schema.org/Person"));
    }

    #[test]
    fn test_copy_to_same_context_is_noop() {
        let ctx = KnowledgeContext::new();
        let place = Place::new(&ctx);
        place.text("name").set("London");
        place.copy_to(&ctx, true);
        assert_eq!(ctx.fact_count(), 1);
    }

    #[test]
    fn test_copy_to_replaces_target_facts() {
        let source = KnowledgeContext::new();
        let target = KnowledgeContext::new();
        let place = Place::with_id(&source, "mem://p");
        place.text("name").set("London");

        let stale = Place::with_id(&target, "mem://p");
        stale.text("name").set("Paris");
        stale.text("motto").set("Fluctuat nec mergitur");

        place.copy_to(&target, false);
        assert_eq!(stale.text("name").value().as_deref(), Some("London"));
        assert_eq!(stale.text("motto").value(), None);
    }

    #[test]
    fn test_copy_to_isolates_contexts() {
        let source = KnowledgeContext::new();
        let target = KnowledgeContext::new();
        let place = Place::new(&source);
        place.text("name").set("London");
        place.copy_to(&target, false);

        place.text("name").set("Londinium");
        let copy = target.get_entity_in_memory(place.id()).unwrap();
        assert_eq!(copy.text("name").value().as_deref(), Some("London"));
        assert!(copy.inherits_from().contains("http://schema.org/Thing"));
    }

    #[test]
    fn test_recursive_copy_handles_cycles() {
        let source = KnowledgeContext::new();
        let a = Thing::new(&source);
        let b = Thing::new(&source);
        a.reference::<Thing>("knows").set(&b);
        b.reference::<Thing>("knows").set(&a);
        a.reference::<Thing>("self").set(&a);

        let target = KnowledgeContext::new();
        a.copy_to(&target, true);
        assert_eq!(target.entity_count(), 2);
        assert_eq!(target.fact_count(), 3);
    }

    #[test]
    fn test_non_recursive_copy_skips_references() {
        let source = KnowledgeContext::new();
        let a = Thing::new(&source);
        let b = Thing::new(&source);
        a.reference::<Thing>("knows").set(&b);

        let target = KnowledgeContext::new();
        a.copy_to(&target, false);
        assert_eq!(target.entity_count(), 1);
        assert!(target.get_entity_in_memory(b.id()).is_none());
        let copied = target.get_entity_in_memory(a.id()).unwrap();
        assert_eq!(copied.entity_ids("knows"), vec![b.id().to_string()]);
    }

    #[test]
    fn test_entity_ids_ignore_other_kinds() {
        let ctx = KnowledgeContext::new();
        let e = Thing::new(&ctx);
        ctx.associate(crate::fact::Fact::new(e.id(), "rel", Primitive::text("mem://not-a-ref")));
        ctx.associate(crate::fact::Fact::new(e.id(), "rel", Primitive::identifier("mem://ref")));
        assert_eq!(e.entity_ids("rel"), vec!["mem://ref".to_string()]);
    }
}
