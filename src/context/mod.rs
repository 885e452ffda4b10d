//! The knowledge context: an owning store of entities, facts and type inheritance.
//!
//! A [`KnowledgeContext`] is a cheap-to-clone handle. All clones share the same
//! state, guarded by one `RwLock`. Each public operation is a single short
//! critical section; the lock is never held while a source resolves an id, so
//! sources are free to call back into the context.
//!
//! Compound operations (`overwrite`, `Entity::copy_to`, deserialization) are
//! not atomic with respect to other writers.

mod registry;
mod snapshot;
mod state;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::ContextConfig;
use crate::entity::{Entity, TypedEntity};
use crate::error::KnowledgeResult;
use crate::fact::Fact;
use crate::source::EntitySource;

pub use registry::TypeDescriptor;
pub(crate) use state::{ContextState, EntityRecord};

use registry::TypeRegistry;

/// Id prefix of enumerated singleton entities.
pub const ENUM_ID_PREFIX: &str = "enum://";

/// Id prefix of entities with no external identity.
pub const MEMORY_ID_PREFIX: &str = "mem://";

struct ContextInner {
    state: RwLock<ContextState>,
    sources: Vec<Arc<dyn EntitySource>>,
    registry: TypeRegistry,
    config: ContextConfig,
}

/// A scoped knowledge graph.
///
/// # Examples
///
/// ```
/// use knowledge_context::{Entity, KnowledgeContext};
///
/// let ctx = KnowledgeContext::new();
/// let london = Entity::new(&ctx, "http://schema.org/Place");
/// london.text("name").set("London");
///
/// let found = ctx.get_entity_in_memory(london.id()).unwrap();
/// assert_eq!(found.text("name").value().as_deref(), Some("London"));
/// ```
#[derive(Clone)]
pub struct KnowledgeContext {
    inner: Arc<ContextInner>,
}

impl KnowledgeContext {
    /// Creates an empty context with no sources and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            ContextState::new(Uuid::new_v4()),
            Vec::new(),
            ContextConfig::default(),
        )
    }

    /// Returns a builder for contexts with sources or custom limits.
    #[must_use]
    pub fn builder() -> KnowledgeContextBuilder {
        KnowledgeContextBuilder::default()
    }

    fn from_parts(
        state: ContextState,
        sources: Vec<Arc<dyn EntitySource>>,
        config: ContextConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                state: RwLock::new(state),
                sources,
                registry: TypeRegistry::default(),
                config,
            }),
        }
    }

    /// Returns the id that identifies this context across serialization.
    #[must_use]
    pub fn context_id(&self) -> Uuid {
        self.inner.state.read().context_id
    }

    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Returns the entity sources in consultation order.
    #[must_use]
    pub fn sources(&self) -> &[Arc<dyn EntitySource>] {
        &self.inner.sources
    }

    /// Returns true if no entity is registered. Orphaned facts do not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.read().entity_count() == 0
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.inner.state.read().entity_count()
    }

    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.inner.state.read().fact_count()
    }

    /// Returns views of every registered entity in registration order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let state = self.inner.state.read();
        state
            .records()
            .iter()
            .map(|record| self.view_of(&state, record))
            .collect()
    }

    /// Returns a copy of the type inheritance table.
    #[must_use]
    pub fn inheritance(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.inner.state.read().inheritance().clone()
    }

    fn view_of(&self, state: &ContextState, record: &EntityRecord) -> Entity {
        let inherits_from = state
            .ancestors(&record.type_name)
            .cloned()
            .unwrap_or_else(|| record.inherits_from.clone());
        Entity::from_parts(
            self.clone(),
            record.id.clone(),
            record.type_name.clone(),
            inherits_from,
        )
    }

    // ---------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------

    /// Registers an entity view, replacing any record with the same id.
    ///
    /// Only the id, type name and ancestor set are kept. The ancestor set is
    /// copied into the inheritance table if it is non-empty and the type has
    /// no entry yet; later registrations never change an existing entry.
    pub fn associate_entity(&self, entity: &Entity) {
        self.inner.state.write().register(EntityRecord {
            id: entity.id().to_string(),
            type_name: entity.type_name().to_string(),
            inherits_from: entity.inherits_from().clone(),
        });
    }

    #[must_use]
    pub fn contains_entity(&self, entity_id: &str) -> bool {
        self.inner.state.read().contains_entity(entity_id)
    }

    /// Looks up a registered entity without consulting any source.
    ///
    /// The returned view carries the context's ancestor set for its type.
    #[must_use]
    pub fn get_entity_in_memory(&self, entity_id: &str) -> Option<Entity> {
        let state = self.inner.state.read();
        let record = state.record(entity_id)?;
        Some(self.view_of(&state, record))
    }

    /// Looks up a registered entity as `T` without consulting any source.
    ///
    /// Returns `None` if the id is unknown or the entity is not a `T`.
    #[must_use]
    pub fn get_entity_in_memory_typed<T: TypedEntity>(&self, entity_id: &str) -> Option<T> {
        let entity = self.get_entity_in_memory(entity_id)?;
        self.cast(entity)
    }

    /// Looks up an entity, asking the matching source to resolve it first if
    /// it is not registered yet.
    ///
    /// Ids without `://` and ids whose scheme no source claims are never
    /// resolved; they yield `Ok(None)` unless already registered.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by the source.
    pub async fn get_entity(&self, entity_id: &str) -> KnowledgeResult<Option<Entity>> {
        self.resolve_if_missing(entity_id).await?;
        Ok(self.get_entity_in_memory(entity_id))
    }

    /// Like [`get_entity`](Self::get_entity) but returns `None` unless the
    /// entity is a `T`.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by the source.
    pub async fn get_entity_typed<T: TypedEntity>(
        &self,
        entity_id: &str,
    ) -> KnowledgeResult<Option<T>> {
        self.resolve_if_missing(entity_id).await?;
        Ok(self.get_entity_in_memory_typed(entity_id))
    }

    async fn resolve_if_missing(&self, entity_id: &str) -> KnowledgeResult<()> {
        if self.contains_entity(entity_id) || !entity_id.contains("://") {
            return Ok(());
        }

        // Scheme is the text before the first ':'.
        let scheme = entity_id.split_once(':').map_or(entity_id, |(s, _)| s);
        let Some(source) = self
            .inner
            .sources
            .iter()
            .find(|source| source.scheme().eq_ignore_ascii_case(scheme))
        else {
            debug!(scheme, entity_id, "no entity source for scheme");
            return Ok(());
        };

        debug!(scheme, entity_id, "resolving entity from source");
        source.resolve_entity(self, entity_id).await
    }

    /// Returns every registered entity whose id is in `ids` and that is a `T`,
    /// in registration order.
    #[must_use]
    pub fn entities_of_type<T: TypedEntity>(&self, ids: &HashSet<String>) -> Vec<T> {
        let candidates: Vec<Entity> = {
            let state = self.inner.state.read();
            state
                .records()
                .iter()
                .filter(|record| ids.contains(&record.id))
                .map(|record| self.view_of(&state, record))
                .collect()
        };

        candidates
            .into_iter()
            .filter_map(|entity| self.cast(entity))
            .collect()
    }

    /// Recasts `entity` to `T` through the type registry if it is a `T`.
    pub(crate) fn cast<T: TypedEntity>(&self, entity: Entity) -> Option<T> {
        if !self.is_a::<T>(entity.type_name(), entity.id()) {
            return None;
        }
        self.inner.registry.construct::<T>(entity)
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    /// Decides whether an entity of `child_type` with id `entity_id` is a `T`.
    ///
    /// - [`Entity`] matches everything.
    /// - If `T` is an enumerated singleton and `entity_id` is an enum id, the
    ///   ids must be equal.
    /// - Otherwise `child_type` must equal `T`'s type name or list it as an
    ///   ancestor in the inheritance table.
    #[must_use]
    pub fn is_a<T: TypedEntity>(&self, child_type: &str, entity_id: &str) -> bool {
        if T::is_wildcard() {
            return true;
        }

        let descriptor = self.inner.registry.descriptor::<T>();
        if let Some(enum_id) = descriptor.enum_id {
            if entity_id.starts_with(ENUM_ID_PREFIX) {
                return entity_id == enum_id;
            }
        }

        self.inherits_from(child_type, descriptor.type_name)
    }

    /// Returns true if `child_type` is `parent_type` or lists it as an ancestor.
    #[must_use]
    pub fn inherits_from(&self, child_type: &str, parent_type: &str) -> bool {
        self.inner
            .state
            .read()
            .type_inherits(child_type, parent_type)
    }

    /// Registers `T` with this context's type registry and returns its descriptor.
    ///
    /// Registration also happens implicitly the first time `T` is used.
    pub fn register_type<T: TypedEntity>(&self) -> Arc<TypeDescriptor> {
        self.inner.registry.descriptor::<T>()
    }

    /// Returns the type names of every wrapper registered so far.
    #[must_use]
    pub fn registered_type_names(&self) -> Vec<&'static str> {
        self.inner.registry.type_names()
    }

    // ---------------------------------------------------------------------
    // Facts
    // ---------------------------------------------------------------------

    /// Appends a fact.
    pub fn associate(&self, fact: Fact) {
        self.inner.state.write().associate(fact);
    }

    /// Removes every fact for `(subject, relation)`, returning how many were removed.
    pub fn disassociate(&self, subject: &str, relation: &str) -> usize {
        self.inner.state.write().disassociate(subject, relation)
    }

    /// Replaces every fact for the fact's subject and relation with this one.
    pub fn overwrite(&self, fact: Fact) {
        self.inner.state.write().overwrite(fact);
    }

    /// Returns the facts about `subject`, optionally restricted to one relation,
    /// in insertion order.
    #[must_use]
    pub fn facts_of(&self, subject: &str, relation: Option<&str>) -> Vec<Fact> {
        self.inner.state.read().facts_of(subject, relation)
    }

    pub(crate) fn replace_facts(&self, subject: &str, facts: Vec<Fact>) {
        self.inner.state.write().replace_facts(subject, facts);
    }
}

impl Default for KnowledgeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for KnowledgeContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.context_id() == other.context_id()
    }
}

impl Eq for KnowledgeContext {}

impl Hash for KnowledgeContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.context_id().hash(state);
    }
}

impl fmt::Debug for KnowledgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        let schemes: Vec<&str> = self.inner.sources.iter().map(|s| s.scheme()).collect();
        f.debug_struct("KnowledgeContext")
            .field("context_id", &state.context_id)
            .field("entities", &state.entity_count())
            .field("facts", &state.fact_count())
            .field("sources", &schemes)
            .finish()
    }
}

/// Builder for [`KnowledgeContext`].
///
/// # Examples
///
/// ```
/// use knowledge_context::{ContextConfig, EnumEntitySource, KnowledgeContext};
///
/// let ctx = KnowledgeContext::builder()
///     .source(EnumEntitySource)
///     .config(ContextConfig::default())
///     .build()
///     .unwrap();
/// assert_eq!(ctx.sources().len(), 1);
/// ```
#[derive(Default)]
pub struct KnowledgeContextBuilder {
    sources: Vec<Arc<dyn EntitySource>>,
    config: ContextConfig,
}

impl KnowledgeContextBuilder {
    /// Adds an entity source. Sources are consulted in the order added.
    #[must_use]
    pub fn source(mut self, source: impl EntitySource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Adds an already shared entity source.
    #[must_use]
    pub fn shared_source(mut self, source: Arc<dyn EntitySource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds several shared sources.
    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = Arc<dyn EntitySource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    #[must_use]
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds an empty context.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Config` if the configuration is invalid.
    pub fn build(self) -> KnowledgeResult<KnowledgeContext> {
        let config = self.config.validate()?;
        Ok(KnowledgeContext::from_parts(
            ContextState::new(Uuid::new_v4()),
            self.sources,
            config,
        ))
    }

    fn build_with_state(self, state: ContextState) -> KnowledgeContext {
        KnowledgeContext::from_parts(state, self.sources, self.config)
    }
}

impl fmt::Debug for KnowledgeContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes: Vec<&str> = self.sources.iter().map(|s| s.scheme()).collect();
        f.debug_struct("KnowledgeContextBuilder")
            .field("sources", &schemes)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_type;
    use crate::primitive::Primitive;
    use crate::source::EnumEntitySource;

    entity_type! {
        pub struct Thing: "http://schema.org/Thing";
    }

    entity_type! {
        pub struct Place: "http://schema.org/Place" extends ["http://schema.org/Thing"];
    }

    entity_type! {
        pub struct GenderType: "http://schema.org/GenderType" extends ["http://schema.org/Thing"];
    }

    entity_type! {
        pub struct Male: "http://schema.org/GenderType"
            extends ["http://schema.org/Thing"]
            singleton "enum://http://schema.org/Male";
    }

    entity_type! {
        pub struct Female: "http://schema.org/GenderType"
            extends ["http://schema.org/Thing"]
            singleton "enum://http://schema.org/Female";
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = KnowledgeContext::new();
        assert!(ctx.is_empty());
        assert_eq!(ctx.entity_count(), 0);
        assert_eq!(ctx.fact_count(), 0);
        assert!(!ctx.context_id().is_nil());
    }

    #[test]
    fn test_clones_share_state_and_identity() {
        let ctx = KnowledgeContext::new();
        let clone = ctx.clone();
        let _place = Place::new(&clone);
        assert_eq!(ctx.entity_count(), 1);
        assert_eq!(ctx, clone);
        assert_ne!(ctx, KnowledgeContext::new());
    }

    #[test]
    fn test_in_memory_lookup_carries_table_ancestors() {
        let ctx = KnowledgeContext::new();
        let place = Place::new(&ctx);
        let bare = Entity::with_id(&ctx, "http://schema.org/Place", "mem://bare");

        assert!(bare.inherits_from().is_empty());
        let found = ctx.get_entity_in_memory(bare.id()).unwrap();
        assert!(found.inherits_from().contains("http://schema.org/Thing"));
        assert!(ctx.get_entity_in_memory_typed::<Thing>(place.id()).is_some());
        assert!(ctx.get_entity_in_memory("mem://missing").is_none());
    }

    #[test]
    fn test_typed_lookup_rejects_unrelated_type() {
        let ctx = KnowledgeContext::new();
        let thing = Thing::new(&ctx);
        assert!(ctx.get_entity_in_memory_typed::<Place>(thing.id()).is_none());
        assert!(ctx.get_entity_in_memory_typed::<Entity>(thing.id()).is_some());
    }

    #[test]
    fn test_enum_identity_is_exact() {
        let ctx = KnowledgeContext::new();
        let male = Male::new(&ctx);
        assert_eq!(male.id(), "enum://http://schema.org/Male");

        assert!(ctx.is_a::<Male>(male.type_name(), male.id()));
        assert!(!ctx.is_a::<Female>(male.type_name(), male.id()));
        assert!(ctx.is_a::<GenderType>(male.type_name(), male.id()));
        assert!(ctx.is_a::<Thing>(male.type_name(), male.id()));
        assert!(ctx.get_entity_in_memory_typed::<Female>(male.id()).is_none());
    }

    #[test]
    fn test_entities_of_type_filters_and_orders() {
        let ctx = KnowledgeContext::new();
        let a = Place::new(&ctx);
        let b = Thing::new(&ctx);
        let c = Place::new(&ctx);
        let ids: HashSet<String> = [a.id(), b.id(), c.id(), "mem://missing"]
            .into_iter()
            .map(str::to_string)
            .collect();

        let places: Vec<Place> = ctx.entities_of_type(&ids);
        let place_ids: Vec<&str> = places.iter().map(|p| p.id()).collect();
        assert_eq!(place_ids, vec![a.id(), c.id()]);

        let things: Vec<Thing> = ctx.entities_of_type(&ids);
        assert_eq!(things.len(), 3);
    }

    #[test]
    fn test_fact_operations() {
        let ctx = KnowledgeContext::new();
        ctx.associate(Fact::new("mem://a", "tag", Primitive::text("x")));
        ctx.associate(Fact::new("mem://a", "tag", Primitive::text("y")));
        assert_eq!(ctx.facts_of("mem://a", Some("tag")).len(), 2);

        ctx.overwrite(Fact::new("mem://a", "tag", Primitive::text("z")));
        assert_eq!(ctx.facts_of("mem://a", None).len(), 1);

        assert_eq!(ctx.disassociate("mem://a", "tag"), 1);
        assert_eq!(ctx.fact_count(), 0);
    }

    #[test]
    fn test_registered_type_names() {
        let ctx = KnowledgeContext::new();
        ctx.register_type::<Place>();
        let _ = ctx.is_a::<Thing>("x", "mem://x");
        assert_eq!(
            ctx.registered_type_names(),
            vec!["http://schema.org/Place", "http://schema.org/Thing"]
        );
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = KnowledgeContext::builder()
            .config(ContextConfig {
                max_record_count: 0,
                ..ContextConfig::default()
            })
            .build()
            .unwrap_err();
        assert!(format!("{err}").contains("max_record_count"));
    }

    #[test]
    fn test_debug_lists_source_schemes() {
        let ctx = KnowledgeContext::builder()
            .source(EnumEntitySource)
            .build()
            .unwrap();
        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("enum"));
    }
}
