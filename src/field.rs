//! Typed field accessors.
//!
//! A field is a `(subject, relation)` pair read and written through the
//! owning context. Each accessor only sees facts of its own kind, so a
//! relation holding both text and numbers looks like two independent fields
//! when read. Writing with `set` replaces every value of the relation,
//! whatever its kind.

use std::fmt;
use std::marker::PhantomData;

use crate::context::KnowledgeContext;
use crate::entity::{HasEntityId, TypedEntity};
use crate::error::KnowledgeResult;
use crate::fact::Fact;
use crate::primitive::Primitive;
use crate::time::PartialDateTime;

/// Maps a Rust value type onto primitives of one kind.
pub trait FieldKind {
    type Value;

    /// Returns true if the primitive belongs to this kind.
    fn matches(value: &Primitive) -> bool;

    fn decode(value: &Primitive) -> Option<Self::Value>;

    /// Encodes a value; `None` means the value clears the field.
    fn encode(value: Self::Value) -> Option<Primitive>;
}

/// Text values. An empty string clears the field.
#[derive(Debug, Clone, Copy)]
pub enum Text {}

#[derive(Debug, Clone, Copy)]
pub enum Number {}

#[derive(Debug, Clone, Copy)]
pub enum Boolean {}

/// Partial date/time values of any of the three temporal kinds.
#[derive(Debug, Clone, Copy)]
pub enum Time {}

impl FieldKind for Text {
    type Value = String;

    fn matches(value: &Primitive) -> bool {
        value.is_text()
    }

    fn decode(value: &Primitive) -> Option<String> {
        value.as_text().ok().map(str::to_string)
    }

    fn encode(value: String) -> Option<Primitive> {
        (!value.is_empty()).then(|| Primitive::text(value))
    }
}

impl FieldKind for Number {
    type Value = f64;

    fn matches(value: &Primitive) -> bool {
        value.is_number()
    }

    fn decode(value: &Primitive) -> Option<f64> {
        value.as_number().ok()
    }

    fn encode(value: f64) -> Option<Primitive> {
        Some(Primitive::number(value))
    }
}

impl FieldKind for Boolean {
    type Value = bool;

    fn matches(value: &Primitive) -> bool {
        value.is_boolean()
    }

    fn decode(value: &Primitive) -> Option<bool> {
        value.as_boolean().ok()
    }

    fn encode(value: bool) -> Option<Primitive> {
        Some(Primitive::boolean(value))
    }
}

impl FieldKind for Time {
    type Value = PartialDateTime;

    fn matches(value: &Primitive) -> bool {
        value.is_temporal()
    }

    fn decode(value: &Primitive) -> Option<PartialDateTime> {
        value.as_date_time().ok()
    }

    fn encode(value: PartialDateTime) -> Option<Primitive> {
        Some(Primitive::date_time(&value))
    }
}

/// Accessor for one scalar relation of one entity.
///
/// # Examples
///
/// ```
/// use knowledge_context::{Entity, KnowledgeContext};
///
/// let ctx = KnowledgeContext::new();
/// let city = Entity::new(&ctx, "http://schema.org/Place");
///
/// city.text("alternateName").add("The Smoke");
/// city.text("alternateName").add("The Big Smoke");
/// assert_eq!(city.text("alternateName").list().len(), 2);
///
/// city.text("alternateName").set("Londinium");
/// assert_eq!(city.text("alternateName").list(), vec!["Londinium".to_string()]);
/// ```
pub struct Field<K: FieldKind> {
    context: KnowledgeContext,
    subject: String,
    relation: String,
    _kind: PhantomData<fn() -> K>,
}

pub type TextField = Field<Text>;
pub type NumberField = Field<Number>;
pub type BooleanField = Field<Boolean>;
pub type TimeField = Field<Time>;

impl<K: FieldKind> Field<K> {
    pub(crate) fn new(context: KnowledgeContext, subject: &str, relation: &str) -> Self {
        Self {
            context,
            subject: subject.to_string(),
            relation: relation.to_string(),
            _kind: PhantomData,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Returns the first value of this kind, if any.
    #[must_use]
    pub fn value(&self) -> Option<K::Value> {
        self.context
            .facts_of(&self.subject, Some(&self.relation))
            .iter()
            .filter(|fact| K::matches(&fact.value))
            .find_map(|fact| K::decode(&fact.value))
    }

    /// Returns every value of this kind in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<K::Value> {
        self.context
            .facts_of(&self.subject, Some(&self.relation))
            .iter()
            .filter(|fact| K::matches(&fact.value))
            .filter_map(|fact| K::decode(&fact.value))
            .collect()
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value().is_some()
    }

    /// Replaces every value of the relation with `value`.
    pub fn set(&self, value: impl Into<K::Value>) {
        match K::encode(value.into()) {
            Some(primitive) => self
                .context
                .overwrite(Fact::new(&*self.subject, &*self.relation, primitive)),
            None => self.clear(),
        }
    }

    /// Sets the value, or clears the field for `None`.
    pub fn set_option(&self, value: Option<K::Value>) {
        match value {
            Some(v) => self.set(v),
            None => self.clear(),
        }
    }

    /// Appends a value. Values that would clear the field are ignored.
    pub fn add(&self, value: impl Into<K::Value>) {
        if let Some(primitive) = K::encode(value.into()) {
            self.context
                .associate(Fact::new(&*self.subject, &*self.relation, primitive));
        }
    }

    /// Removes every value of the relation, of any kind.
    pub fn clear(&self) {
        self.context.disassociate(&self.subject, &self.relation);
    }
}

impl<K: FieldKind> Clone for Field<K> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            subject: self.subject.clone(),
            relation: self.relation.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: FieldKind> fmt::Debug for Field<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("subject", &self.subject)
            .field("relation", &self.relation)
            .finish_non_exhaustive()
    }
}

/// Accessor for a relation whose values reference entities of type `T`.
///
/// Only referenced entities that are a `T` are returned; others are skipped.
pub struct ReferenceField<T> {
    context: KnowledgeContext,
    subject: String,
    relation: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TypedEntity> ReferenceField<T> {
    pub(crate) fn new(context: KnowledgeContext, subject: &str, relation: &str) -> Self {
        Self {
            context,
            subject: subject.to_string(),
            relation: relation.to_string(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Lists the referenced ids in insertion order, resolved or not.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.context
            .facts_of(&self.subject, Some(&self.relation))
            .iter()
            .filter_map(|fact| fact.referenced_id().map(str::to_string))
            .collect()
    }

    /// Returns the first referenced entity that is a `T`, asking sources to
    /// resolve ids that are not in memory.
    ///
    /// # Errors
    ///
    /// Propagates source failures.
    pub async fn get(&self) -> KnowledgeResult<Option<T>> {
        for id in self.ids() {
            if let Some(found) = self.context.get_entity_typed::<T>(&id).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Returns every referenced entity that is a `T`, asking sources to
    /// resolve ids that are not in memory.
    ///
    /// # Errors
    ///
    /// Propagates source failures.
    pub async fn list(&self) -> KnowledgeResult<Vec<T>> {
        let mut out = Vec::new();
        for id in self.ids() {
            if let Some(found) = self.context.get_entity_typed::<T>(&id).await? {
                out.push(found);
            }
        }
        Ok(out)
    }

    /// Like [`get`](Self::get) but never consults sources.
    #[must_use]
    pub fn get_in_memory(&self) -> Option<T> {
        self.ids()
            .iter()
            .find_map(|id| self.context.get_entity_in_memory_typed::<T>(id))
    }

    /// Like [`list`](Self::list) but never consults sources.
    #[must_use]
    pub fn list_in_memory(&self) -> Vec<T> {
        self.ids()
            .iter()
            .filter_map(|id| self.context.get_entity_in_memory_typed::<T>(id))
            .collect()
    }

    /// Replaces every value of the relation with a reference to `target`.
    pub fn set(&self, target: &impl HasEntityId) {
        self.context.overwrite(self.fact_for(target.entity_id()));
    }

    /// Sets the reference, or clears the field for `None`.
    pub fn set_option(&self, target: Option<&dyn HasEntityId>) {
        match target {
            Some(t) => self.context.overwrite(self.fact_for(t.entity_id())),
            None => self.clear(),
        }
    }

    /// Appends a reference to `target`.
    pub fn add(&self, target: &impl HasEntityId) {
        self.context.associate(self.fact_for(target.entity_id()));
    }

    /// Removes every value of the relation, of any kind.
    pub fn clear(&self) {
        self.context.disassociate(&self.subject, &self.relation);
    }

    fn fact_for(&self, entity_id: &str) -> Fact {
        Fact::new(&*self.subject, &*self.relation, Primitive::identifier(entity_id))
    }
}

impl<T> Clone for ReferenceField<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            subject: self.subject.clone(),
            relation: self.relation.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ReferenceField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceField")
            .field("subject", &self.subject)
            .field("relation", &self.relation)
            .finish_non_exhaustive()
    }
}
