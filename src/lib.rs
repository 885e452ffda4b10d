//! # knowledge-context
//!
//! A context-scoped knowledge graph for language-understanding pipelines.
//! Extracted real-world entities (places, times, named things) are typed
//! views over relational facts held by a [`KnowledgeContext`]. Contexts pull
//! in missing entities lazily from pluggable [`EntitySource`]s and persist
//! themselves as versioned binary snapshots.
//!
//! ## Core Concepts
//!
//! - **Primitive**: a tagged scalar (identifier, number, text, boolean, date/time)
//! - **Fact**: a `(subject, relation, primitive)` triple
//! - **Entity**: an id plus declared type, viewed through a context
//! - **Field**: a typed accessor translating get/set into fact operations
//! - **KnowledgeContext**: owns facts, entity registrations and type inheritance
//!
//! ## Usage
//!
//! ```rust
//! use knowledge_context::{entity_type, KnowledgeContext, TextField};
//!
//! entity_type! {
//!     pub struct Place: "http://schema.org/Place" extends ["http://schema.org/Thing"];
//! }
//!
//! impl Place {
//!     pub fn name(&self) -> TextField {
//!         self.text("name")
//!     }
//! }
//!
//! let ctx = KnowledgeContext::new();
//! let london = Place::new(&ctx);
//! london.name().set("London");
//!
//! let bytes = ctx.serialize().unwrap();
//! let restored = KnowledgeContext::deserialize(&bytes).unwrap();
//! let place: Place = restored.get_entity_in_memory_typed(london.id()).unwrap();
//! assert_eq!(place.name().value().as_deref(), Some("London"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod fact;
pub mod field;
pub mod primitive;
pub mod source;
pub mod time;

pub use config::ContextConfig;
pub use context::{KnowledgeContext, KnowledgeContextBuilder, TypeDescriptor};
pub use entity::{Entity, EntityReference, HasEntityId, TypedEntity};
pub use error::{KnowledgeError, KnowledgeResult};
pub use fact::Fact;
pub use field::{BooleanField, Field, FieldKind, NumberField, ReferenceField, TextField, TimeField};
pub use primitive::{Primitive, PrimitiveKind};
pub use source::{EntitySource, EnumEntitySource, MemoryEntitySource};
pub use time::PartialDateTime;
