//! Entity sources.
//!
//! A source owns one id scheme (the text before `://`). When a lookup misses,
//! the context hands the id to the first source whose scheme matches,
//! case-insensitively, and then looks the id up again. A source populates
//! the context by creating entities and associating facts; it reports
//! "not found" simply by adding nothing.

use async_trait::async_trait;
use tracing::trace;

use crate::context::{KnowledgeContext, ENUM_ID_PREFIX, MEMORY_ID_PREFIX};
use crate::entity::Entity;
use crate::error::KnowledgeResult;

/// Resolves entity ids of one scheme into a context.
///
/// Sources may be called concurrently for the same id and should be idempotent.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use knowledge_context::{Entity, EntitySource, KnowledgeContext, KnowledgeResult};
///
/// struct People;
///
/// #[async_trait]
/// impl EntitySource for People {
///     fn scheme(&self) -> &str {
///         "people"
///     }
///
///     async fn resolve_entity(&self, context: &KnowledgeContext, entity_id: &str) -> KnowledgeResult<()> {
///         let person = Entity::with_id(context, "http://schema.org/Person", entity_id);
///         person.text("name").set("Someone");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Scheme this source resolves, without `://`.
    fn scheme(&self) -> &str;

    /// Loads `entity_id` and any facts about it into `context`.
    ///
    /// # Errors
    ///
    /// Failures are returned to the caller of the lookup unchanged.
    async fn resolve_entity(&self, context: &KnowledgeContext, entity_id: &str)
        -> KnowledgeResult<()>;
}

/// Source for `mem://` ids. In-memory entities have no external identity, so
/// this never adds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryEntitySource;

#[async_trait]
impl EntitySource for MemoryEntitySource {
    fn scheme(&self) -> &str {
        MEMORY_ID_PREFIX.trim_end_matches("://")
    }

    async fn resolve_entity(
        &self,
        _context: &KnowledgeContext,
        entity_id: &str,
    ) -> KnowledgeResult<()> {
        trace!(entity_id, "memory entities cannot be resolved");
        Ok(())
    }
}

/// Source for `enum://` ids.
///
/// Registers a placeholder entity for the requested id. Its type name is the
/// `enum://` prefix of the id, so the placeholder only satisfies typed
/// lookups through enum identity, never through type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumEntitySource;

#[async_trait]
impl EntitySource for EnumEntitySource {
    fn scheme(&self) -> &str {
        ENUM_ID_PREFIX.trim_end_matches("://")
    }

    async fn resolve_entity(
        &self,
        context: &KnowledgeContext,
        entity_id: &str,
    ) -> KnowledgeResult<()> {
        let type_name = entity_id.get(..ENUM_ID_PREFIX.len()).unwrap_or(entity_id);
        trace!(entity_id, type_name, "registering enum placeholder");
        let _ = Entity::with_id(context, type_name, entity_id);
        Ok(())
    }
}
