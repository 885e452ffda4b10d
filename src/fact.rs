//! Relational fact records.
//!
//! A fact states that `subject` has `value` for `relation`. Facts sharing a
//! subject and relation form an ordered multiset; there is no uniqueness
//! constraint at this layer.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::ContextConfig;
use crate::error::KnowledgeResult;
use crate::primitive::Primitive;

/// A `(subject, relation, value)` triple.
///
/// # Examples
///
/// ```
/// use knowledge_context::{Fact, Primitive};
///
/// let fact = Fact::new("mem://london", "name", Primitive::text("London"));
/// assert_eq!(fact.relation, "name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    /// Id of the entity this fact describes
    pub subject: String,
    /// Relation (field) name
    pub relation: String,
    pub value: Primitive,
}

impl Fact {
    #[must_use]
    pub fn new(subject: impl Into<String>, relation: impl Into<String>, value: Primitive) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            value,
        }
    }

    /// Returns true if this fact is about `subject` and `relation`.
    #[must_use]
    pub fn matches(&self, subject: &str, relation: &str) -> bool {
        self.subject == subject && self.relation == relation
    }

    /// Returns the referenced entity id if the value is an identifier.
    #[must_use]
    pub fn referenced_id(&self) -> Option<&str> {
        if self.value.is_identifier() {
            self.value.as_identifier().ok()
        } else {
            None
        }
    }

    /// Writes `[subject][relation][primitive]`.
    pub fn encode(
        &self,
        writer: &mut impl Write,
        version: u8,
        config: &ContextConfig,
    ) -> KnowledgeResult<()> {
        codec::write_string(writer, &self.subject, config)?;
        codec::write_string(writer, &self.relation, config)?;
        self.value.encode(writer, version, config)
    }

    /// Reads a fact written by [`encode`](Self::encode).
    pub fn decode(
        reader: &mut impl Read,
        version: u8,
        config: &ContextConfig,
    ) -> KnowledgeResult<Self> {
        let subject = codec::read_string(reader, config)?;
        let relation = codec::read_string(reader, config)?;
        let value = Primitive::decode(reader, version, config)?;
        Ok(Self {
            subject,
            relation,
            value,
        })
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.value)
    }
}
