//! Binary snapshots and text embedding of a knowledge context.
//!
//! ```text
//! header            : i32 = MAGIC_NUMBER | version
//! context_id        : 16 bytes
//! entity_count      : i32, then { id: str, type_name: str } each
//! fact_count        : i32, then Fact each
//! inheritance_count : i32, then { type_name: str, ancestor_count: i32, ancestors: str... } each
//! ```

use std::io::{Cursor, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ContextState, EntityRecord, KnowledgeContext, KnowledgeContextBuilder};
use crate::codec::{self, SERIALIZED_VERSION};
use crate::config::ContextConfig;
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::fact::Fact;

/// Encodes `state`, enforcing the same limits `decode_state` applies so that
/// every snapshot a context writes can be read back under its config.
fn encode_state(
    state: &ContextState,
    writer: &mut impl Write,
    version: u8,
    config: &ContextConfig,
) -> KnowledgeResult<()> {
    codec::write_header(writer, version)?;
    writer.write_all(&state.context_id.to_bytes_le())?;

    let records = state.records();
    codec::write_count(writer, records.len(), config)?;
    for record in records {
        codec::write_string(writer, &record.id, config)?;
        codec::write_string(writer, &record.type_name, config)?;
    }

    let groups = state.fact_groups();
    codec::write_count(writer, state.fact_count(), config)?;
    for (_, facts) in &groups {
        for fact in *facts {
            fact.encode(writer, version, config)?;
        }
    }

    let inheritance = state.inheritance();
    codec::write_count(writer, inheritance.len(), config)?;
    for (type_name, ancestors) in inheritance {
        codec::write_string(writer, type_name, config)?;
        codec::write_count(writer, ancestors.len(), config)?;
        for ancestor in ancestors {
            codec::write_string(writer, ancestor, config)?;
        }
    }

    Ok(())
}

fn decode_state(reader: &mut impl Read, config: &ContextConfig) -> KnowledgeResult<ContextState> {
    let version = codec::read_header(reader)?;

    let mut id_bytes = [0u8; 16];
    reader.read_exact(&mut id_bytes).map_err(codec::read_err)?;
    let mut state = ContextState::new(Uuid::from_bytes_le(id_bytes));

    let entity_count = codec::read_count(reader, config)?;
    for _ in 0..entity_count {
        let id = codec::read_string(reader, config)?;
        let type_name = codec::read_string(reader, config)?;
        state.register(EntityRecord {
            id,
            type_name,
            inherits_from: Default::default(),
        });
    }

    let fact_count = codec::read_count(reader, config)?;
    for _ in 0..fact_count {
        state.associate(Fact::decode(reader, version, config)?);
    }

    let inheritance_count = codec::read_count(reader, config)?;
    for _ in 0..inheritance_count {
        let type_name = codec::read_string(reader, config)?;
        let ancestor_count = codec::read_count(reader, config)?;
        let mut ancestors = std::collections::BTreeSet::new();
        for _ in 0..ancestor_count {
            ancestors.insert(codec::read_string(reader, config)?);
        }
        state.set_inheritance(type_name, ancestors);
    }

    debug!(
        version,
        entities = entity_count,
        facts = fact_count,
        types = inheritance_count,
        "decoded context snapshot"
    );
    Ok(state)
}

impl KnowledgeContext {
    /// Serializes the context into a new buffer using the current format version.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` if a string, primitive or count
    /// exceeds this context's [`ContextConfig`] limits, which are the limits
    /// a reader with the same config enforces.
    pub fn serialize(&self) -> KnowledgeResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize_to(&mut buf)?;
        Ok(buf)
    }

    /// Serializes the context to `writer` using the current format version.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` if the context exceeds its
    /// configured limits, in which case nothing is written, and
    /// `KnowledgeError::Io` if the writer fails.
    pub fn serialize_to(&self, writer: &mut impl Write) -> KnowledgeResult<()> {
        self.serialize_to_version(writer, SERIALIZED_VERSION)
    }

    /// Serializes the context using an older format version, for readers that
    /// have not been upgraded.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` if `version` is zero or newer than
    /// the current format or if the context exceeds its configured limits,
    /// and `KnowledgeError::Io` if the writer fails.
    pub fn serialize_to_version(&self, writer: &mut impl Write, version: u8) -> KnowledgeResult<()> {
        if version == 0 || version > SERIALIZED_VERSION {
            return Err(KnowledgeError::invalid_data(format!(
                "cannot write snapshot version {version}; supported versions are 1..={SERIALIZED_VERSION}"
            )));
        }

        // Encode under the read lock, write after releasing it.
        let mut buf = Vec::new();
        encode_state(&self.inner.state.read(), &mut buf, version, &self.inner.config).map_err(
            |err| {
                warn!(error = %err, "refused to serialize context");
                err
            },
        )?;
        writer.write_all(&buf)?;
        debug!(version, bytes = buf.len(), "serialized context snapshot");
        Ok(())
    }

    /// Restores a context with no sources and default limits.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` for foreign, future-version,
    /// truncated or oversized streams.
    pub fn deserialize(bytes: &[u8]) -> KnowledgeResult<Self> {
        Self::builder().deserialize(bytes)
    }

    /// Restores a context from `reader` with no sources and default limits.
    ///
    /// # Errors
    ///
    /// See [`deserialize`](Self::deserialize); reader failures are `KnowledgeError::Io`.
    pub fn deserialize_from(reader: &mut impl Read) -> KnowledgeResult<Self> {
        Self::builder().deserialize_from(reader)
    }

    /// Encodes the context as a text payload: empty for a context without
    /// entities, otherwise the base64 snapshot.
    ///
    /// # Errors
    ///
    /// See [`serialize`](Self::serialize).
    pub fn to_embedded_string(&self) -> KnowledgeResult<String> {
        if self.is_empty() {
            return Ok(String::new());
        }
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Decodes a payload produced by [`to_embedded_string`](Self::to_embedded_string).
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` for malformed base64 or snapshots.
    pub fn from_embedded_str(text: &str) -> KnowledgeResult<Self> {
        Self::builder().from_embedded_str(text)
    }
}

impl KnowledgeContextBuilder {
    /// Restores a context from a snapshot, attaching this builder's sources and config.
    ///
    /// The whole snapshot is decoded before the context is created, so a
    /// failure never leaves a partially populated context behind.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::Config` for an invalid configuration and
    /// `KnowledgeError::InvalidData` for malformed streams.
    pub fn deserialize(self, bytes: &[u8]) -> KnowledgeResult<KnowledgeContext> {
        self.deserialize_from(&mut Cursor::new(bytes))
    }

    /// Like [`deserialize`](Self::deserialize), reading from any stream.
    ///
    /// # Errors
    ///
    /// See [`deserialize`](Self::deserialize); reader failures are `KnowledgeError::Io`.
    pub fn deserialize_from(mut self, reader: &mut impl Read) -> KnowledgeResult<KnowledgeContext> {
        self.config = self.config.validate()?;
        let state = decode_state(reader, &self.config).map_err(|err| {
            warn!(error = %err, "rejected context snapshot");
            err
        })?;
        Ok(self.build_with_state(state))
    }

    /// Decodes an embedded text payload; an empty payload yields a fresh context.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` for malformed base64 or snapshots.
    pub fn from_embedded_str(self, text: &str) -> KnowledgeResult<KnowledgeContext> {
        if text.is_empty() {
            return self.build();
        }

        let bytes = STANDARD
            .decode(text)
            .map_err(|e| KnowledgeError::invalid_data(format!("invalid base64 context: {e}")))?;
        self.deserialize(&bytes)
    }
}

impl Serialize for KnowledgeContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self
            .to_embedded_string()
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for KnowledgeContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_embedded_str(&text).map_err(serde::de::Error::custom)
    }
}
