//! Message registry
//!
//! Maps structured messages to wire type ids and payload bytes, and back.
//! The coordinator only ever talks to the `MessageRegistry` trait.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, WireError};

/// Type-id / payload mapping used by the coordinator
pub trait MessageRegistry {
    type Message;

    /// Wire type id of a message
    fn type_of(&self, message: &Self::Message) -> Result<u32>;

    /// Payload bytes of a message
    fn serialize(&self, message: &Self::Message) -> Result<Vec<u8>>;

    /// Rebuild a message from its type id and payload
    fn deserialize(&self, message_type: u32, payload: Bytes) -> Result<Self::Message>;
}

// =============================================================================
// Opaque pass-through
// =============================================================================

/// A message whose payload is left uninterpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub message_type: u32,
    pub payload: Bytes,
}

impl RawMessage {
    pub fn new(message_type: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }
}

/// Registry that hands payloads through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueRegistry;

impl MessageRegistry for OpaqueRegistry {
    type Message = RawMessage;

    fn type_of(&self, message: &RawMessage) -> Result<u32> {
        Ok(message.message_type)
    }

    fn serialize(&self, message: &RawMessage) -> Result<Vec<u8>> {
        Ok(message.payload.to_vec())
    }

    fn deserialize(&self, message_type: u32, payload: Bytes) -> Result<RawMessage> {
        Ok(RawMessage {
            message_type,
            payload,
        })
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A message type the catalog can send
pub trait CatalogMessage {
    fn message_type(&self) -> u32;

    fn to_bytes(&self) -> Result<Vec<u8>>;
}

/// Serialize a payload with bincode, for `CatalogMessage::to_bytes`
pub fn encode_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| WireError::Serialization(e.to_string()))
}

type Constructor<M> = Box<dyn Fn(Bytes) -> Result<M> + Send + Sync>;

/// Type-id to constructor table
pub struct MessageCatalog<M> {
    constructors: HashMap<u32, Constructor<M>>,
}

impl<M: 'static> MessageCatalog<M> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor for `message_type`, replacing any earlier one
    pub fn register<F>(&mut self, message_type: u32, constructor: F) -> &mut Self
    where
        F: Fn(Bytes) -> Result<M> + Send + Sync + 'static,
    {
        self.constructors.insert(message_type, Box::new(constructor));
        self
    }

    /// Register a bincode-encoded payload type
    pub fn register_bincode<T>(&mut self, message_type: u32) -> &mut Self
    where
        T: DeserializeOwned + Into<M> + 'static,
    {
        self.register(message_type, |payload| {
            bincode::deserialize::<T>(&payload)
                .map(Into::into)
                .map_err(|e| WireError::Serialization(e.to_string()))
        })
    }

    /// Pass payloads of `message_type` through without parsing
    pub fn register_opaque(&mut self, message_type: u32) -> &mut Self
    where
        M: From<RawMessage>,
    {
        self.register(message_type, move |payload| {
            Ok(M::from(RawMessage {
                message_type,
                payload,
            }))
        })
    }

    pub fn contains(&self, message_type: u32) -> bool {
        self.constructors.contains_key(&message_type)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<M: 'static> Default for MessageCatalog<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MessageCatalog<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.constructors.keys().collect();
        types.sort();
        f.debug_struct("MessageCatalog").field("types", &types).finish()
    }
}

impl<M: CatalogMessage> MessageRegistry for MessageCatalog<M> {
    type Message = M;

    fn type_of(&self, message: &M) -> Result<u32> {
        Ok(message.message_type())
    }

    fn serialize(&self, message: &M) -> Result<Vec<u8>> {
        message.to_bytes()
    }

    fn deserialize(&self, message_type: u32, payload: Bytes) -> Result<M> {
        let constructor = self
            .constructors
            .get(&message_type)
            .ok_or(WireError::UnknownMessageType(message_type))?;
        constructor(payload)
    }
}
