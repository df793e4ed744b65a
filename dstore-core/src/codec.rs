//! Canonical, comparable serialization of keys
//!
//! A key is encoded as the standard base64 of its protobuf wire encoding.
//! The wire encoding writes fields in tag order with no maps, so equal keys
//! always produce identical bytes and distinct keys never collide.

use crate::wire::{key_from_proto, key_to_proto};
use crate::{Error, Key, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dstore_proto as proto;
use prost::Message;
use std::borrow::Borrow;
use std::fmt;

/// Opaque encoded form of a [`Key`], usable as a map key for result correlation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedKey(String);

impl EncodedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode back into a key.
    pub fn decode(&self) -> Result<Key> {
        KeyCodec::decode(&self.0)
    }
}

impl fmt::Display for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EncodedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EncodedKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Key encoder/decoder
pub struct KeyCodec;

impl KeyCodec {
    pub fn encode(key: &Key) -> EncodedKey {
        EncodedKey(STANDARD.encode(key_to_proto(key).encode_to_vec()))
    }

    /// Inverse of [`KeyCodec::encode`]. Fails with `MalformedKey` on bad
    /// base64, bad protobuf or an invalid path.
    pub fn decode(encoded: &str) -> Result<Key> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::MalformedKey(format!("invalid base64: {}", e)))?;
        let wire = proto::Key::decode(bytes.as_slice())
            .map_err(|e| Error::MalformedKey(format!("invalid key encoding: {}", e)))?;
        key_from_proto(wire)
    }

    /// Structural key equality, defined over the encoded form.
    pub fn keys_match(a: &Key, b: &Key) -> bool {
        Self::encode(a) == Self::encode(b)
    }
}

impl Key {
    /// Shorthand for [`KeyCodec::encode`].
    pub fn encode(&self) -> EncodedKey {
        KeyCodec::encode(self)
    }
}
