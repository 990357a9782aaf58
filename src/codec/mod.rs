//! Custom codecs that replace built-in coercion for a single field.
//!
//! A codec is constructed once per `(kind, parameter)` pair by the
//! [`CodecRegistry`] and then shared by every field that names the same
//! configuration, so it must be immutable and thread-safe.

pub mod builtin;
mod registry;

use std::sync::Arc;

use anyhow::Result;

pub use builtin::{DateCodec, DateTimeCodec, FlagCodec, PatternCodec};
pub use registry::CodecRegistry;

use crate::{error::CodecInitError, sheet::CellValue};

pub trait Codec: Send + Sync + Sized + 'static {
    type Value: Send + Sync + 'static;

    /// Name the codec is registered and referenced under.
    const KIND: &'static str;

    /// Builds the codec from its configuration parameter, `None` meaning the
    /// field declared no parameter.
    fn from_param(param: Option<&str>) -> Result<Self, CodecInitError>;

    fn decode(&self, text: &str) -> Result<Self::Value>;

    /// `Ok(None)` leaves the target cell untouched.
    fn encode(&self, value: &Self::Value) -> Result<Option<CellValue>>;
}

/// Object-safe view of a codec for one value type.
pub trait DynCodec<T>: Send + Sync {
    fn kind(&self) -> &'static str;
    fn decode_text(&self, text: &str) -> Result<T>;
    fn encode_value(&self, value: &T) -> Result<Option<CellValue>>;
}

impl<C: Codec> DynCodec<C::Value> for C {
    fn kind(&self) -> &'static str {
        C::KIND
    }

    fn decode_text(&self, text: &str) -> Result<C::Value> {
        self.decode(text)
    }

    fn encode_value(&self, value: &C::Value) -> Result<Option<CellValue>> {
        self.encode(value)
    }
}

pub type SharedCodec<T> = Arc<dyn DynCodec<T>>;

/// Codec view over cell text alone, for fields that keep no typed value.
pub trait TextCodec: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Decodes `text` and encodes the result again, yielding the codec's
    /// canonical cell for it.
    fn canonicalize(&self, text: &str) -> Result<Option<CellValue>>;
}

pub(crate) struct TextView<T>(pub(crate) SharedCodec<T>);

impl<T: 'static> TextCodec for TextView<T> {
    fn kind(&self) -> &'static str {
        self.0.kind()
    }

    fn canonicalize(&self, text: &str) -> Result<Option<CellValue>> {
        let value = self.0.decode_text(text)?;
        self.0.encode_value(&value)
    }
}

/// Declared reference from a field to a codec configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodecRef {
    pub kind: String,
    pub param: String,
}

impl CodecRef {
    pub fn new(kind: &str, param: &str) -> Self {
        CodecRef {
            kind: kind.to_string(),
            param: param.to_string(),
        }
    }

    /// The parameter as handed to [`Codec::from_param`].
    pub fn param(&self) -> Option<&str> {
        Some(self.param.as_str()).filter(|param| !param.is_empty())
    }
}
