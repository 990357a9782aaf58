use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use log::debug;

use super::{Codec, CodecRef, SharedCodec, TextCodec, TextView};
use crate::error::{CodecError, CodecInitError};

type ErasedCodec = Arc<dyn Any + Send + Sync>;

struct CodecKind {
    name: &'static str,
    codec_type: TypeId,
    codec_type_name: &'static str,
    value_type: TypeId,
    value_type_name: &'static str,
    construct: fn(Option<&str>) -> Result<ErasedCodec, CodecInitError>,
    text_view: fn(&ErasedCodec) -> Option<Arc<dyn TextCodec>>,
}

impl CodecKind {
    fn of<C: Codec>() -> Self {
        CodecKind {
            name: C::KIND,
            codec_type: TypeId::of::<C>(),
            codec_type_name: type_name::<C>(),
            value_type: TypeId::of::<C::Value>(),
            value_type_name: type_name::<C::Value>(),
            construct: construct::<C>,
            text_view: text_view::<C>,
        }
    }
}

fn construct<C: Codec>(param: Option<&str>) -> Result<ErasedCodec, CodecInitError> {
    let codec: SharedCodec<C::Value> = Arc::new(C::from_param(param)?);
    Ok(Arc::new(codec))
}

fn text_view<C: Codec>(erased: &ErasedCodec) -> Option<Arc<dyn TextCodec>> {
    erased
        .downcast_ref::<SharedCodec<C::Value>>()
        .map(|codec| Arc::new(TextView(Arc::clone(codec))) as Arc<dyn TextCodec>)
}

/// Deduplicating store of codec instances.
///
/// Each kind name belongs to exactly one codec type; registering a second
/// type under a taken name fails with [`CodecError::KindConflict`].
/// Instances are created on first request for a `(kind, parameter)` pair and
/// handed out as shared `Arc`s afterwards.
pub struct CodecRegistry {
    kinds: RwLock<HashMap<&'static str, CodecKind>>,
    instances: Mutex<HashMap<CodecRef, ErasedCodec>>,
}

impl CodecRegistry {
    /// Registry preloaded with the built-in codec kinds.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        let kinds = registry
            .kinds
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for kind in [
            CodecKind::of::<super::DateCodec>(),
            CodecKind::of::<super::DateTimeCodec>(),
            CodecKind::of::<super::PatternCodec>(),
            CodecKind::of::<super::FlagCodec>(),
        ] {
            kinds.insert(kind.name, kind);
        }
        registry
    }

    pub fn empty() -> Self {
        CodecRegistry {
            kinds: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Makes `C` resolvable by its [`Codec::KIND`] name. Registering the same
    /// type again is a no-op.
    pub fn register_kind<C: Codec>(&self) -> Result<(), CodecError> {
        let mut kinds = self.kinds.write().unwrap_or_else(PoisonError::into_inner);
        match kinds.get(C::KIND) {
            Some(existing) if existing.codec_type != TypeId::of::<C>() => {
                Err(CodecError::KindConflict {
                    kind: C::KIND.to_string(),
                    registered: existing.codec_type_name,
                    requested: type_name::<C>(),
                })
            }
            Some(_) => Ok(()),
            None => {
                debug!("Registered codec kind '{}' ({})", C::KIND, type_name::<C>());
                kinds.insert(C::KIND, CodecKind::of::<C>());
                Ok(())
            }
        }
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(kind)
    }

    /// Typed acquisition; registers the kind on first use and fails when the
    /// kind name already belongs to another codec type.
    pub fn shared<C: Codec>(&self, param: &str) -> Result<SharedCodec<C::Value>, CodecError> {
        self.register_kind::<C>()?;
        self.resolve::<C::Value>(C::KIND, param)
    }

    /// Acquisition by kind name, checking that the codec produces `T`.
    pub fn resolve<T: 'static>(&self, kind: &str, param: &str) -> Result<SharedCodec<T>, CodecError> {
        let (erased, _) = self.instance(kind, param, |entry| {
            if entry.value_type == TypeId::of::<T>() {
                Ok(())
            } else {
                Err(CodecError::TypeMismatch {
                    kind: kind.to_string(),
                    expected: type_name::<T>(),
                    found: entry.value_type_name,
                })
            }
        })?;
        erased
            .downcast_ref::<SharedCodec<T>>()
            .map(Arc::clone)
            .ok_or_else(|| CodecError::TypeMismatch {
                kind: kind.to_string(),
                expected: type_name::<T>(),
                found: "an unrelated type",
            })
    }

    /// Acquisition by kind name for fields held as text: the codec decodes
    /// and re-encodes each cell, whatever its value type.
    pub fn resolve_text(&self, kind: &str, param: &str) -> Result<Arc<dyn TextCodec>, CodecError> {
        let (erased, view) = self.instance(kind, param, |_| Ok(()))?;
        view(&erased).ok_or_else(|| CodecError::TypeMismatch {
            kind: kind.to_string(),
            expected: "a text view",
            found: "an unrelated type",
        })
    }

    fn instance<F>(
        &self,
        kind: &str,
        param: &str,
        check: F,
    ) -> Result<(ErasedCodec, fn(&ErasedCodec) -> Option<Arc<dyn TextCodec>>), CodecError>
    where
        F: FnOnce(&CodecKind) -> Result<(), CodecError>,
    {
        let (constructor, view) = {
            let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
            let entry = kinds.get(kind).ok_or_else(|| CodecError::UnknownKind {
                kind: kind.to_string(),
            })?;
            check(entry)?;
            (entry.construct, entry.text_view)
        };

        let key = CodecRef::new(kind, param);
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = instances.get(&key) {
            return Ok((Arc::clone(existing), view));
        }
        let created = constructor(key.param()).map_err(|source| CodecError::Constructor {
            kind: kind.to_string(),
            param: param.to_string(),
            source,
        })?;
        debug!("Created codec '{kind}' with parameter '{param}'");
        instances.insert(key, Arc::clone(&created));
        Ok((created, view))
    }

    /// Number of distinct codec instances created so far.
    pub fn instance_count(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = self.kinds.read().unwrap_or_else(PoisonError::into_inner);
        let mut names = kinds.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("CodecRegistry")
            .field("kinds", &names)
            .field("instances", &self.instance_count())
            .finish()
    }
}
