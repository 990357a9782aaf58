//! Lookup from record type to its compiled schema and mappers.
//!
//! [`MapperRegistry`] is an ordinary value: create one, share it by reference
//! or `Arc`, and every schema is compiled at most once per registry. Dynamic
//! mappers are memoized per distinct header.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use log::debug;

use crate::{
    codec::CodecRegistry,
    error::SchemaError,
    mapper::Mapper,
    resolver::HeaderResolver,
    schema::Schema,
    sheet::Row,
};

/// Record types that know how to describe themselves.
pub trait MappedRecord: Sized + 'static {
    fn schema(codecs: &CodecRegistry) -> Result<Schema<Self>, SchemaError>;
}

type Erased = Arc<dyn Any + Send + Sync>;
type MapperKey = (TypeId, Option<Vec<Option<String>>>);

/// Schemas and mappers keyed by record type.
///
/// The mapper cache has no size bound: each distinct header seen through
/// [`mapper_for_header`](Self::mapper_for_header) or
/// [`mapper_for_row`](Self::mapper_for_row) adds one entry that lives as long
/// as the registry. Callers fed headers from untrusted or highly varied input
/// should resolve with [`Mapper::for_header`] directly, or call
/// [`clear_mappers`](Self::clear_mappers) periodically.
pub struct MapperRegistry {
    codecs: Arc<CodecRegistry>,
    schemas: RwLock<HashMap<TypeId, Erased>>,
    mappers: RwLock<HashMap<MapperKey, Erased>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::with_codecs(Arc::new(CodecRegistry::new()))
    }

    pub fn with_codecs(codecs: Arc<CodecRegistry>) -> Self {
        MapperRegistry {
            codecs,
            schemas: RwLock::new(HashMap::new()),
            mappers: RwLock::new(HashMap::new()),
        }
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Installs a schema for `R`, replacing any compiled earlier. Mappers
    /// cached for `R` are dropped.
    pub fn register<R: 'static>(&self, schema: Schema<R>) -> Arc<Schema<R>> {
        let schema = Arc::new(schema);
        let erased: Erased = Arc::clone(&schema) as Erased;
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<R>(), erased);
        self.mappers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(type_id, _), _| *type_id != TypeId::of::<R>());
        debug!("Registered schema for {}", type_name::<R>());
        schema
    }

    /// Schema for `R` if one was registered or compiled already.
    pub fn lookup<R: 'static>(&self) -> Option<Arc<Schema<R>>> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        schemas
            .get(&TypeId::of::<R>())
            .and_then(|erased| Arc::clone(erased).downcast::<Schema<R>>().ok())
    }

    /// Schema for `R`, compiled on first request.
    pub fn schema<R: MappedRecord>(&self) -> Result<Arc<Schema<R>>, SchemaError> {
        if let Some(existing) = self.lookup::<R>() {
            return Ok(existing);
        }
        let compiled = Arc::new(R::schema(&self.codecs)?);
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        let entry = schemas.entry(TypeId::of::<R>()).or_insert_with(|| {
            debug!("Compiled schema for {}", type_name::<R>());
            Arc::clone(&compiled) as Erased
        });
        Ok(Arc::clone(entry)
            .downcast::<Schema<R>>()
            .unwrap_or(compiled))
    }

    /// Mapper for the static column layout of `R`.
    pub fn mapper<R: MappedRecord>(&self) -> Result<Arc<Mapper<R>>, SchemaError> {
        let schema = self.schema::<R>()?;
        Ok(self.cached_mapper(schema, HeaderResolver::Static))
    }

    pub fn mapper_for_header<R, I, S>(&self, labels: I) -> Result<Arc<Mapper<R>>, SchemaError>
    where
        R: MappedRecord,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let schema = self.schema::<R>()?;
        Ok(self.cached_mapper(schema, HeaderResolver::from_labels(labels)))
    }

    pub fn mapper_for_row<R, W>(&self, header: &W) -> Result<Arc<Mapper<R>>, SchemaError>
    where
        R: MappedRecord,
        W: Row + ?Sized,
    {
        let schema = self.schema::<R>()?;
        Ok(self.cached_mapper(schema, HeaderResolver::from_row(header)))
    }

    /// Number of mappers currently memoized across all record types.
    pub fn cached_mappers(&self) -> usize {
        self.mappers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops every memoized mapper. Compiled schemas are kept.
    pub fn clear_mappers(&self) {
        let mut mappers = self.mappers.write().unwrap_or_else(PoisonError::into_inner);
        debug!("Dropping {} cached mapper(s)", mappers.len());
        mappers.clear();
    }

    fn cached_mapper<R: 'static>(
        &self,
        schema: Arc<Schema<R>>,
        resolver: HeaderResolver,
    ) -> Arc<Mapper<R>> {
        let signature = match &resolver {
            HeaderResolver::Static => None,
            HeaderResolver::Dynamic(header) => Some(header.clone()),
        };
        let key = (TypeId::of::<R>(), signature);
        {
            let mappers = self.mappers.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = mappers.get(&key)
                && let Ok(typed) = Arc::clone(existing).downcast::<Mapper<R>>()
            {
                return typed;
            }
        }

        let built = Arc::new(Mapper::new(schema, &resolver));
        let mut mappers = self.mappers.write().unwrap_or_else(PoisonError::into_inner);
        let entry = mappers
            .entry(key)
            .or_insert_with(|| Arc::clone(&built) as Erased);
        Arc::clone(entry).downcast::<Mapper<R>>().unwrap_or(built)
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("codecs", &self.codecs)
            .field(
                "schemas",
                &self
                    .schemas
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len(),
            )
            .field("mappers", &self.cached_mappers())
            .finish()
    }
}
