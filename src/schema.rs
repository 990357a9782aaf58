//! Column schema: the declarative description of a record type.
//!
//! A [`Schema`] owns one [`FieldDescriptor`] per mapped field. Each descriptor
//! pairs a header label with a [`FieldBinding`], the type-erased accessor that
//! moves a value between cell text and the record. Bindings come in two
//! flavours: built-in coercion for [`FieldValue`] types, and codec-backed
//! bindings for everything else. A field never has both.
//!
//! ## Validation
//!
//! [`SchemaBuilder::build`] checks everything up front so a schema that
//! compiles can be used without further failure modes:
//!
//! - labels are non-empty
//! - labels are unique under the schema's case mode
//! - codec references resolve, construct, and produce the field's value type
//! - a fixed column order only names declared labels, each once

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    fmt,
    marker::PhantomData,
};

use log::debug;

use crate::{
    codec::{Codec, CodecRef, CodecRegistry, SharedCodec},
    data::{FieldValue, SemanticType},
    error::{CellFault, CodecError, SchemaError},
    sheet::CellValue,
};

/// Lower-cases `label` for case-insensitive schemas.
///
/// Uses Unicode default lower-casing (`str::to_lowercase`), independent of
/// locale. No trimming or full case folding is applied, so `"Straße"` and
/// `"STRASSE"` stay distinct.
pub fn normalize_label(label: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        return Cow::Borrowed(label);
    }
    let lowered = label.to_lowercase();
    if lowered == label {
        Cow::Borrowed(label)
    } else {
        Cow::Owned(lowered)
    }
}

/// Moves one field's value between cell text and a record.
pub trait FieldBinding<R>: Send + Sync {
    fn read(&self, record: &mut R, text: &str) -> Result<(), CellFault>;

    /// `Ok(None)` means the value is absent and no cell should be written.
    fn write(&self, record: &R) -> Result<Option<CellValue>, CellFault>;
}

struct BuiltinBinding<T, G, S> {
    get: G,
    set: S,
    _value: PhantomData<fn() -> T>,
}

impl<R, T, G, S> FieldBinding<R> for BuiltinBinding<T, G, S>
where
    T: FieldValue,
    G: Fn(&R) -> &T + Send + Sync,
    S: Fn(&mut R) -> &mut T + Send + Sync,
{
    fn read(&self, record: &mut R, text: &str) -> Result<(), CellFault> {
        *(self.set)(record) = T::from_text(text)?;
        Ok(())
    }

    fn write(&self, record: &R) -> Result<Option<CellValue>, CellFault> {
        Ok((self.get)(record).to_cell())
    }
}

struct CodecBinding<T, G, S> {
    codec: SharedCodec<T>,
    get: G,
    set: S,
}

impl<R, T, G, S> FieldBinding<R> for CodecBinding<T, G, S>
where
    T: 'static,
    G: Fn(&R) -> &T + Send + Sync,
    S: Fn(&mut R) -> &mut T + Send + Sync,
{
    fn read(&self, record: &mut R, text: &str) -> Result<(), CellFault> {
        let value = self
            .codec
            .decode_text(text)
            .map_err(|err| CellFault::codec(self.codec.kind(), err))?;
        *(self.set)(record) = value;
        Ok(())
    }

    fn write(&self, record: &R) -> Result<Option<CellValue>, CellFault> {
        self.codec
            .encode_value((self.get)(record))
            .map_err(|err| CellFault::codec(self.codec.kind(), err))
    }
}

struct OptionalCodecBinding<T, G, S> {
    codec: SharedCodec<T>,
    get: G,
    set: S,
}

impl<R, T, G, S> FieldBinding<R> for OptionalCodecBinding<T, G, S>
where
    T: 'static,
    G: Fn(&R) -> &Option<T> + Send + Sync,
    S: Fn(&mut R) -> &mut Option<T> + Send + Sync,
{
    fn read(&self, record: &mut R, text: &str) -> Result<(), CellFault> {
        let value = if text.is_empty() {
            None
        } else {
            let decoded = self
                .codec
                .decode_text(text)
                .map_err(|err| CellFault::codec(self.codec.kind(), err))?;
            Some(decoded)
        };
        *(self.set)(record) = value;
        Ok(())
    }

    fn write(&self, record: &R) -> Result<Option<CellValue>, CellFault> {
        match (self.get)(record) {
            Some(value) => self
                .codec
                .encode_value(value)
                .map_err(|err| CellFault::codec(self.codec.kind(), err)),
            None => Ok(None),
        }
    }
}

pub struct FieldDescriptor<R> {
    name: String,
    label: String,
    semantic_type: SemanticType,
    nullable: bool,
    codec: Option<CodecRef>,
    declared_index: usize,
    binding: Box<dyn FieldBinding<R>>,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header text this field binds to.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn codec(&self) -> Option<&CodecRef> {
        self.codec.as_ref()
    }

    pub fn declared_index(&self) -> usize {
        self.declared_index
    }

    pub fn binding(&self) -> &dyn FieldBinding<R> {
        self.binding.as_ref()
    }

    /// Type column shown in listings, e.g. `int?` or `custom(date)`.
    pub fn describe_type(&self) -> String {
        let base = match &self.codec {
            Some(codec) => format!("{}({})", self.semantic_type, codec.kind),
            None => self.semantic_type.to_string(),
        };
        if self.nullable { format!("{base}?") } else { base }
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("semantic_type", &self.semantic_type)
            .field("nullable", &self.nullable)
            .field("codec", &self.codec)
            .field("declared_index", &self.declared_index)
            .finish()
    }
}

type Factory<R> = Box<dyn Fn() -> R + Send + Sync>;

pub struct Schema<R> {
    record_type: String,
    case_sensitive: bool,
    fields: Vec<FieldDescriptor<R>>,
    lookup: HashMap<String, usize>,
    column_order: Vec<usize>,
    fixed_columns: bool,
    factory: Factory<R>,
}

impl<R> Schema<R> {
    /// Starts a schema whose records are created with `R::default()`.
    pub fn builder<'c>(record_type: &str, codecs: &'c CodecRegistry) -> SchemaBuilder<'c, R>
    where
        R: Default + 'static,
    {
        SchemaBuilder::new(record_type, codecs, Box::new(R::default))
    }

    pub fn builder_with_factory<'c, F>(
        record_type: &str,
        codecs: &'c CodecRegistry,
        factory: F,
    ) -> SchemaBuilder<'c, R>
    where
        R: 'static,
        F: Fn() -> R + Send + Sync + 'static,
    {
        SchemaBuilder::new(record_type, codecs, Box::new(factory))
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor<R>> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn normalize<'a>(&self, label: &'a str) -> Cow<'a, str> {
        normalize_label(label, self.case_sensitive)
    }

    /// Field index bound to `label` under the schema's case mode.
    pub fn field_index(&self, label: &str) -> Option<usize> {
        self.lookup.get(self.normalize(label).as_ref()).copied()
    }

    pub fn field_by_label(&self, label: &str) -> Option<&FieldDescriptor<R>> {
        self.field_index(label).and_then(|idx| self.fields.get(idx))
    }

    /// Field indexes in static column order: the fixed order when one was
    /// declared, otherwise declaration order.
    pub fn column_order(&self) -> &[usize] {
        &self.column_order
    }

    pub fn has_fixed_columns(&self) -> bool {
        self.fixed_columns
    }

    pub fn column_labels(&self) -> Vec<&str> {
        self.column_order
            .iter()
            .map(|&idx| self.fields[idx].label())
            .collect()
    }

    pub fn new_record(&self) -> R {
        (self.factory)()
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("record_type", &self.record_type)
            .field("case_sensitive", &self.case_sensitive)
            .field("fields", &self.fields)
            .field("column_order", &self.column_order)
            .finish()
    }
}

pub struct SchemaBuilder<'c, R> {
    record_type: String,
    case_sensitive: bool,
    codecs: &'c CodecRegistry,
    fields: Vec<FieldDescriptor<R>>,
    columns: Option<Vec<String>>,
    factory: Factory<R>,
    error: Option<SchemaError>,
}

impl<'c, R: 'static> SchemaBuilder<'c, R> {
    fn new(record_type: &str, codecs: &'c CodecRegistry, factory: Factory<R>) -> Self {
        SchemaBuilder {
            record_type: record_type.to_string(),
            case_sensitive: true,
            codecs,
            fields: Vec::new(),
            columns: None,
            factory,
            error: None,
        }
    }

    pub fn codecs(&self) -> &'c CodecRegistry {
        self.codecs
    }

    /// Case mode for labels; schemas are case-sensitive unless told otherwise.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Fixes the column order used for static resolution.
    pub fn columns<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.factory = Box::new(factory);
        self
    }

    /// Binds a field with built-in coercion.
    pub fn field<T: FieldValue>(
        self,
        name: &str,
        label: &str,
        get: impl Fn(&R) -> &T + Send + Sync + 'static,
        set: impl Fn(&mut R) -> &mut T + Send + Sync + 'static,
    ) -> Self {
        let binding = BuiltinBinding {
            get,
            set,
            _value: PhantomData,
        };
        self.bind(
            name,
            label,
            T::SEMANTIC_TYPE,
            T::NULLABLE,
            None,
            Box::new(binding),
        )
    }

    /// Binds a field through codec `C`, configured by `param` (empty for the
    /// codec's default configuration).
    pub fn codec_field<C: Codec>(
        self,
        name: &str,
        label: &str,
        param: &str,
        get: impl Fn(&R) -> &C::Value + Send + Sync + 'static,
        set: impl Fn(&mut R) -> &mut C::Value + Send + Sync + 'static,
    ) -> Self {
        match self.codecs.shared::<C>(param) {
            Ok(codec) => self.bind(
                name,
                label,
                SemanticType::Custom,
                false,
                Some(CodecRef::new(C::KIND, param)),
                Box::new(CodecBinding { codec, get, set }),
            ),
            Err(source) => self.fail(name, source),
        }
    }

    /// Like [`codec_field`](Self::codec_field) for `Option` fields: empty
    /// cells read as `None` without reaching the codec, and `None` writes no
    /// cell.
    pub fn optional_codec_field<C: Codec>(
        self,
        name: &str,
        label: &str,
        param: &str,
        get: impl Fn(&R) -> &Option<C::Value> + Send + Sync + 'static,
        set: impl Fn(&mut R) -> &mut Option<C::Value> + Send + Sync + 'static,
    ) -> Self {
        match self.codecs.shared::<C>(param) {
            Ok(codec) => self.bind(
                name,
                label,
                SemanticType::Custom,
                true,
                Some(CodecRef::new(C::KIND, param)),
                Box::new(OptionalCodecBinding { codec, get, set }),
            ),
            Err(source) => self.fail(name, source),
        }
    }

    /// Binds a field to a codec looked up by kind name. The codec's value
    /// type is checked against `T` here, not at first use.
    pub fn named_codec_field<T: Send + Sync + 'static>(
        self,
        name: &str,
        label: &str,
        kind: &str,
        param: &str,
        get: impl Fn(&R) -> &T + Send + Sync + 'static,
        set: impl Fn(&mut R) -> &mut T + Send + Sync + 'static,
    ) -> Self {
        match self.codecs.resolve::<T>(kind, param) {
            Ok(codec) => self.bind(
                name,
                label,
                SemanticType::Custom,
                false,
                Some(CodecRef::new(kind, param)),
                Box::new(CodecBinding { codec, get, set }),
            ),
            Err(source) => self.fail(name, source),
        }
    }

    /// Adds a field with a caller-supplied binding. This is the entry point
    /// for schemas assembled at run time.
    pub fn bind(
        mut self,
        name: &str,
        label: &str,
        semantic_type: SemanticType,
        nullable: bool,
        codec: Option<CodecRef>,
        binding: Box<dyn FieldBinding<R>>,
    ) -> Self {
        let declared_index = self.fields.len();
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            label: label.to_string(),
            semantic_type,
            nullable,
            codec,
            declared_index,
            binding,
        });
        self
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Number of fields declared so far.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn fail(self, field: &str, source: CodecError) -> Self {
        let err = SchemaError::Codec {
            record: self.record_type.clone(),
            field: field.to_string(),
            source,
        };
        self.reject(err)
    }

    /// Records a declaration error; [`build`](Self::build) reports the first
    /// one.
    pub fn reject(mut self, err: SchemaError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    pub fn build(self) -> Result<Schema<R>, SchemaError> {
        let SchemaBuilder {
            record_type,
            case_sensitive,
            fields,
            columns,
            factory,
            error,
            ..
        } = self;
        if let Some(err) = error {
            return Err(err);
        }

        let mode = if case_sensitive {
            "case-sensitive"
        } else {
            "case-insensitive"
        };
        let mut lookup = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if field.label.trim().is_empty() {
                return Err(SchemaError::EmptyLabel {
                    record: record_type,
                    field: field.name.clone(),
                });
            }
            let key = normalize_label(&field.label, case_sensitive).into_owned();
            if let Some(&first) = lookup.get(&key) {
                let first: &FieldDescriptor<R> = &fields[first];
                return Err(SchemaError::DuplicateLabel {
                    record: record_type,
                    label: field.label.clone(),
                    first: first.name.clone(),
                    mode,
                });
            }
            lookup.insert(key, idx);
        }

        let (column_order, fixed_columns) = match columns {
            Some(labels) => {
                let mut order = Vec::with_capacity(labels.len());
                let mut seen = HashSet::with_capacity(labels.len());
                for label in labels {
                    let found = lookup
                        .get(normalize_label(&label, case_sensitive).as_ref())
                        .copied();
                    let Some(idx) = found else {
                        return Err(SchemaError::UnknownColumn {
                            record: record_type,
                            label,
                        });
                    };
                    if !seen.insert(idx) {
                        return Err(SchemaError::DuplicateColumn {
                            record: record_type,
                            label,
                        });
                    }
                    order.push(idx);
                }
                (order, true)
            }
            None => ((0..fields.len()).collect(), false),
        };

        debug!(
            "Compiled schema '{}' with {} field(s) ({}, {} static column(s))",
            record_type,
            fields.len(),
            mode,
            column_order.len()
        );
        Ok(Schema {
            record_type,
            case_sensitive,
            fields,
            lookup,
            column_order,
            fixed_columns,
            factory,
        })
    }
}
