//! Records whose shape is only known at run time.
//!
//! A [`DynamicRecord`] stores one optional [`Value`] per schema field, in
//! declaration order. Schemas for it are assembled with
//! [`SchemaBuilder::slot`] and [`SchemaBuilder::codec_slot`], usually from a
//! YAML manifest.
//!
//! A `custom` slot has no Rust type of its own: it holds the text its codec
//! renders for the cell, so a date column keeps the date as the codec writes
//! it.

use std::sync::Arc;

use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    codec::{CodecRef, SharedCodec, TextCodec},
    data::{Primitive, SemanticType, Value, format_value, parse_cell},
    error::{CellFault, CodecError, SchemaError},
    schema::{FieldBinding, Schema, SchemaBuilder},
    sheet::CellValue,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: Vec<Option<Value>>,
}

impl DynamicRecord {
    pub fn with_len(len: usize) -> Self {
        DynamicRecord {
            values: vec![None; len],
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot).and_then(Option::as_ref)
    }

    /// Stores `value` in `slot`, growing the record when needed.
    pub fn set(&mut self, slot: usize, value: Option<Value>) {
        if slot >= self.values.len() {
            self.values.resize(slot + 1, None);
        }
        self.values[slot] = value;
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn get_by_label(&self, schema: &Schema<DynamicRecord>, label: &str) -> Option<&Value> {
        schema.field_index(label).and_then(|slot| self.get(slot))
    }

    /// Label-keyed JSON object in declaration order; absent values are `null`.
    pub fn to_json(&self, schema: &Schema<DynamicRecord>) -> JsonValue {
        let mut object = Map::with_capacity(schema.len());
        for (slot, field) in schema.fields().iter().enumerate() {
            let value = self.get(slot).map_or(JsonValue::Null, json_value);
            object.insert(field.label().to_string(), value);
        }
        JsonValue::Object(object)
    }
}

fn json_value(value: &Value) -> JsonValue {
    match value {
        Value::Byte(v) => JsonValue::from(*v),
        Value::Short(v) => JsonValue::from(*v),
        Value::Int(v) => JsonValue::from(*v),
        Value::Long(v) => JsonValue::from(*v),
        Value::Float(_) | Value::Double(_) => match format_value(value) {
            CellValue::Float(f) => Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number),
            _ => JsonValue::Null,
        },
        Value::Char(c) => JsonValue::String(c.to_string()),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::String(s) => JsonValue::String(s.clone()),
    }
}

struct SlotBinding {
    slot: usize,
    semantic_type: SemanticType,
    nullable: bool,
}

impl FieldBinding<DynamicRecord> for SlotBinding {
    fn read(&self, record: &mut DynamicRecord, text: &str) -> Result<(), CellFault> {
        let value = parse_cell(text, self.semantic_type, self.nullable)?;
        record.set(self.slot, value);
        Ok(())
    }

    fn write(&self, record: &DynamicRecord) -> Result<Option<CellValue>, CellFault> {
        Ok(record.get(self.slot).map(format_value))
    }
}

struct CodecSlotBinding<T> {
    slot: usize,
    nullable: bool,
    codec: SharedCodec<T>,
}

impl<T: Primitive> FieldBinding<DynamicRecord> for CodecSlotBinding<T> {
    fn read(&self, record: &mut DynamicRecord, text: &str) -> Result<(), CellFault> {
        if text.is_empty() && self.nullable {
            record.set(self.slot, None);
            return Ok(());
        }
        let decoded = self
            .codec
            .decode_text(text)
            .map_err(|err| CellFault::codec(self.codec.kind(), err))?;
        record.set(self.slot, Some(decoded.to_value()));
        Ok(())
    }

    fn write(&self, record: &DynamicRecord) -> Result<Option<CellValue>, CellFault> {
        let Some(value) = record.get(self.slot) else {
            return Ok(None);
        };
        let typed = T::from_value(value.clone())
            .ok_or_else(|| CellFault::malformed(&value.as_display(), T::SEMANTIC_TYPE))?;
        self.codec
            .encode_value(&typed)
            .map_err(|err| CellFault::codec(self.codec.kind(), err))
    }
}

/// Slot holding the codec's canonical text for a cell.
struct TextSlotBinding {
    slot: usize,
    nullable: bool,
    codec: Arc<dyn TextCodec>,
}

impl TextSlotBinding {
    fn canonical(&self, text: &str) -> Result<Option<Value>, CellFault> {
        let cell = self
            .codec
            .canonicalize(text)
            .map_err(|err| CellFault::codec(self.codec.kind(), err))?;
        Ok(cell.map(|cell| Value::String(cell.as_text().into_owned())))
    }
}

impl FieldBinding<DynamicRecord> for TextSlotBinding {
    fn read(&self, record: &mut DynamicRecord, text: &str) -> Result<(), CellFault> {
        let value = if text.is_empty() && self.nullable {
            None
        } else {
            self.canonical(text)?
        };
        record.set(self.slot, value);
        Ok(())
    }

    fn write(&self, record: &DynamicRecord) -> Result<Option<CellValue>, CellFault> {
        let Some(value) = record.get(self.slot) else {
            return Ok(None);
        };
        Ok(self
            .canonical(&value.as_display())?
            .map(|value| CellValue::String(value.as_display())))
    }
}

fn codec_binding<T: Primitive>(
    builder: &SchemaBuilder<'_, DynamicRecord>,
    slot: usize,
    nullable: bool,
    codec: &CodecRef,
) -> Result<Box<dyn FieldBinding<DynamicRecord>>, CodecError> {
    let codec = builder.codecs().resolve::<T>(&codec.kind, &codec.param)?;
    Ok(Box::new(CodecSlotBinding {
        slot,
        nullable,
        codec,
    }))
}

impl SchemaBuilder<'_, DynamicRecord> {
    /// Declares the next slot with built-in coercion for `semantic_type`.
    pub fn slot(self, name: &str, label: &str, semantic_type: SemanticType, nullable: bool) -> Self {
        if !semantic_type.is_builtin() {
            let err = SchemaError::MissingCoercion {
                record: self.record_type().to_string(),
                field: name.to_string(),
                semantic_type,
            };
            return self.reject(err);
        }
        let binding = SlotBinding {
            slot: self.field_count(),
            semantic_type,
            nullable,
        };
        self.bind(name, label, semantic_type, nullable, None, Box::new(binding))
    }

    /// Declares the next slot through a codec whose value type must be the
    /// Rust type of `semantic_type` (`String` for `string`, `bool` for
    /// `bool`, and so on). A `custom` slot accepts any codec and stores the
    /// text the codec renders for each cell.
    pub fn codec_slot(
        self,
        name: &str,
        label: &str,
        semantic_type: SemanticType,
        nullable: bool,
        codec: CodecRef,
    ) -> Self {
        let slot = self.field_count();
        let binding = match semantic_type {
            SemanticType::Byte => codec_binding::<i8>(&self, slot, nullable, &codec),
            SemanticType::Short => codec_binding::<i16>(&self, slot, nullable, &codec),
            SemanticType::Int => codec_binding::<i32>(&self, slot, nullable, &codec),
            SemanticType::Long => codec_binding::<i64>(&self, slot, nullable, &codec),
            SemanticType::Float => codec_binding::<f32>(&self, slot, nullable, &codec),
            SemanticType::Double => codec_binding::<f64>(&self, slot, nullable, &codec),
            SemanticType::Char => codec_binding::<char>(&self, slot, nullable, &codec),
            SemanticType::Bool => codec_binding::<bool>(&self, slot, nullable, &codec),
            SemanticType::String => codec_binding::<String>(&self, slot, nullable, &codec),
            SemanticType::Custom => self
                .codecs()
                .resolve_text(&codec.kind, &codec.param)
                .map(|codec| -> Box<dyn FieldBinding<DynamicRecord>> {
                    Box::new(TextSlotBinding {
                        slot,
                        nullable,
                        codec,
                    })
                }),
        };
        match binding {
            Ok(binding) => self.bind(name, label, semantic_type, nullable, Some(codec), binding),
            Err(source) => {
                let err = SchemaError::Codec {
                    record: self.record_type().to_string(),
                    field: name.to_string(),
                    source,
                };
                self.reject(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::CodecRegistry, mapper::Mapper};
    use std::sync::Arc;

    #[test]
    fn slots_follow_declaration_order() {
        let codecs = CodecRegistry::new();
        let schema = Schema::<DynamicRecord>::builder("Reading", &codecs)
            .slot("station", "Station", SemanticType::String, false)
            .slot("temp", "Temp", SemanticType::Double, true)
            .codec_slot(
                "ok",
                "Ok",
                SemanticType::Bool,
                false,
                CodecRef::new("flag", "Y|N"),
            )
            .build()
            .expect("schema");
        let mapper = Mapper::for_header(Arc::new(schema), ["Ok", "Station", "Temp"]);
        let record = mapper.read(&vec!["Y".to_string(), "North".to_string(), String::new()]);
        assert_eq!(
            record.values(),
            &[Some(Value::String("North".to_string())), None, Some(Value::Bool(true))]
        );
        assert_eq!(
            record.to_json(mapper.schema()),
            serde_json::json!({"Station": "North", "Temp": null, "Ok": true})
        );
    }

    #[test]
    fn custom_slots_are_rejected() {
        let codecs = CodecRegistry::new();
        let err = Schema::<DynamicRecord>::builder("Bad", &codecs)
            .slot("when", "When", SemanticType::Custom, false)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingCoercion { .. }));
    }

    #[test]
    fn custom_slots_keep_the_codec_rendering() {
        let codecs = CodecRegistry::new();
        let schema = Schema::<DynamicRecord>::builder("Battle", &codecs)
            .codec_slot(
                "fought",
                "Fought",
                SemanticType::Custom,
                true,
                CodecRef::new("date", "%d/%m/%Y"),
            )
            .build()
            .expect("schema");
        let mapper = Mapper::fixed(Arc::new(schema));

        let record = mapper.read(&vec!["18/6/1815".to_string()]);
        assert_eq!(record.get(0), Some(&Value::String("18/06/1815".to_string())));

        let mut faults = Vec::new();
        let bad = mapper.read_with(&vec!["1815-06-18".to_string()], |_, _, fault| {
            faults.push(fault.clone())
        });
        assert_eq!(bad.get(0), None);
        assert!(matches!(faults.as_slice(), [CellFault::Codec { kind, .. }] if kind == "date"));

        assert_eq!(mapper.read(&vec![String::new()]).get(0), None);

        let mut row = vec![String::new()];
        mapper.write(&mut row, &record);
        assert_eq!(row, vec!["18/06/1815".to_string()]);

        let mut wrong = DynamicRecord::with_len(1);
        wrong.set(0, Some(Value::String("June 18th".to_string())));
        let mut faults = Vec::new();
        mapper.write_with(&mut row, &wrong, |_, _, fault| faults.push(fault.clone()));
        assert_eq!(faults.len(), 1);
    }

    #[test]
    fn codec_value_type_must_match_slot_type() {
        let codecs = CodecRegistry::new();
        let err = Schema::<DynamicRecord>::builder("Bad", &codecs)
            .codec_slot(
                "when",
                "When",
                SemanticType::String,
                false,
                CodecRef::new("date", ""),
            )
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Codec {
                source: CodecError::TypeMismatch { .. },
                ..
            }
        ));
    }
}
