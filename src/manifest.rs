//! YAML schema manifests.
//!
//! A manifest declares a record layout in a file instead of code and compiles
//! to a [`Schema<DynamicRecord>`]:
//!
//! ```yaml
//! record: Person
//! case_sensitive: false
//! fields:
//!   - label: Name
//!     type: string
//!   - label: Age
//!     type: int
//!     nullable: true
//!   - label: Active
//!     type: bool
//!     codec: flag
//!     param: "Y|N"
//! ```
//!
//! Field names default to the snake_case form of the label. A codec on a
//! built-in type must produce that type's Rust value; `type: custom` takes
//! any codec (for example `codec: date`) and keeps the text it renders.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use heck::ToSnakeCase;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    codec::{CodecRef, CodecRegistry},
    data::SemanticType,
    error::SchemaError,
    record::DynamicRecord,
    schema::Schema,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub record: String,
    #[serde(default = "SchemaManifest::default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl FieldSpec {
    pub fn new(label: &str, semantic_type: SemanticType) -> Self {
        FieldSpec {
            label: label.to_string(),
            semantic_type,
            name: None,
            nullable: false,
            codec: None,
            param: None,
        }
    }

    pub fn field_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.label.to_snake_case(),
        }
    }

    pub fn codec_ref(&self) -> Option<CodecRef> {
        self.codec
            .as_deref()
            .map(|kind| CodecRef::new(kind, self.param.as_deref().unwrap_or_default()))
    }
}

impl SchemaManifest {
    pub const fn default_case_sensitive() -> bool {
        true
    }

    pub fn new(record: &str) -> Self {
        SchemaManifest {
            record: record.to_string(),
            case_sensitive: Self::default_case_sensitive(),
            columns: None,
            fields: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening manifest file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing manifest YAML {path:?}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating manifest file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing manifest YAML")
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context("Parsing manifest YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing manifest to YAML string")
    }

    pub fn compile(&self, codecs: &CodecRegistry) -> Result<Schema<DynamicRecord>, SchemaError> {
        let mut builder =
            Schema::<DynamicRecord>::builder(&self.record, codecs).case_sensitive(self.case_sensitive);
        if let Some(columns) = &self.columns {
            builder = builder.columns(columns.iter().cloned());
        }
        for spec in &self.fields {
            let name = spec.field_name();
            builder = match spec.codec_ref() {
                Some(codec) => builder.codec_slot(
                    &name,
                    &spec.label,
                    spec.semantic_type,
                    spec.nullable,
                    codec,
                ),
                None => {
                    if spec.param.is_some() {
                        warn!(
                            "Manifest '{}' field '{}' sets a codec parameter without a codec; ignoring it",
                            self.record, name
                        );
                    }
                    builder.slot(&name, &spec.label, spec.semantic_type, spec.nullable)
                }
            };
        }
        builder.build()
    }
}
