//! Error taxonomy for the mapping engine.
//!
//! [`SchemaError`] is raised while a schema is being compiled and is the only
//! error that ever reaches a caller. [`CellFault`] describes a single cell that
//! could not be coerced; the row mapper hands it to the caller's fault handler
//! and keeps going.

use thiserror::Error;

use crate::data::SemanticType;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema '{record}' field '{field}' has an empty label")]
    EmptyLabel { record: String, field: String },

    #[error(
        "Schema '{record}' declares label '{label}' more than once ({mode} comparison, first declared by field '{first}')"
    )]
    DuplicateLabel {
        record: String,
        label: String,
        first: String,
        mode: &'static str,
    },

    #[error("Schema '{record}' column order references unknown label '{label}'")]
    UnknownColumn { record: String, label: String },

    #[error("Schema '{record}' column order lists '{label}' more than once")]
    DuplicateColumn { record: String, label: String },

    #[error("Schema '{record}' field '{field}' has type {semantic_type} but no coercion or codec for it")]
    MissingCoercion {
        record: String,
        field: String,
        semantic_type: SemanticType,
    },

    #[error("Schema '{record}' field '{field}': {source}")]
    Codec {
        record: String,
        field: String,
        #[source]
        source: CodecError,
    },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("codec kind '{kind}' is not registered")]
    UnknownKind { kind: String },

    #[error("codec kind '{kind}' already belongs to {registered}, not {requested}")]
    KindConflict {
        kind: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("codec '{kind}' produces {found} but the field holds {expected}")]
    TypeMismatch {
        kind: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("codec '{kind}' cannot be constructed with parameter '{param}': {source}")]
    Constructor {
        kind: String,
        param: String,
        #[source]
        source: CodecInitError,
    },
}

/// Reasons a codec refuses a configuration parameter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecInitError {
    #[error("no parameter is accepted")]
    ParameterNotAccepted,
    #[error("a parameter is required")]
    ParameterRequired,
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellFault {
    #[error("Failed to parse '{text}' as {expected}")]
    Malformed {
        text: String,
        expected: SemanticType,
    },

    #[error("Codec '{kind}' failed: {message}")]
    Codec { kind: String, message: String },
}

impl CellFault {
    pub fn malformed(text: &str, expected: SemanticType) -> Self {
        CellFault::Malformed {
            text: text.to_string(),
            expected,
        }
    }

    pub fn codec(kind: &str, err: anyhow::Error) -> Self {
        CellFault::Codec {
            kind: kind.to_string(),
            message: format!("{err:#}"),
        }
    }
}
