//! Schema-driven mapping between spreadsheet rows and typed records.
//!
//! A [`Schema`] describes how the fields of a record type bind to labelled
//! columns. A [`Mapper`] resolves those labels against a header once and then
//! reads data rows into records, or writes records back into rows, isolating
//! failures to the cell that caused them.
//!
//! ```
//! use sheet_mapper::{CodecRegistry, Mapper, Schema};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Person {
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! let codecs = CodecRegistry::new();
//! let schema = Schema::<Person>::builder("Person", &codecs)
//!     .case_sensitive(false)
//!     .field("name", "Name", |p| &p.name, |p| &mut p.name)
//!     .field("age", "Age", |p| &p.age, |p| &mut p.age)
//!     .build()?;
//! let mapper = Mapper::for_header(Arc::new(schema), ["AGE", "name"]);
//! let person = mapper.read(&vec!["41".to_string(), "Ada".to_string()]);
//! assert_eq!(person.name, "Ada");
//! assert_eq!(person.age, Some(41));
//! # Ok::<(), sheet_mapper::SchemaError>(())
//! ```

pub mod cli;
pub mod codec;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod manifest;
pub mod mapper;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod sheet;

mod check;
mod export;
mod import;
mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

pub use crate::{
    codec::{Codec, CodecRef, CodecRegistry},
    data::{FieldValue, SemanticType, Value},
    error::{CellFault, CodecError, CodecInitError, SchemaError},
    manifest::SchemaManifest,
    mapper::Mapper,
    record::DynamicRecord,
    registry::{MappedRecord, MapperRegistry},
    resolver::{Designator, HeaderResolver, ResolutionReport},
    schema::{FieldDescriptor, Schema, SchemaBuilder},
    sheet::{Cell, CellValue, Row, SheetRow},
};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Parsed command line: {:?}", cli.command);
    match cli.command {
        Commands::Check(args) => check::execute(&args),
        Commands::Import(args) => import::execute(&args),
        Commands::Export(args) => export::execute(&args),
    }
}
