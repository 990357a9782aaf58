use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{
    cli::CheckArgs,
    codec::CodecRegistry,
    io_utils::{self, CsvSource},
    manifest::SchemaManifest,
    record::DynamicRecord,
    resolver::{HeaderResolver, ResolutionReport},
    schema::Schema,
    table,
};

pub fn execute(args: &CheckArgs) -> Result<()> {
    let manifest = SchemaManifest::load(&args.schema)?;
    let codecs = CodecRegistry::new();
    let schema = manifest
        .compile(&codecs)
        .with_context(|| format!("Compiling schema manifest {:?}", args.schema))?;
    info!(
        "Schema '{}' compiled with {} field(s)",
        schema.record_type(),
        schema.len()
    );

    let resolver = match &args.input {
        Some(input) => {
            let encoding = io_utils::resolve_encoding(args.csv.input_encoding.as_deref())?;
            let mut source = CsvSource::open(input, args.csv.delimiter, encoding)?;
            HeaderResolver::from_labels(&source.header()?)
        }
        None => HeaderResolver::Static,
    };
    let report = resolver.report(&schema);

    let rows = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let column = report
                .designators
                .iter()
                .find(|designator| designator.field == idx)
                .map_or_else(|| "-".to_string(), |designator| designator.column.to_string());
            vec![
                field.name().to_string(),
                field.label().to_string(),
                field.describe_type(),
                column,
            ]
        })
        .collect_vec();
    table::print_table(&["field", "label", "type", "column"], &rows);
    print_leftovers(&schema, &report);
    Ok(())
}

fn print_leftovers(schema: &Schema<DynamicRecord>, report: &ResolutionReport) {
    if !report.unmatched_columns.is_empty() {
        println!(
            "Unknown columns: {}",
            report
                .unmatched_columns
                .iter()
                .map(|(column, label)| format!("{label} ({column})"))
                .join(", ")
        );
    }
    if !report.shadowed_columns.is_empty() {
        println!(
            "Shadowed by a later column: {}",
            report
                .shadowed_columns
                .iter()
                .map(|(column, label)| format!("{label} ({column})"))
                .join(", ")
        );
    }
    if !report.unbound_fields.is_empty() {
        println!(
            "Unbound fields: {}",
            report
                .unbound_fields
                .iter()
                .filter_map(|&idx| schema.field(idx))
                .map(|field| field.name())
                .join(", ")
        );
    }
}
