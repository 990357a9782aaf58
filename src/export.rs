use std::{io::BufRead, sync::Arc};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{Map, Value as JsonValue};

use crate::{
    cli::ExportArgs,
    codec::CodecRegistry,
    data::{SemanticType, Value, parse_cell},
    error::CellFault,
    io_utils,
    manifest::SchemaManifest,
    mapper::Mapper,
    record::DynamicRecord,
};

pub fn execute(args: &ExportArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    let delimiter = io_utils::delimiter_for(args.output.as_deref(), args.delimiter);
    let manifest = SchemaManifest::load(&args.schema)?;
    let codecs = CodecRegistry::new();
    let schema = Arc::new(
        manifest
            .compile(&codecs)
            .with_context(|| format!("Compiling schema manifest {:?}", args.schema))?,
    );
    let mapper = Mapper::fixed(Arc::clone(&schema));
    let width = mapper.columns();

    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter, encoding)?;
    let mut header = vec![String::new(); width];
    mapper.write_header(&mut header);
    writer.write_record(&header).context("Writing header row")?;

    let input = io_utils::open_input(&args.input)?;
    let mut written = 0usize;
    let mut faults = 0usize;
    for (line_idx, line) in input.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = line.with_context(|| format!("Reading line {line_no} of {:?}", args.input))?;
        if line.trim().is_empty() {
            continue;
        }
        let object: Map<String, JsonValue> = serde_json::from_str(&line)
            .with_context(|| format!("Parsing JSON object on line {line_no}"))?;

        let mut record = DynamicRecord::with_len(schema.len());
        for (key, value) in &object {
            let Some(slot) = schema.field_index(key) else {
                debug!("Line {line_no}: key '{key}' matches no field");
                continue;
            };
            let Some(field) = schema.field(slot) else {
                continue;
            };
            let text = json_cell_text(value);
            match json_field_value(&text, field.semantic_type(), field.is_nullable()) {
                Ok(parsed) => record.set(slot, parsed),
                Err(fault) => {
                    faults += 1;
                    warn!("Line {line_no} field '{}' ({text:?}): {fault}", field.label());
                }
            }
        }

        let mut row = vec![String::new(); width];
        mapper.write_with(&mut row, &record, |label, _, fault| {
            faults += 1;
            warn!("Line {line_no} field '{label}': {fault}");
        });
        writer
            .write_record(&row)
            .with_context(|| format!("Writing row for line {line_no}"))?;
        written += 1;
    }
    writer.flush().context("Flushing CSV output")?;
    info!("Exported {written} record(s) with {faults} cell fault(s)");
    Ok(())
}

/// Typed value for a JSON field. `custom` fields carry their text as is and
/// are checked by their codec when the row is written.
fn json_field_value(
    text: &str,
    semantic_type: SemanticType,
    nullable: bool,
) -> Result<Option<Value>, CellFault> {
    match semantic_type {
        SemanticType::Custom if text.is_empty() && nullable => Ok(None),
        SemanticType::Custom => Ok(Some(Value::String(text.to_string()))),
        _ => parse_cell(text, semantic_type, nullable),
    }
}

/// Cell text for a JSON value: strings verbatim, `null` empty, anything else
/// in its JSON form.
pub fn json_cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}
