use std::{io::Write, sync::Arc};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::{
    cli::ImportArgs,
    codec::CodecRegistry,
    io_utils::{self, CsvSource},
    manifest::SchemaManifest,
    mapper::Mapper,
};

pub fn execute(args: &ImportArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.csv.input_encoding.as_deref())?;
    let manifest = SchemaManifest::load(&args.schema)?;
    let codecs = CodecRegistry::new();
    let schema = Arc::new(
        manifest
            .compile(&codecs)
            .with_context(|| format!("Compiling schema manifest {:?}", args.schema))?,
    );

    let mut source = CsvSource::open(&args.input, args.csv.delimiter, encoding)?;
    let headers = source.header()?;
    let mapper = Mapper::for_header(Arc::clone(&schema), &headers);
    if mapper.designators().is_empty() {
        warn!(
            "No column of {:?} matches a label of schema '{}'",
            args.input,
            schema.record_type()
        );
    }
    info!(
        "Mapping {:?} into '{}' ({} of {} field(s) bound)",
        args.input,
        schema.record_type(),
        mapper.designators().len(),
        schema.len()
    );

    let mut output = io_utils::open_output(args.output.as_deref())?;
    let mut faults = 0usize;
    let mut mapped = 0usize;
    for row in source.rows() {
        if args.limit.is_some_and(|limit| mapped >= limit) {
            break;
        }
        let (line, cells) = row?;
        let value = mapper.read_with(&cells, |label, cell, fault| {
            faults += 1;
            warn!(
                "Row {line} column '{label}' ({:?}): {fault}",
                cell.map(String::as_str).unwrap_or_default()
            );
        });
        serde_json::to_writer(&mut output, &value.to_json(&schema))
            .with_context(|| format!("Writing record for row {line}"))?;
        output.write_all(b"\n").context("Writing output")?;
        mapped += 1;
    }
    output.flush().context("Flushing output")?;

    info!("Mapped {mapped} row(s) with {faults} cell fault(s)");
    if args.strict && faults > 0 {
        bail!("{faults} cell(s) could not be mapped");
    }
    Ok(())
}
