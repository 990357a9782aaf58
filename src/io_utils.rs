//! Streams behind the command line: CSV sources decoded into string rows,
//! CSV sinks re-encoded on the way out, and the `-` convention for
//! stdin/stdout.
//!
//! Delimiters default from the file extension (`.tsv` is tab, anything else
//! comma) unless given explicitly. Encodings are `encoding_rs` labels and
//! default to UTF-8.

use std::{
    borrow::Cow,
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoder, EncoderResult, Encoding, UTF_8};

const BYTE_ORDER_MARK: char = '\u{feff}';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label.map(str::trim) {
        None => Ok(UTF_8),
        Some(label) => {
            Encoding::for_label(label.as_bytes()).ok_or_else(|| anyhow!("Unknown encoding '{label}'"))
        }
    }
}

/// Explicit delimiter, else tab for `.tsv` paths, else comma.
pub fn delimiter_for(path: Option<&Path>, provided: Option<u8>) -> u8 {
    let is_tsv = path
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
    provided.unwrap_or(if is_tsv { b'\t' } else { b',' })
}

/// Opens `path` for reading, or stdin for `-`.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if is_dash(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Opens `path` for writing, or stdout when absent or `-`.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path.filter(|path| !is_dash(path)) {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// CSV input with a header row, decoded into string rows.
///
/// Rows may be shorter or longer than the header; the mapper reads missing
/// cells as empty.
pub struct CsvSource {
    path: PathBuf,
    encoding: &'static Encoding,
    reader: csv::Reader<Box<dyn BufRead>>,
}

impl CsvSource {
    pub fn open(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter_for(Some(path), delimiter))
            .from_reader(open_input(path)?);
        Ok(CsvSource {
            path: path.to_path_buf(),
            encoding,
            reader,
        })
    }

    /// Header labels with a leading byte order mark removed.
    pub fn header(&mut self) -> Result<Vec<String>> {
        let record = self
            .reader
            .byte_headers()
            .with_context(|| format!("Reading header of {:?}", self.path))?;
        let mut labels = decode_record(record, self.encoding)
            .with_context(|| format!("Decoding header of {:?}", self.path))?;
        if let Some(first) = labels.first_mut()
            && let Some(stripped) = first.strip_prefix(BYTE_ORDER_MARK)
        {
            *first = stripped.to_string();
        }
        Ok(labels)
    }

    /// Data rows paired with the line each one starts on.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<(u64, Vec<String>)>> + '_ {
        let encoding = self.encoding;
        let path = &self.path;
        self.reader.byte_records().map(move |record| {
            let record = record.with_context(|| format!("Reading {path:?}"))?;
            let line = record.position().map_or(0, csv::Position::line);
            let cells = decode_record(&record, encoding)
                .with_context(|| format!("Decoding line {line} of {path:?}"))?;
            Ok((line, cells))
        })
    }
}

fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| {
            encoding
                .decode_without_bom_handling_and_without_replacement(field)
                .map(Cow::into_owned)
                .ok_or_else(|| anyhow!("Cell is not valid {}", encoding.name()))
        })
        .collect()
}

/// CSV output to `path` (stdout when absent), re-encoded unless `encoding`
/// is UTF-8.
pub fn open_csv_writer(
    path: Option<&Path>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<csv::Writer<Box<dyn Write>>> {
    let mut sink = open_output(path)?;
    if encoding != UTF_8 {
        sink = Box::new(TranscodingWriter::new(sink, encoding));
    }
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(sink))
}

/// Feeds UTF-8 output through an `encoding_rs` encoder. Bytes of a character
/// split across writes wait in `pending` until the rest arrives.
struct TranscodingWriter<W: Write> {
    inner: W,
    encoder: Encoder,
    pending: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    fn new(inner: W, encoding: &'static Encoding) -> Self {
        TranscodingWriter {
            inner,
            encoder: encoding.new_encoder(),
            pending: Vec::new(),
        }
    }

    fn encode_pending(&mut self, at_end: bool) -> io::Result<()> {
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_none() && !at_end => err.valid_up_to(),
            Err(_) => return Err(invalid_data("output is not valid UTF-8".to_string())),
        };
        let text = std::str::from_utf8(&self.pending[..complete])
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let mut chunk = [0u8; 1024];
        let mut consumed = 0;
        loop {
            let (result, read, written) = self.encoder.encode_from_utf8_without_replacement(
                &text[consumed..],
                &mut chunk,
                false,
            );
            consumed += read;
            self.inner.write_all(&chunk[..written])?;
            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(ch) => {
                    return Err(invalid_data(format!(
                        "'{ch}' cannot be written as {}",
                        self.encoder.encoding().name()
                    )));
                }
            }
        }
        self.pending.drain(..complete);
        Ok(())
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.encode_pending(false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encode_pending(true)?;
        self.inner.flush()
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
