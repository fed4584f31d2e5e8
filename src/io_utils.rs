//! CSV reading and writing, encoding detection, and delimiter resolution.
//!
//! Input is decoded before parsing. An explicit encoding label wins; without
//! one, a byte-order mark decides, then strict UTF-8 is attempted, and
//! windows-1252 is the fallback (it accepts every byte sequence, so latin-1
//! exports always load). Output is always UTF-8. The `-` path convention
//! routes through stdin/stdout.

use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::{debug, info};

use crate::{error::ConfigurationError, frame::Table};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, ConfigurationError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConfigurationError::UnknownEncoding(label.to_string()))
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        std::io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(bytes)
}

/// Decodes raw input bytes, returning the text and the encoding used.
pub fn decode_input<'a>(
    bytes: &'a [u8],
    encoding: Option<&'static Encoding>,
) -> Result<(Cow<'a, str>, &'static Encoding)> {
    if let Some(encoding) = encoding {
        let (text, used, had_errors) = encoding.decode(bytes);
        if had_errors {
            bail!("Failed to decode input with encoding {}", encoding.name());
        }
        return Ok((text, used));
    }
    if let Some((bom_encoding, _)) = Encoding::for_bom(bytes) {
        let (text, used, _) = bom_encoding.decode(bytes);
        return Ok((text, used));
    }
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok((text, UTF_8));
    }
    debug!("Input is not valid UTF-8; falling back to {}", WINDOWS_1252.name());
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    Ok((text, WINDOWS_1252))
}

/// Parses decoded CSV text into a [`Table`] with numeric columns inferred.
pub fn parse_table(text: &str, delimiter: u8) -> Result<Table> {
    if text.trim().is_empty() {
        bail!("CSV file is empty");
    }
    let mut reader = open_csv_reader(text.as_bytes(), delimiter);
    let headers = reader
        .headers()
        .context("Reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let mut records = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV row {}", idx + 2))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if records.is_empty() {
        bail!("CSV file is empty");
    }
    Ok(Table::from_text_rows(headers, records))
}

pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table> {
    let encoding = options
        .encoding
        .as_deref()
        .map(resolve_encoding)
        .transpose()?;
    let bytes = read_input(path)?;
    let (text, used) = decode_input(&bytes, encoding)?;
    let delimiter = resolve_input_delimiter(path, options.delimiter);
    let table = parse_table(&text, delimiter).with_context(|| format!("Loading {path:?}"))?;
    info!(
        "Loaded {} rows and {} columns from {path:?} ({})",
        table.row_count(),
        table.column_count(),
        used.name()
    );
    Ok(table)
}

pub fn write_table(table: &Table, path: Option<&Path>, delimiter: Option<u8>) -> Result<()> {
    let delimiter = resolve_output_delimiter(path, delimiter);
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.headers())
        .context("Writing CSV headers")?;
    for row in table.display_rows() {
        writer.write_record(&row).context("Writing CSV row")?;
    }
    writer
        .flush()
        .map_err(|err| anyhow!("Flushing CSV output: {err}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_bytes_fall_back_to_windows_1252() {
        let bytes = b"product,revenue\nCaf\xe9,10\n";
        let (text, used) = decode_input(bytes, None).unwrap();
        assert_eq!(used, WINDOWS_1252);
        assert!(text.contains("Café"));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let bytes = b"\xef\xbb\xbfproduct,revenue\nA,1\n";
        let (text, used) = decode_input(bytes, None).unwrap();
        assert_eq!(used, UTF_8);
        assert!(text.starts_with("product"));
    }

    #[test]
    fn header_only_input_is_empty() {
        let err = parse_table("product,revenue\n", b',').unwrap_err();
        assert_eq!(err.to_string(), "CSV file is empty");
    }

    #[test]
    fn tsv_extension_selects_tab() {
        assert_eq!(resolve_input_delimiter(Path::new("sales.TSV"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("sales.csv"), Some(b';')), b';');
    }

    #[test]
    fn unknown_encoding_label_is_rejected() {
        assert_eq!(
            resolve_encoding("klingon"),
            Err(ConfigurationError::UnknownEncoding("klingon".to_string()))
        );
        assert_eq!(resolve_encoding("latin1"), Ok(WINDOWS_1252));
    }
}
