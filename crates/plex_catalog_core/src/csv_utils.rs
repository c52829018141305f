use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use serde::{Deserialize, Serialize};

use crate::errors::PlexError;
use crate::models::{Item, Library};
use crate::timestamp::format_epoch;

pub const FIELDNAMES: [&str; 20] = [
    "library_key",
    "library_name",
    "library_type",
    "title",
    "type",
    "year",
    "rating_key",
    "duration_minutes",
    "file_size_mb",
    "added_at",
    "updated_at",
    "view_count",
    "summary",
    "genres",
    "directors",
    "actors",
    "studio",
    "content_rating",
    "rating",
    "guid",
];

pub const MAX_ACTORS: usize = 5;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const MS_PER_MINUTE: u64 = 60 * 1000;

/// One exported line. Field order matches [`FIELDNAMES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub library_key: String,
    pub library_name: String,
    pub library_type: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: String,
    pub rating_key: String,
    pub duration_minutes: String,
    pub file_size_mb: String,
    pub added_at: String,
    pub updated_at: String,
    pub view_count: String,
    pub summary: String,
    pub genres: String,
    pub directors: String,
    pub actors: String,
    pub studio: String,
    pub content_rating: String,
    pub rating: String,
    pub guid: String,
}

fn resolve_encoding(label: &str) -> Result<&'static Encoding, PlexError> {
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| PlexError::Encoding(format!("unsupported encoding: {label}")))
}

/// Flattens one item into its export row.
pub fn build_row(library: &Library, item: &Item) -> ExportRow {
    ExportRow {
        library_key: library.key.clone(),
        library_name: library.title.clone(),
        library_type: library.kind.to_string(),
        title: item.title.clone(),
        kind: item.kind.clone(),
        year: opt(item.year),
        rating_key: item.rating_key.clone(),
        duration_minutes: opt(
            item.duration_ms
                .filter(|ms| *ms > 0)
                .map(|ms| ms / MS_PER_MINUTE),
        ),
        file_size_mb: item
            .file_size_bytes
            .filter(|bytes| *bytes > 0)
            .map(|bytes| format!("{:.2}", bytes as f64 / BYTES_PER_MB))
            .unwrap_or_default(),
        added_at: item.added_at.and_then(format_epoch).unwrap_or_default(),
        updated_at: item.updated_at.and_then(format_epoch).unwrap_or_default(),
        view_count: item.view_count.to_string(),
        summary: item
            .summary
            .as_deref()
            .map(|s| s.replace('\n', " ").replace('\r', ""))
            .unwrap_or_default(),
        genres: item.genres.join(", "),
        directors: item.directors.join(", "),
        actors: item
            .actors
            .iter()
            .take(MAX_ACTORS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        studio: item.studio.clone().unwrap_or_default(),
        content_rating: item.content_rating.clone().unwrap_or_default(),
        rating: opt(item.rating),
        guid: item.guid.clone().unwrap_or_default(),
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Incremental CSV writer. The header goes out on creation; rows are
/// buffered until [`CsvSink::flush`].
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
    encoding: &'static Encoding,
    rows: u64,
}

impl CsvSink {
    pub fn create(path: &Path, encoding: &str) -> Result<Self, PlexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let enc = resolve_encoding(encoding)?;
        let file = File::create(path)?;
        let mut sink = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            encoding: enc,
            rows: 0,
        };
        write_encoded(&mut sink.writer, enc, |csv| csv.write_record(FIELDNAMES))?;
        sink.flush()?;
        Ok(sink)
    }

    pub fn write_row(&mut self, library: &Library, item: &Item) -> Result<(), PlexError> {
        let row = build_row(library, item);
        write_encoded(&mut self.writer, self.encoding, |csv| csv.serialize(&row))?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), PlexError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads an export file back into typed rows.
pub fn read_export_rows(path: &Path, encoding: &str) -> Result<Vec<ExportRow>, PlexError> {
    let enc = resolve_encoding(encoding)?;
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(
        DecodeReaderBytesBuilder::new()
            .encoding(Some(enc))
            .build(file),
    );
    let rows = reader
        .deserialize::<ExportRow>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn write_encoded<W, F>(writer: &mut W, encoding: &'static Encoding, fill: F) -> Result<(), PlexError>
where
    W: Write,
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    fill(&mut csv_writer)?;
    csv_writer.flush()?;
    let buffer = csv_writer
        .into_inner()
        .map_err(|err| PlexError::Io(err.into_error()))?;
    if encoding == UTF_8 {
        writer.write_all(&buffer)?;
    } else {
        let utf8 = String::from_utf8(buffer).map_err(|err| PlexError::Encoding(err.to_string()))?;
        let (encoded, _, had_errors) = encoding.encode(&utf8);
        if had_errors {
            return Err(PlexError::Encoding(format!(
                "row cannot be represented in {}",
                encoding.name()
            )));
        }
        writer.write_all(&encoded)?;
    }
    Ok(())
}
