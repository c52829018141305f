use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::csv_utils::CsvSink;
use crate::errors::ExportError;
use crate::models::Library;
use crate::timestamp::{current_timestamp, export_file_name};

const PROGRESS_LOG_EVERY: u64 = 100;

#[derive(Debug, Clone)]
pub struct ExportProgress {
    pub library: String,
    pub current: u64,
    pub total: Option<u64>,
}

pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ExportOptions {
    pub csv_path: PathBuf,
    pub encoding: String,
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(export_file_name(&current_timestamp())),
            encoding: "utf-8".to_string(),
            progress_callback: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibrarySummary {
    pub library: Library,
    pub exported: u64,
}

#[derive(Debug, Clone)]
pub struct LibraryFailure {
    pub library: Library,
    pub exported: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub csv_path: PathBuf,
    pub libraries: Vec<LibrarySummary>,
    pub failures: Vec<LibraryFailure>,
    pub total_items: u64,
}

/// Lists every library, then exports them all. See [`export_libraries`].
pub fn export_all<C>(catalog: &C, options: &ExportOptions) -> Result<ExportResult, ExportError>
where
    C: Catalog + ?Sized,
{
    let libraries = catalog
        .list_libraries()
        .map_err(|err| ExportError::from(err).context("listing libraries"))?;
    export_libraries(catalog, &libraries, options)
}

/// Writes one CSV row per item of every library, in order.
///
/// A library that fails mid-stream is recorded in
/// [`ExportResult::failures`] and skipped; rows already written for it stay
/// in the file. Only file errors abort the run.
pub fn export_libraries<C>(
    catalog: &C,
    libraries: &[Library],
    options: &ExportOptions,
) -> Result<ExportResult, ExportError>
where
    C: Catalog + ?Sized,
{
    let mut sink = CsvSink::create(&options.csv_path, &options.encoding).map_err(|err| {
        ExportError::from(err).context(format!("creating {}", options.csv_path.display()))
    })?;
    let progress_callback = options.progress_callback.as_ref();

    let mut summaries = Vec::new();
    let mut failures = Vec::new();

    for library in libraries {
        info!(key = %library.key, title = %library.title, "processing library");
        let total = (library.item_count > 0).then_some(library.item_count);
        let mut exported: u64 = 0;
        let mut failure = None;

        for item in catalog.items(library) {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    failure = Some(err.to_string());
                    break;
                }
            };
            sink.write_row(library, &item)?;
            exported += 1;
            if exported % PROGRESS_LOG_EVERY == 0 {
                info!(title = %library.title, exported, "export progress");
            }
            if let Some(callback) = progress_callback {
                callback(ExportProgress {
                    library: library.title.clone(),
                    current: exported,
                    total,
                });
            }
        }
        sink.flush()?;

        match failure {
            Some(reason) => {
                warn!(title = %library.title, exported, %reason, "skipping library after error");
                failures.push(LibraryFailure {
                    library: library.clone(),
                    exported,
                    reason,
                });
            }
            None => {
                info!(title = %library.title, exported, "library complete");
                summaries.push(LibrarySummary {
                    library: library.clone(),
                    exported,
                });
            }
        }
    }

    Ok(ExportResult {
        csv_path: sink.path().to_path_buf(),
        libraries: summaries,
        failures,
        total_items: sink.rows_written(),
    })
}
