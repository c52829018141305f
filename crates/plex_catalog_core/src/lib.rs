pub mod catalog;
pub mod client;
pub mod config;
pub mod csv_utils;
pub mod errors;
pub mod export;
pub mod logging;
pub mod models;
pub mod table;
pub mod timestamp;

pub use catalog::{
    collect_items, connect_with, find_library, list_items, resolve_library, Catalog, Connector,
    ItemStream, LibraryRef,
};
pub use client::{PlexConnector, PlexSession, DEFAULT_HEADERS};
pub use config::{env_var, ConfigOverrides, PlexConfig, ENV_TOKEN, ENV_URL};
pub use csv_utils::{build_row, read_export_rows, CsvSink, ExportRow, FIELDNAMES};
pub use errors::{ExportError, PlexError};
pub use export::{
    export_all, export_libraries, ExportOptions, ExportProgress, ExportResult, LibraryFailure,
    LibrarySummary, ProgressCallback,
};
pub use logging::init_logging;
pub use models::{Item, Library, LibraryType, ServerInfo};
pub use table::{render_items_table, render_libraries_table, Align, AsciiTable};
pub use timestamp::{current_timestamp, export_file_name, format_epoch};
