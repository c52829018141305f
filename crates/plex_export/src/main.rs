use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use plex_catalog_core::{
    connect_with, current_timestamp, env_var, export_file_name, export_libraries, init_logging,
    Catalog, ConfigOverrides, ExportOptions, ExportProgress, ExportResult, Library, PlexConnector,
    PlexError, FIELDNAMES,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Export every Plex library item to CSV", long_about = None)]
struct Cli {
    /// Output CSV path (default: plex_library_export_<timestamp>.csv)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Directory for the timestamped CSV file
    #[arg(long = "output-dir", conflicts_with = "output")]
    output_dir: Option<PathBuf>,

    /// Output file encoding
    #[arg(short = 'e', long = "encoding", default_value = "utf-8")]
    encoding: String,

    /// Items requested per page (overrides PLEX_PAGE_SIZE)
    #[arg(long = "page-size")]
    page_size: Option<u32>,

    /// Request timeout in seconds (overrides PLEX_TIMEOUT_SECS)
    #[arg(long = "timeout")]
    timeout: Option<u64>,

    /// Log every request to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout_secs: self.timeout,
            page_size: self.page_size,
        }
    }

    fn csv_path(&self) -> PathBuf {
        match (&self.output, &self.output_dir) {
            (Some(path), _) => path.clone(),
            (None, Some(dir)) => dir.join(export_file_name(&current_timestamp())),
            (None, None) => PathBuf::from(export_file_name(&current_timestamp())),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, "info");
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), err);
            if let Some(hint) = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<PlexError>())
                .and_then(PlexError::hint)
            {
                eprintln!("{}", style(hint).dim());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.page_size == Some(0) {
        bail!("--page-size must be greater than 0");
    }

    println!("{}", style("=== Plex Library CSV Exporter ===").cyan().bold());
    let session = connect_with(&PlexConnector, env_var, &cli.overrides())
        .context("connecting to Plex server")?;
    let libraries = session.list_libraries().context("listing libraries")?;
    print_libraries(&libraries);
    if libraries.is_empty() {
        println!(
            "{}",
            style("No libraries found. Check your connection and token.").yellow()
        );
        return Ok(());
    }

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress_bar.enable_steady_tick(Duration::from_millis(120));
    let spinner = progress_bar.clone();

    let options = ExportOptions {
        csv_path: cli.csv_path(),
        encoding: cli.encoding.clone(),
        progress_callback: Some(Arc::new(move |progress: ExportProgress| {
            let total = progress
                .total
                .map(|t| format!("/{t}"))
                .unwrap_or_default();
            spinner.set_message(format!(
                "{}: {}{} items",
                progress.library, progress.current, total
            ));
        })),
    };

    let result = export_libraries(&session, &libraries, &options);
    progress_bar.finish_and_clear();
    let result = result.context("exporting libraries")?;
    print_summary(&result);
    Ok(())
}

fn print_libraries(libraries: &[Library]) {
    println!("{}", style("Available libraries:").bold());
    for library in libraries {
        println!(
            "  Key: {} - '{}' ({}) - {} items",
            library.key, library.title, library.kind, library.item_count
        );
    }
    println!();
}

fn print_summary(result: &ExportResult) {
    for summary in &result.libraries {
        println!(
            "  {} {} items from {}",
            style("Completed:").green(),
            summary.exported,
            summary.library.title
        );
    }
    for failure in &result.failures {
        println!(
            "  {} {} ({} items written before failure): {}",
            style("Skipped:").yellow(),
            failure.library.title,
            failure.exported,
            failure.reason
        );
    }
    println!();
    println!("{}", style("Export completed!").green().bold());
    println!("Total items exported: {}", result.total_items);
    println!("CSV file saved as: {}", result.csv_path.display());
    println!("{} {}", style("Columns:").dim(), FIELDNAMES.join(", "));
}
