use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use plex_catalog_core::{
    collect_items, connect_with, env_var, init_logging, list_items, render_items_table,
    render_libraries_table, resolve_library, Catalog, ConfigOverrides, LibraryRef, PlexConnector,
    PlexError,
};
use tracing::warn;

/// Interact with your Plex Media Server.
///
/// Reads PLEX_URL and PLEX_TOKEN from the environment.
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
struct Cli {
    /// Log requests and responses to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Request timeout in seconds (overrides PLEX_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all available libraries
    Libraries,

    /// Print every item of one library
    Items {
        #[command(flatten)]
        library: LibrarySelector,
    },

    /// Print the most recently added items of one library
    Recent {
        #[command(flatten)]
        library: LibrarySelector,

        /// Number of items to show
        #[arg(short = 'c', long = "count", default_value_t = 50)]
        count: usize,
    },

    /// Search one library by title
    Search {
        #[command(flatten)]
        library: LibrarySelector,

        /// Text to look for in item titles
        query: String,
    },
}

#[derive(Args, Debug)]
struct LibrarySelector {
    /// Key/ID of the library (e.g. 1, 2, 3)
    #[arg(short = 'k', long = "library-key")]
    library_key: Option<String>,

    /// Name of the library (e.g. "Movies", "TV Shows")
    #[arg(short = 'n', long = "library-name")]
    library_name: Option<String>,
}

impl LibrarySelector {
    fn reference(&self) -> Result<LibraryRef, PlexError> {
        LibraryRef::from_options(self.library_name.clone(), self.library_key.clone())
    }
}

impl Command {
    fn library_reference(&self) -> Result<Option<LibraryRef>, PlexError> {
        match self {
            Command::Libraries => Ok(None),
            Command::Items { library }
            | Command::Recent { library, .. }
            | Command::Search { library, .. } => library.reference().map(Some),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, "warn");
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Selector and environment are both checked before the first request.
    let reference = cli.command.library_reference()?;
    let overrides = ConfigOverrides {
        timeout_secs: cli.timeout,
        page_size: None,
    };
    let session = connect_with(&PlexConnector, env_var, &overrides)
        .context("connecting to Plex server")?;

    let output = execute(&session, &cli.command, reference.as_ref())?;
    println!("{output}");
    Ok(())
}

fn execute<C: Catalog>(
    catalog: &C,
    command: &Command,
    reference: Option<&LibraryRef>,
) -> Result<String> {
    let Some(reference) = reference else {
        let libraries = catalog.list_libraries().context("listing libraries")?;
        if libraries.is_empty() {
            return Ok(style("No libraries found.").yellow().to_string());
        }
        return Ok(render_libraries_table(&libraries));
    };

    let items = match command {
        Command::Recent { count, .. } => {
            let library = resolve_library(catalog, reference)?;
            catalog.recently_added(&library, *count)?
        }
        Command::Search { query, .. } => {
            let library = resolve_library(catalog, reference)?;
            collect_items(catalog.search(&library, query))
                .with_context(|| format!("searching {}", library.title))?
        }
        _ => {
            let (library, stream) = list_items(catalog, reference)?;
            let items = collect_items(stream)
                .with_context(|| format!("fetching items of {}", library.title))?;
            if items.len() as u64 != library.item_count {
                warn!(
                    reported = library.item_count,
                    received = items.len(),
                    "library changed while it was being listed"
                );
            }
            items
        }
    };
    Ok(render_items_table(&items))
}

fn report(err: &anyhow::Error) {
    eprintln!("{} {:#}", style("Error:").red().bold(), err);
    let hint = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PlexError>())
        .and_then(PlexError::hint);
    if let Some(hint) = hint {
        eprintln!("{}", style(hint).dim());
    }
}
