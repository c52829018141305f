//! Library enumeration over any catalog backend.
//!
//! The HTTP session implements [`Catalog`]; tests swap in an in-memory
//! catalog and a counting [`Connector`].

use tracing::debug;

use crate::config::{ConfigOverrides, PlexConfig};
use crate::errors::PlexError;
use crate::models::{Item, Library};

/// Lazily fetched items of one library. Errors end the stream.
pub type ItemStream<'a> = Box<dyn Iterator<Item = Result<Item, PlexError>> + 'a>;

pub trait Catalog {
    fn list_libraries(&self) -> Result<Vec<Library>, PlexError>;

    fn items<'a>(&'a self, library: &Library) -> ItemStream<'a>;

    fn recently_added(&self, library: &Library, count: usize) -> Result<Vec<Item>, PlexError>;

    fn search<'a>(&'a self, library: &Library, query: &str) -> ItemStream<'a>;
}

pub trait Connector {
    type Session: Catalog;

    fn connect(&self, config: &PlexConfig) -> Result<Self::Session, PlexError>;
}

/// Loads configuration through `lookup`, applies `overrides`, then opens one
/// session.
///
/// The connector is never touched when configuration is incomplete.
pub fn connect_with<C, F>(
    connector: &C,
    lookup: F,
    overrides: &ConfigOverrides,
) -> Result<C::Session, PlexError>
where
    C: Connector,
    F: Fn(&str) -> Option<String>,
{
    let config = overrides.apply(PlexConfig::from_lookup(lookup)?);
    debug!(?config, "configuration loaded");
    connector.connect(&config)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryRef {
    Name(String),
    Key(String),
}

impl LibraryRef {
    /// Builds a reference from two optional CLI selectors; exactly one must be set.
    pub fn from_options(name: Option<String>, key: Option<String>) -> Result<Self, PlexError> {
        let name = name.filter(|n| !n.trim().is_empty());
        let key = key.filter(|k| !k.trim().is_empty());
        match (name, key) {
            (Some(_), Some(_)) => Err(PlexError::AmbiguousInput(
                "specify either a library name or a library key, not both".to_string(),
            )),
            (None, None) => Err(PlexError::AmbiguousInput(
                "specify either a library name or a library key".to_string(),
            )),
            (Some(name), None) => Ok(LibraryRef::Name(name.trim().to_string())),
            (None, Some(key)) => Ok(LibraryRef::Key(key.trim().to_string())),
        }
    }

    pub fn matches(&self, library: &Library) -> bool {
        match self {
            LibraryRef::Name(name) => library.title.to_lowercase() == name.to_lowercase(),
            LibraryRef::Key(key) => library.key == *key,
        }
    }

    fn describe(&self) -> String {
        match self {
            LibraryRef::Name(name) => format!("no library named {name:?}"),
            LibraryRef::Key(key) => format!("no library with key {key:?}"),
        }
    }
}

pub fn find_library(libraries: &[Library], reference: &LibraryRef) -> Result<Library, PlexError> {
    libraries
        .iter()
        .find(|library| reference.matches(library))
        .cloned()
        .ok_or_else(|| PlexError::NotFound(reference.describe()))
}

pub fn resolve_library<C>(catalog: &C, reference: &LibraryRef) -> Result<Library, PlexError>
where
    C: Catalog + ?Sized,
{
    let libraries = catalog.list_libraries()?;
    let library = find_library(&libraries, reference)?;
    debug!(key = %library.key, title = %library.title, "resolved library");
    Ok(library)
}

pub fn list_items<'a, C>(
    catalog: &'a C,
    reference: &LibraryRef,
) -> Result<(Library, ItemStream<'a>), PlexError>
where
    C: Catalog + ?Sized,
{
    let library = resolve_library(catalog, reference)?;
    let items = catalog.items(&library);
    Ok((library, items))
}

/// Drains a stream, stopping at the first error.
pub fn collect_items(stream: ItemStream<'_>) -> Result<Vec<Item>, PlexError> {
    stream.collect()
}
