use std::collections::VecDeque;

use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Connector, ItemStream};
use crate::config::PlexConfig;
use crate::errors::PlexError;
use crate::models::{
    ApiResponse, Item, Library, MetadataPayload, SectionsPayload, ServerInfo, ServerPayload,
};

pub const IDENTITY_ENDPOINT: &str = "/";
pub const SECTIONS_ENDPOINT: &str = "/library/sections";

pub const TOKEN_HEADER: &str = "x-plex-token";
const CONTAINER_START: &str = "X-Plex-Container-Start";
const CONTAINER_SIZE: &str = "X-Plex-Container-Size";

pub const DEFAULT_HEADERS: [(&str, &str); 3] = [
    ("accept", "application/json"),
    ("x-plex-product", "plex-catalog"),
    ("x-plex-client-identifier", "plex-catalog-export"),
];

/// Opens sessions against a real server.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlexConnector;

impl Connector for PlexConnector {
    type Session = PlexSession;

    fn connect(&self, config: &PlexConfig) -> Result<PlexSession, PlexError> {
        PlexSession::connect(config)
    }
}

pub struct PlexSession {
    client: Client,
    base_url: String,
    page_size: u32,
    server: ServerInfo,
}

impl PlexSession {
    /// Authenticates with a single identity request. No retries.
    pub fn connect(config: &PlexConfig) -> Result<Self, PlexError> {
        let mut headers = HeaderMap::new();
        for (name, value) in DEFAULT_HEADERS.iter() {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        let mut token = HeaderValue::from_str(&config.token)
            .map_err(|err| PlexError::Config(format!("access token is not a valid header: {err}")))?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(TOKEN_HEADER), token);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| PlexError::Connection(format!("HTTP client setup failed: {err}")))?;

        let mut session = Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size.max(1),
            server: ServerInfo {
                friendly_name: String::new(),
                machine_identifier: String::new(),
                version: String::new(),
            },
        };
        let payload: ServerPayload = session.request(IDENTITY_ENDPOINT, &[])?;
        session.server = payload.into_server_info();
        info!(
            server = %session.server.friendly_name,
            version = %session.server.version,
            "connected to Plex server"
        );
        Ok(session)
    }

    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_count(&self, key: &str) -> Result<u64, PlexError> {
        let payload: MetadataPayload = self.request(
            &section_path(key, "all"),
            &[
                (CONTAINER_START, "0".to_string()),
                (CONTAINER_SIZE, "0".to_string()),
            ],
        )?;
        Ok(payload.total())
    }

    fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlexError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "GET");
        let mut req = self.client.get(&url);
        for (k, v) in params {
            req = req.query(&[(k, v.as_str())]);
        }
        let response = req.send().map_err(|err| transport_error(&url, err))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PlexError::Auth(format!(
                "server rejected the access token (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return Err(PlexError::Connection(format!("HTTP {status} from {url}")));
        }
        let bytes = response
            .bytes()
            .map_err(|err| transport_error(&url, err))?;
        let payload: ApiResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|err| PlexError::InvalidJson(format!("{url}: {err}")))?;
        Ok(payload.media_container)
    }
}

impl Catalog for PlexSession {
    fn list_libraries(&self) -> Result<Vec<Library>, PlexError> {
        let payload: SectionsPayload = self.request(SECTIONS_ENDPOINT, &[])?;
        let mut libraries = Vec::with_capacity(payload.directories.len());
        for directory in payload.directories {
            // 0 means unknown; the library is still listed and exported.
            let count = match self.item_count(&directory.key) {
                Ok(count) => count,
                Err(err @ PlexError::Auth(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        key = %directory.key,
                        title = %directory.title,
                        error = %err,
                        "could not read item count"
                    );
                    0
                }
            };
            libraries.push(directory.into_library(count));
        }
        debug!(count = libraries.len(), "listed libraries");
        Ok(libraries)
    }

    fn items<'a>(&'a self, library: &Library) -> ItemStream<'a> {
        Box::new(PagedItems::new(
            self,
            section_path(&library.key, "all"),
            Vec::new(),
        ))
    }

    fn recently_added(&self, library: &Library, count: usize) -> Result<Vec<Item>, PlexError> {
        let payload: MetadataPayload = self.request(
            &section_path(&library.key, "recentlyAdded"),
            &[
                (CONTAINER_START, "0".to_string()),
                (CONTAINER_SIZE, count.to_string()),
            ],
        )?;
        let mut items = payload.into_items();
        items.truncate(count);
        Ok(items)
    }

    fn search<'a>(&'a self, library: &Library, query: &str) -> ItemStream<'a> {
        Box::new(PagedItems::new(
            self,
            section_path(&library.key, "all"),
            vec![("title", query.to_string())],
        ))
    }
}

/// Walks a paged listing one container page at a time.
///
/// A page is only requested once every item of the previous page has been
/// handed out.
pub struct PagedItems<'a> {
    session: &'a PlexSession,
    path: String,
    filters: Vec<(&'static str, String)>,
    offset: u64,
    total: Option<u64>,
    buffer: VecDeque<Item>,
    page_head: Option<String>,
    done: bool,
}

impl<'a> PagedItems<'a> {
    fn new(session: &'a PlexSession, path: String, filters: Vec<(&'static str, String)>) -> Self {
        Self {
            session,
            path,
            filters,
            offset: 0,
            total: None,
            buffer: VecDeque::new(),
            page_head: None,
            done: false,
        }
    }

    fn fetch_page(&mut self) -> Result<(), PlexError> {
        let page_size = self.session.page_size;
        let mut params = self.filters.clone();
        params.push((CONTAINER_START, self.offset.to_string()));
        params.push((CONTAINER_SIZE, page_size.to_string()));

        let payload: MetadataPayload = self.session.request(&self.path, &params)?;
        if let Some(total) = payload.total_size {
            self.total = Some(total);
        }
        // Without totalSize, only a page of exactly the requested size can
        // have a successor; servers that ignore the size return everything.
        let received = payload.metadata.len() as u64;
        if received == 0 || (self.total.is_none() && received != u64::from(page_size)) {
            self.done = true;
        }
        self.offset += received;
        let items = payload.into_items();
        let head = items
            .first()
            .map(|item| item.rating_key.clone())
            .filter(|key| !key.is_empty());
        if head.is_some() && head == self.page_head {
            debug!(path = %self.path, offset = self.offset, "server repeated a page, stopping");
            self.done = true;
            return Ok(());
        }
        self.page_head = head;
        self.buffer.extend(items);
        Ok(())
    }
}

impl Iterator for PagedItems<'_> {
    type Item = Result<Item, PlexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done || self.total.is_some_and(|total| self.offset >= total) {
                return None;
            }
            if let Err(err) = self.fetch_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

fn section_path(key: &str, leaf: &str) -> String {
    format!("{SECTIONS_ENDPOINT}/{key}/{leaf}")
}

fn transport_error(url: &str, err: reqwest::Error) -> PlexError {
    if err.is_timeout() {
        PlexError::Connection(format!("request to {url} timed out"))
    } else if err.is_connect() {
        PlexError::Connection(format!("cannot connect to {url}: {err}"))
    } else {
        PlexError::Connection(format!("request to {url} failed: {err}"))
    }
}
