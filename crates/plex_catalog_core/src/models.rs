use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LibraryType {
    Movie,
    Show,
    Artist,
    Photo,
    Other(String),
}

impl LibraryType {
    pub fn as_str(&self) -> &str {
        match self {
            LibraryType::Movie => "movie",
            LibraryType::Show => "show",
            LibraryType::Artist => "artist",
            LibraryType::Photo => "photo",
            LibraryType::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for LibraryType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "movie" => LibraryType::Movie,
            "show" => LibraryType::Show,
            "artist" => LibraryType::Artist,
            "photo" => LibraryType::Photo,
            _ => LibraryType::Other(raw),
        }
    }
}

impl From<LibraryType> for String {
    fn from(kind: LibraryType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub key: String,
    pub title: String,
    pub kind: LibraryType,
    pub agent: Option<String>,
    pub item_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub rating_key: String,
    pub title: String,
    pub kind: String,
    pub year: Option<i32>,
    pub duration_ms: Option<u64>,
    pub added_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub view_count: u64,
    pub summary: Option<String>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub studio: Option<String>,
    pub content_rating: Option<String>,
    pub rating: Option<f64>,
    pub guid: Option<String>,
    pub file_size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub friendly_name: String,
    pub machine_identifier: String,
    pub version: String,
}

// Wire payloads. Every Plex response is wrapped in a `MediaContainer`.

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPayload {
    pub friendly_name: Option<String>,
    pub machine_identifier: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionsPayload {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<DirectoryPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryPayload {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    #[serde(default)]
    pub size: u64,
    pub total_size: Option<u64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    #[serde(default)]
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub year: Option<i32>,
    pub duration: Option<u64>,
    pub added_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub view_count: Option<u64>,
    pub summary: Option<String>,
    pub studio: Option<String>,
    pub content_rating: Option<String>,
    pub rating: Option<f64>,
    pub guid: Option<String>,
    #[serde(rename = "Genre", default)]
    pub genres: Vec<TagPayload>,
    #[serde(rename = "Director", default)]
    pub directors: Vec<TagPayload>,
    #[serde(rename = "Role", default)]
    pub roles: Vec<TagPayload>,
    #[serde(rename = "Media", default)]
    pub media: Vec<MediaPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagPayload {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    #[serde(rename = "Part", default)]
    pub parts: Vec<PartPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartPayload {
    pub size: Option<u64>,
}

impl ServerPayload {
    pub fn into_server_info(self) -> ServerInfo {
        ServerInfo {
            friendly_name: self.friendly_name.unwrap_or_default(),
            machine_identifier: self.machine_identifier.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
        }
    }
}

impl DirectoryPayload {
    pub fn into_library(self, item_count: u64) -> Library {
        Library {
            key: self.key,
            title: self.title,
            kind: LibraryType::from(self.kind),
            agent: self.agent.filter(|agent| !agent.is_empty()),
            item_count,
        }
    }
}

impl MetadataPayload {
    /// Total number of items behind this page, falling back to the page size
    /// when the server omits `totalSize`.
    pub fn total(&self) -> u64 {
        self.total_size.unwrap_or(self.size)
    }

    /// Decodes each entry on its own; entries that do not decode are logged
    /// and left out.
    pub fn into_items(self) -> Vec<Item> {
        self.metadata
            .into_iter()
            .filter_map(|raw| {
                let rating_key = raw.get("ratingKey").cloned();
                match serde_json::from_value::<MetadataItem>(raw) {
                    Ok(entry) => Some(Item::from(entry)),
                    Err(err) => {
                        warn!(rating_key = ?rating_key, error = %err, "skipping undecodable item");
                        None
                    }
                }
            })
            .collect()
    }
}

impl From<MetadataItem> for Item {
    fn from(raw: MetadataItem) -> Self {
        let file_size_bytes = raw.total_file_size();
        Item {
            rating_key: raw.rating_key,
            title: raw.title.trim().to_string(),
            kind: raw.kind,
            year: raw.year,
            duration_ms: raw.duration,
            added_at: raw.added_at,
            updated_at: raw.updated_at,
            view_count: raw.view_count.unwrap_or_default(),
            summary: raw.summary.filter(|s| !s.is_empty()),
            genres: tags(raw.genres),
            directors: tags(raw.directors),
            actors: tags(raw.roles),
            studio: raw.studio,
            content_rating: raw.content_rating,
            rating: raw.rating,
            guid: raw.guid,
            file_size_bytes,
        }
    }
}

impl MetadataItem {
    fn total_file_size(&self) -> Option<u64> {
        let total: u64 = self
            .media
            .iter()
            .flat_map(|media| media.parts.iter())
            .filter_map(|part| part.size)
            .sum();
        (total > 0).then_some(total)
    }
}

fn tags(raw: Vec<TagPayload>) -> Vec<String> {
    raw.into_iter()
        .map(|t| t.tag)
        .filter(|tag| !tag.is_empty())
        .collect()
}
