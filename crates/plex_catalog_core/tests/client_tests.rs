use httpmock::prelude::*;
use httpmock::Mock;
use plex_catalog_core::{
    export_all, list_items, read_export_rows, Catalog, Connector, ExportOptions, Library,
    LibraryRef, LibraryType, PlexConfig, PlexConnector, PlexError, PlexSession,
};
use serde_json::{json, Value};
use tempfile::tempdir;

type TestResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const TOKEN: &str = "test-token";

fn config(server: &MockServer) -> PlexConfig {
    PlexConfig::new(&server.base_url(), TOKEN)
        .expect("config")
        .with_timeout_secs(5)
}

fn identity_mock(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/").header("x-plex-token", TOKEN);
        then.status(200).json_body(json!({
            "MediaContainer": {
                "friendlyName": "Living Room",
                "machineIdentifier": "abc123",
                "version": "1.40.0"
            }
        }));
    })
}

fn sections_mock(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/library/sections");
        then.status(200).json_body(json!({
            "MediaContainer": {
                "size": 2,
                "Directory": [
                    {"key": "1", "title": "Movies", "type": "movie", "agent": "tv.plex.agents.movie"},
                    {"key": "2", "title": "TV Shows", "type": "show", "agent": "tv.plex.agents.series"}
                ]
            }
        }));
    })
}

fn count_mock<'a>(server: &'a MockServer, key: &str, total: u64) -> Mock<'a> {
    let path = format!("/library/sections/{key}/all");
    server.mock(|when, then| {
        when.method(GET)
            .path(path)
            .query_param("X-Plex-Container-Start", "0")
            .query_param("X-Plex-Container-Size", "0");
        then.status(200).json_body(json!({
            "MediaContainer": {"size": 0, "totalSize": total}
        }));
    })
}

fn page_mock<'a>(
    server: &'a MockServer,
    key: &str,
    start: u64,
    size: u32,
    total: u64,
    metadata: Value,
) -> Mock<'a> {
    let path = format!("/library/sections/{key}/all");
    let count = metadata.as_array().map(Vec::len).unwrap_or_default();
    server.mock(|when, then| {
        when.method(GET)
            .path(path)
            .query_param("X-Plex-Container-Start", start.to_string())
            .query_param("X-Plex-Container-Size", size.to_string());
        then.status(200).json_body(json!({
            "MediaContainer": {"size": count, "totalSize": total, "Metadata": metadata}
        }));
    })
}

fn movies() -> Library {
    Library {
        key: "1".into(),
        title: "Movies".into(),
        kind: LibraryType::Movie,
        agent: None,
        item_count: 3,
    }
}

#[test]
fn connect_reads_server_identity() -> TestResult<()> {
    let server = MockServer::start();
    let identity = identity_mock(&server);

    let session = PlexConnector.connect(&config(&server))?;
    assert_eq!(session.server().friendly_name, "Living Room");
    assert_eq!(session.server().version, "1.40.0");
    identity.assert();
    Ok(())
}

#[test]
fn rejected_token_is_auth_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(401);
    });

    let err = PlexSession::connect(&config(&server)).err().expect("auth failure");
    assert!(matches!(err, PlexError::Auth(_)), "got {err:?}");
}

#[test]
fn unreachable_host_is_connection_error() {
    let config = PlexConfig::new("http://127.0.0.1:1", TOKEN)
        .expect("config")
        .with_timeout_secs(2);
    let err = PlexSession::connect(&config).err().expect("connection failure");
    assert!(matches!(err, PlexError::Connection(_)), "got {err:?}");
}

#[test]
fn list_libraries_reports_counts() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    sections_mock(&server);
    count_mock(&server, "1", 3);
    count_mock(&server, "2", 12);

    let session = PlexConnector.connect(&config(&server))?;
    let libraries = session.list_libraries()?;

    assert_eq!(libraries.len(), 2);
    assert_eq!(libraries[0].title, "Movies");
    assert_eq!(libraries[0].kind, LibraryType::Movie);
    assert_eq!(libraries[0].item_count, 3);
    assert_eq!(libraries[1].kind, LibraryType::Show);
    assert_eq!(libraries[1].item_count, 12);
    assert_eq!(
        libraries[1].agent.as_deref(),
        Some("tv.plex.agents.series")
    );
    Ok(())
}

#[test]
fn items_are_fetched_one_page_at_a_time() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    let first = page_mock(
        &server,
        "1",
        0,
        2,
        3,
        json!([
            {"ratingKey": "10", "title": "Alien", "type": "movie", "year": 1979},
            {"ratingKey": "11", "title": "Aliens", "type": "movie", "year": 1986}
        ]),
    );
    let second = page_mock(
        &server,
        "1",
        2,
        2,
        3,
        json!([{"ratingKey": "12", "title": "Alien 3", "type": "movie"}]),
    );

    let session = PlexConnector.connect(&config(&server).with_page_size(2))?;
    let mut items = session.items(&movies());

    let head = items.next().expect("first item")?;
    assert_eq!(head.title, "Alien");
    first.assert_hits(1);
    second.assert_hits(0);

    let rest: Vec<String> = items
        .map(|item| item.map(|i| i.title))
        .collect::<Result<_, _>>()?;
    assert_eq!(rest, vec!["Aliens", "Alien 3"]);
    first.assert_hits(1);
    second.assert_hits(1);
    Ok(())
}

#[test]
fn failing_page_ends_stream_with_error() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    page_mock(
        &server,
        "1",
        0,
        2,
        3,
        json!([{"title": "Alien"}, {"title": "Aliens"}]),
    );
    server.mock(|when, then| {
        when.method(GET)
            .path("/library/sections/1/all")
            .query_param("X-Plex-Container-Start", "2");
        then.status(500);
    });

    let session = PlexConnector.connect(&config(&server).with_page_size(2))?;
    let results: Vec<_> = session.items(&movies()).collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok() && results[1].is_ok());
    assert!(matches!(results[2], Err(PlexError::Connection(_))));
    Ok(())
}

#[test]
fn list_items_by_unknown_name_is_not_found() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    sections_mock(&server);
    count_mock(&server, "1", 3);
    count_mock(&server, "2", 12);

    let session = PlexConnector.connect(&config(&server))?;
    let reference = LibraryRef::from_options(Some("Music".into()), None)?;
    let err = list_items(&session, &reference).err().expect("not found");
    assert!(matches!(err, PlexError::NotFound(_)));
    Ok(())
}

#[test]
fn recently_added_and_search_use_section_endpoints() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    let recent = server.mock(|when, then| {
        when.method(GET)
            .path("/library/sections/1/recentlyAdded")
            .query_param("X-Plex-Container-Size", "2");
        then.status(200).json_body(json!({
            "MediaContainer": {"size": 2, "Metadata": [
                {"title": "Dune: Part Two", "year": 2024},
                {"title": "Civil War", "year": 2024}
            ]}
        }));
    });
    let search = server.mock(|when, then| {
        when.method(GET)
            .path("/library/sections/1/all")
            .query_param("title", "alien");
        then.status(200).json_body(json!({
            "MediaContainer": {"size": 1, "totalSize": 1, "Metadata": [{"title": "Alien"}]}
        }));
    });

    let session = PlexConnector.connect(&config(&server))?;
    let latest = session.recently_added(&movies(), 2)?;
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].title, "Dune: Part Two");

    let found: Vec<_> = session
        .search(&movies(), "alien")
        .collect::<Result<_, _>>()?;
    assert_eq!(found.len(), 1);
    recent.assert();
    search.assert();
    Ok(())
}

#[test]
fn export_all_over_http_writes_every_item() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    sections_mock(&server);
    count_mock(&server, "1", 2);
    count_mock(&server, "2", 1);
    page_mock(
        &server,
        "1",
        0,
        100,
        2,
        json!([
            {
                "ratingKey": "10",
                "title": "Alien",
                "type": "movie",
                "year": 1979,
                "duration": 7_020_000_u64,
                "studio": "20th Century Fox",
                "Genre": [{"tag": "Horror"}],
                "Media": [{"Part": [{"size": 2_097_152_u64}]}]
            },
            {"ratingKey": "11", "title": "Aliens", "type": "movie"}
        ]),
    );
    page_mock(
        &server,
        "2",
        0,
        100,
        1,
        json!([{"ratingKey": "20", "title": "The Expanse", "type": "show", "viewCount": 4}]),
    );

    let dir = tempdir()?;
    let csv_path = dir.path().join("export.csv");
    let session = PlexConnector.connect(&config(&server))?;
    let options = ExportOptions {
        csv_path: csv_path.clone(),
        ..ExportOptions::default()
    };
    let result = export_all(&session, &options)?;

    assert_eq!(result.total_items, 3);
    assert!(result.failures.is_empty());

    let rows = read_export_rows(&csv_path, "utf-8")?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].library_name, "Movies");
    assert_eq!(rows[0].duration_minutes, "117");
    assert_eq!(rows[0].file_size_mb, "2.00");
    assert_eq!(rows[0].genres, "Horror");
    assert_eq!(rows[2].library_type, "show");
    assert_eq!(rows[2].view_count, "4");
    Ok(())
}

#[test]
fn failing_item_count_does_not_abort_export() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    sections_mock(&server);
    count_mock(&server, "1", 2);
    page_mock(
        &server,
        "1",
        0,
        100,
        2,
        json!([
            {"ratingKey": "10", "title": "Alien", "type": "movie"},
            {"ratingKey": "11", "title": "Aliens", "type": "movie"}
        ]),
    );
    server.mock(|when, then| {
        when.method(GET).path("/library/sections/2/all");
        then.status(500);
    });

    let session = PlexConnector.connect(&config(&server))?;
    let libraries = session.list_libraries()?;
    assert_eq!(libraries.len(), 2);
    assert_eq!(libraries[1].item_count, 0);

    let dir = tempdir()?;
    let csv_path = dir.path().join("export.csv");
    let options = ExportOptions {
        csv_path: csv_path.clone(),
        ..ExportOptions::default()
    };
    let result = export_all(&session, &options)?;

    assert_eq!(result.total_items, 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].library.key, "2");
    let rows = read_export_rows(&csv_path, "utf-8")?;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.library_key == "1"));
    Ok(())
}

#[test]
fn undecodable_item_is_skipped_within_its_page() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    page_mock(
        &server,
        "1",
        0,
        100,
        3,
        json!([
            {"ratingKey": "10", "title": "Alien", "year": 1979},
            {"ratingKey": "11", "title": "Aliens", "year": "abc"},
            {"ratingKey": "12", "title": "Alien 3", "year": 1992}
        ]),
    );

    let session = PlexConnector.connect(&config(&server))?;
    let titles: Vec<String> = session
        .items(&movies())
        .map(|item| item.map(|i| i.title))
        .collect::<Result<_, _>>()?;
    assert_eq!(titles, vec!["Alien", "Alien 3"]);
    Ok(())
}

#[test]
fn stream_without_total_stops_when_page_size_is_ignored() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    let listing = server.mock(|when, then| {
        when.method(GET).path("/library/sections/1/all");
        then.status(200).json_body(json!({
            "MediaContainer": {"size": 3, "Metadata": [
                {"ratingKey": "10", "title": "Alien"},
                {"ratingKey": "11", "title": "Aliens"},
                {"ratingKey": "12", "title": "Alien 3"}
            ]}
        }));
    });

    let session = PlexConnector.connect(&config(&server).with_page_size(2))?;
    let items: Vec<_> = session.items(&movies()).collect::<Result<_, _>>()?;
    assert_eq!(items.len(), 3);
    listing.assert_hits(1);
    Ok(())
}

#[test]
fn stream_without_total_stops_when_a_page_repeats() -> TestResult<()> {
    let server = MockServer::start();
    identity_mock(&server);
    let listing = server.mock(|when, then| {
        when.method(GET).path("/library/sections/1/all");
        then.status(200).json_body(json!({
            "MediaContainer": {"size": 2, "Metadata": [
                {"ratingKey": "10", "title": "Alien"},
                {"ratingKey": "11", "title": "Aliens"}
            ]}
        }));
    });

    let session = PlexConnector.connect(&config(&server).with_page_size(2))?;
    let items: Vec<_> = session.items(&movies()).collect::<Result<_, _>>()?;
    assert_eq!(items.len(), 2);
    listing.assert_hits(2);
    Ok(())
}
