use chrono::{DateTime, Local};

const TS_FORMAT: &str = "%Y%m%d_%H%M%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const EXPORT_FILE_PREFIX: &str = "plex_library_export_";

pub fn current_timestamp() -> String {
    Local::now().format(TS_FORMAT).to_string()
}

pub fn export_file_name(timestamp: &str) -> String {
    format!("{EXPORT_FILE_PREFIX}{timestamp}.csv")
}

/// Formats a Unix timestamp in local time; `None` if it is out of range.
pub fn format_epoch(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&Local).format(DISPLAY_FORMAT).to_string())
}
