mod config_cmd;
mod record;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use record::{DeleteCommand, ListCommand, PutCommand};
pub use sync_cmd::{PullCommand, StatusCommand, SyncCommand};

/// Renders a millisecond timestamp as UTC for display.
pub(crate) fn format_millis(millis: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => millis.to_string(),
    }
}
