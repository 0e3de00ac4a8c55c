//! Text rendering of queue snapshots and share listings.

use hupload_protocol::Item;
use hupload_transfer::{EntryState, ProgressSummary, QueueEntryView};

const UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Formats a byte count with 1024-based units and one decimal, e.g. `1.5 KiB`.
pub fn human_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    value /= 1024.0;
    // Rounding to one decimal may reach the next unit (1023.95 KiB -> 1.0 MiB).
    while (value * 10.0).round() / 10.0 >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// One-line aggregate progress.
pub fn summary_line(summary: &ProgressSummary) -> String {
    format!(
        "{:5.1}%  {} / {}  ({} of {} files done, {} failed)",
        summary.percentage(),
        human_file_size(summary.bytes_loaded),
        human_file_size(summary.bytes_total),
        summary.finished,
        summary.files,
        summary.failed,
    )
}

/// One line per entry.
pub fn entry_line(entry: &QueueEntryView) -> String {
    let status = match entry.state {
        EntryState::Pending => "waiting".to_string(),
        EntryState::InProgress => format!("{:.0}%", entry.percentage()),
        EntryState::Succeeded => "done".to_string(),
        EntryState::Failed => format!("FAILED: {}", entry.error_message),
    };
    format!(
        "  {:<40} {:>10}  {status}",
        entry.name,
        human_file_size(entry.bytes_total)
    )
}

pub fn item_line(item: &Item) -> String {
    format!(
        "{:>10}  {}  {}",
        human_file_size(item.size()),
        item.info.date_modified.format("%Y-%m-%d %H:%M"),
        item.name()
    )
}
