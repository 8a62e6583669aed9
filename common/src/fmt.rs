/// Formats a byte count as a human readable string with one decimal place.
pub fn format_bytes(mut value: f64) -> String {
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} PB")
}

/// Formats a byte-per-second rate, e.g. `1.5 MB/s`.
pub fn format_speed(value: f64) -> String {
    format!("{}/s", format_bytes(value))
}
