//! Shared utility functions.

use std::time::{SystemTime, UNIX_EPOCH};

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Cap tool output at `max_bytes`, appending a marker that states the
/// original size when anything was cut.
pub fn truncate_output(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    format!(
        "{}\n... (output truncated, {} bytes total)",
        truncate_str(s, max_bytes),
        s.len()
    )
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn truncate_no_op_when_short() {
        assert_eq!(truncate_str("hi", 10), "hi");
    }

    #[test]
    fn truncate_multibyte_boundary() {
        // 'é' is 2 bytes; cutting at byte 2 would land inside it
        let s = "aéb";
        assert_eq!(truncate_str(s, 2), "a");
        assert_eq!(truncate_str(s, 3), "aé");
    }

    #[test]
    fn truncate_output_appends_marker() {
        let out = truncate_output("0123456789", 4);
        assert!(out.starts_with("0123\n"));
        assert!(out.ends_with("(output truncated, 10 bytes total)"));
    }

    #[test]
    fn truncate_output_keeps_short_output() {
        assert_eq!(truncate_output("short", 100), "short");
    }

    #[test]
    fn timestamp_is_monotonic_enough() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(a > 0);
        assert!(b >= a);
    }
}
