//! Small text helpers shared by the reply pipeline.

use chrono::{DateTime, Local, TimeZone};

/// Length of the longest suffix of `a` that is also a prefix of `b`.
///
/// Measured in bytes, only at positions that are char boundaries in both
/// strings.
pub fn overlap_len(a: &str, b: &str) -> usize {
    let max = a.len().min(b.len());
    (1..=max)
        .rev()
        .find(|&n| {
            let start = a.len() - n;
            a.is_char_boundary(start) && b.is_char_boundary(n) && a[start..] == b[..n]
        })
        .unwrap_or(0)
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn format_now() -> String {
    format_datetime(&Local::now())
}

/// Number of trailing `\n` characters.
pub fn trailing_newlines(text: &str) -> usize {
    text.chars().rev().take_while(|&c| c == '\n').count()
}

/// Strip leading line breaks (`\n`, `\r`) only.
pub fn trim_leading_newlines(text: &str) -> &str {
    text.trim_start_matches(['\n', '\r'])
}
