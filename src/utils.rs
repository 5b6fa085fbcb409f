// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Small helpers shared by the library and the CLI.

/// Mask a credential (bearer token, password) for logs and status output.
///
/// Keeps the first `visible_prefix` characters and replaces the rest with
/// "...". Short inputs are masked too, so their length is not revealed.
///
/// # Examples
///
/// ```
/// use docuverse::utils::mask_sensitive;
///
/// assert_eq!(mask_sensitive("eyJhbGciOiJIUzI1NiJ9.payload", 6), "eyJhbG...");
/// ```
pub fn mask_sensitive(input: &str, visible_prefix: usize) -> String {
    let prefix: String = input.chars().take(visible_prefix).collect();
    if prefix.len() == input.len() {
        return "...".to_string();
    }
    format!("{}...", prefix)
}

/// Shorten `text` to at most `max_chars` characters for one-line display.
pub fn truncate_line(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }
    let kept: String = first_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
