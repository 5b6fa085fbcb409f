// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Consistent error formatting for docuverse.
//!
//! Failures shown to the user carry a title, the likely causes and concrete
//! next steps, so that a rejected login or an unreachable service tells the
//! user what to run next.

use std::fmt;

/// Closing line of every formatted error.
pub const HELP_HINT: &str = "Run 'docuverse --help' for usage.";

/// Formats an error message with title, causes, fixes, and help hint.
///
/// # Example
///
/// ```
/// use docuverse::error::format_error;
///
/// let error = format_error(
///     "Not logged in",
///     &["No session was saved on this machine"],
///     &["Log in: docuverse login <username>"],
/// );
/// assert!(error.starts_with("[✗] Not logged in"));
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = String::new();

    output.push_str(&format!("[✗] {}\n\n", title));

    if !causes.is_empty() {
        output.push_str("Possible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
        output.push('\n');
    }

    if !fixes.is_empty() {
        output.push_str("Try these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
        output.push('\n');
    }

    output.push_str(HELP_HINT);
    output
}

/// Formats a simple error with just a title and help hint.
pub fn format_simple_error(title: &str) -> String {
    format!("[✗] {}\n\n{}", title, HELP_HINT)
}

/// Builder for constructing formatted error messages.
///
/// # Example
///
/// ```
/// use docuverse::error::ErrorBuilder;
///
/// let error = ErrorBuilder::new("Could not reach the DocuVerse service")
///     .cause("The service is starting up")
///     .fix("Retry in a minute")
///     .build();
/// assert!(error.contains("Retry in a minute"));
/// ```
#[derive(Debug, Clone)]
pub struct ErrorBuilder {
    title: String,
    causes: Vec<String>,
    fixes: Vec<String>,
}

impl ErrorBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            causes: Vec::new(),
            fixes: Vec::new(),
        }
    }

    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    pub fn build(&self) -> String {
        let causes: Vec<&str> = self.causes.iter().map(|s| s.as_str()).collect();
        let fixes: Vec<&str> = self.fixes.iter().map(|s| s.as_str()).collect();
        format_error(&self.title, &causes, &fixes)
    }
}

impl fmt::Display for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}
