//! Error types and error handling

use std::path::PathBuf;
use thiserror::Error;

/// Rendering error type
///
/// Compile-time variants (`Read`, `Walk`, `Parse`) are returned when a
/// template set is built; the remaining variants are per-request and end up
/// as a 500 response when raised from a writing render method.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template file could not be read
    #[error("failed to read template '{}': {source}", path.display())]
    Read {
        /// Path of the unreadable file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Template directory could not be walked
    #[error("failed to walk templates directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Template failed to parse
    #[error("failed to parse template '{name}': {source}")]
    Parse {
        /// Template name the file was registered under
        name: String,
        /// Syntax error reported by the engine
        source: minijinja::Error,
    },

    /// Configured delimiters were rejected by the engine
    #[error("invalid template delimiters '{left}' '{right}': {source}")]
    InvalidDelims {
        /// Left delimiter
        left: String,
        /// Right delimiter
        right: String,
        /// Engine error
        source: minijinja::Error,
    },

    /// No compiled template set exists under the requested name
    #[error("template \"{template}\" is undefined")]
    UndefinedSet {
        /// Template that was requested
        template: String,
    },

    /// Template execution failed
    #[error("{0}")]
    Execute(#[from] minijinja::Error),

    /// JSON marshaling failed
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// XML marshaling failed
    #[error("{0}")]
    Xml(#[from] quick_xml::DeError),
}

impl RenderError {
    /// Whether the error was raised while compiling a template set
    #[must_use]
    pub const fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::Walk(_) | Self::Parse { .. } | Self::InvalidDelims { .. }
        )
    }
}
