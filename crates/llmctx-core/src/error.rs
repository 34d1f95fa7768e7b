//! Error types for context extraction.

use thiserror::Error;

/// Error conditions raised by the runtime and the standard verb library.
///
/// Presenters and refiners swallow their own failures into artifact
/// metadata (`<name>_error` keys); the variants here are the ones that
/// actually travel: loader failures (caught by fallback pipelines),
/// invalid DSL values raised by modifiers, and caller-side mistakes at
/// adapter time.
#[derive(Error, Debug)]
pub enum LlmctxError {
    /// File I/O error while reading an input or writing a temp file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (metadata or adapter output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A DSL command carried a value the verb cannot honor.
    ///
    /// Raised by modifiers (e.g. a degenerate crop box); the offending
    /// key and value are preserved for the caller.
    #[error("invalid value for [{key}:{value}]: {reason}")]
    InvalidValue {
        /// DSL command key.
        key: String,
        /// Verbatim value from the locator string.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A loader matched its predicate but could not decode the input.
    #[error("loader {verb} failed on '{path}': {message}")]
    Load {
        /// Loader verb name.
        verb: String,
        /// Input path or URL.
        path: String,
        /// Decoder diagnostic.
        message: String,
    },

    /// A required external collaborator is missing or failed.
    #[error("collaborator {name} unavailable: {message}")]
    Collaborator {
        /// Collaborator name (e.g. `http`, `rasterizer`, `ocr`).
        name: String,
        /// What went wrong or what to install.
        message: String,
    },

    /// A verb name was not found in any registry.
    #[error("no verb '{0}' registered")]
    UnknownVerb(String),

    /// Pipeline-fatal condition: no branch could produce an artifact.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Parser or decoder error from a format-specific collaborator.
    #[error("parser error: {0}")]
    Parser(#[from] anyhow::Error),
}

impl LlmctxError {
    /// Shorthand for [`LlmctxError::InvalidValue`].
    pub fn invalid_value(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`LlmctxError::Load`].
    pub fn load(verb: &str, path: &str, message: impl Into<String>) -> Self {
        Self::Load {
            verb: verb.to_string(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for [`LlmctxError::Collaborator`].
    pub fn collaborator(name: &str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Type alias for [`Result<T, LlmctxError>`].
pub type Result<T> = std::result::Result<T, LlmctxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display() {
        let err = LlmctxError::invalid_value("crop", "10,10,10,40", "x2 must exceed x1");
        let display = format!("{err}");
        assert_eq!(
            display,
            "invalid value for [crop:10,10,10,40]: x2 must exceed x1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LlmctxError = io_err.into();
        match err {
            LlmctxError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("expected Io variant"),
        }
    }

    #[test]
    fn test_load_error_carries_path() {
        let err = LlmctxError::load("pdf_document", "broken.pdf", "xref table corrupt");
        assert!(format!("{err}").contains("broken.pdf"));
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(LlmctxError::UnknownVerb("frobnicate".into()))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        match outer() {
            Err(LlmctxError::UnknownVerb(name)) => assert_eq!(name, "frobnicate"),
            _ => panic!("expected UnknownVerb to propagate"),
        }
    }
}
