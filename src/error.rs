use thiserror::Error;

/// Main error type for the enrichment engine.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("{0}")]
    WithContextError(String),

    /// No spreadsheet could be resolved from the supplied location.
    #[error("No import file found at '{0}'")]
    InputNotFound(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("{0}")]
    RecordError(#[from] crate::record::RecordError),
}

impl EnrichError {
    /// Returns true when the failure means a required input was never found,
    /// as opposed to an input that exists but could not be read or written.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::InputNotFound(_))
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, EnrichError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e {
            // keep lookup failures recognizable
            EnrichError::InputNotFound(_) => e,
            e => EnrichError::WithContextError(format!("{}: {}", message, e)),
        })
    }
}
