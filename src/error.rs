use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the fetch, build and generate actions.
///
/// Malformed order data never shows up here: the normalizers default
/// missing or garbage values instead of failing.
#[derive(Debug, Error)]
pub enum BolError {
    /// The order API answered with something other than 200.
    #[error("Order API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Order API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expect.
    #[error("Could not decode order API response: {0}")]
    Decode(String),

    #[error("TEAPPLIX_TOKEN is not set")]
    MissingToken,

    /// Fatal for a generation run.
    #[error("BOL template not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    /// Bulk edits always reject unknown keys; generation only under `reject`.
    #[error("Unknown warehouse key: {0}")]
    UnknownWarehouse(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A field the form filler could not write. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field {}: {}", self.field, self.message)
    }
}
