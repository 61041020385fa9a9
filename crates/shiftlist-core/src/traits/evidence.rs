//! Where completion photos go.

use crate::error::Result;

/// Binary payload submitted with a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl EvidenceUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name: None,
        }
    }
}

pub trait EvidenceSink: Send + Sync {
    /// Persist the payload and return a stable reference to store on the instance.
    fn store(&self, upload: &EvidenceUpload) -> Result<String>;

    /// Remove a previously stored payload whose transition did not commit.
    fn discard(&self, reference: &str) -> Result<()>;
}
