//! Completion photos stored under the configured upload dir.

use std::path::{Path, PathBuf};

use shiftlist_core::config::EvidenceConfig;
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::traits::{EvidenceSink, EvidenceUpload};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub struct FsEvidenceSink {
    dir: PathBuf,
    max_bytes: usize,
    allowed_types: Vec<String>,
}

impl FsEvidenceSink {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize, allowed_types: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
            allowed_types,
        }
    }

    pub fn from_config(config: &EvidenceConfig) -> Self {
        Self::new(
            config.expanded_dir(),
            config.max_bytes,
            config.allowed_types.clone(),
        )
    }

    /// Reject empty, oversized, or non-image payloads.
    pub fn validate(&self, upload: &EvidenceUpload) -> Result<()> {
        if upload.bytes.is_empty() {
            return Err(ShiftlistError::invalid("evidence upload is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(ShiftlistError::invalid(format!(
                "evidence is {} bytes, limit is {}",
                upload.bytes.len(),
                self.max_bytes
            )));
        }
        let content_type = upload.content_type.trim().to_ascii_lowercase();
        if !self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&content_type)) {
            return Err(ShiftlistError::invalid(format!(
                "evidence type '{}' not allowed",
                upload.content_type
            )));
        }
        if let Some(ext) = upload.file_name.as_deref().and_then(extension_of)
            && !IMAGE_EXTENSIONS.contains(&ext.as_str())
        {
            return Err(ShiftlistError::invalid(format!(
                "evidence file extension '.{ext}' not allowed"
            )));
        }
        Ok(())
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// File extension to store the payload under: the uploaded name's, else one derived from the type.
fn target_extension(upload: &EvidenceUpload) -> String {
    if let Some(ext) = upload.file_name.as_deref().and_then(extension_of) {
        return ext;
    }
    match upload.content_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png".into(),
        "image/gif" => "gif".into(),
        _ => "jpg".into(),
    }
}

impl EvidenceSink for FsEvidenceSink {
    fn store(&self, upload: &EvidenceUpload) -> Result<String> {
        self.validate(upload)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ShiftlistError::dependency(format!("create upload dir {}: {e}", self.dir.display()))
        })?;

        let name = format!(
            "task-{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            rand::random::<u32>() % 1_000_000_000,
            target_extension(upload)
        );
        let path = self.dir.join(&name);
        std::fs::write(&path, &upload.bytes)
            .map_err(|e| ShiftlistError::dependency(format!("write {}: {e}", path.display())))?;
        tracing::debug!("📷 Evidence stored: {} ({} bytes)", name, upload.bytes.len());
        Ok(name)
    }

    fn discard(&self, reference: &str) -> Result<()> {
        if reference.is_empty() || reference.contains(['/', '\\']) || reference.starts_with('.') {
            return Err(ShiftlistError::invalid(format!(
                "invalid evidence reference '{reference}'"
            )));
        }
        match std::fs::remove_file(self.dir.join(reference)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShiftlistError::dependency(format!("remove {reference}: {e}"))),
        }
    }
}
