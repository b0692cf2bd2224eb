//! Payload resolution
//!
//! Turns a validated generation request into the target string the QR code
//! should point at: the trimmed text itself, or the public URL of an uploaded
//! file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::error::AppError;
use crate::model::{Mode, UploadedFile};

pub struct PayloadResolver {
    upload_dir: PathBuf,
    base_url: String,
    /// Last filename prefix handed out, so prefixes strictly increase
    last_prefix: AtomicI64,
}

impl PayloadResolver {
    pub fn new(upload_dir: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            upload_dir,
            base_url: base_url.into(),
            last_prefix: AtomicI64::new(0),
        }
    }

    /// Resolves the target for `mode`.
    ///
    /// In file mode the bytes are written to the upload directory before
    /// returning. The file is not removed if a later step fails.
    pub async fn resolve(
        &self,
        mode: Mode,
        content: Option<&str>,
        file: Option<&UploadedFile>,
    ) -> Result<String, AppError> {
        match mode {
            Mode::Text | Mode::Link => content
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::validation("Content missing")),
            Mode::File => {
                let file = file.ok_or_else(|| AppError::validation("File missing"))?;
                self.store_upload(file).await
            }
        }
    }

    async fn store_upload(&self, file: &UploadedFile) -> Result<String, AppError> {
        let filename = format!("{}_{}", self.next_prefix(), sanitize_filename(&file.file_name));

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(AppError::Upload)?;
        tokio::fs::write(self.upload_dir.join(&filename), &file.bytes)
            .await
            .map_err(AppError::Upload)?;

        tracing::debug!(filename = %filename, bytes = file.bytes.len(), "stored upload");

        Ok(format!("{}/uploads/{}", self.base_url, filename))
    }

    /// Current time in milliseconds, bumped past the previous prefix if needed.
    fn next_prefix(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_prefix.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_prefix.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Replaces every character outside `[A-Za-z0-9.]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}
