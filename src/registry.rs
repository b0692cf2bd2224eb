//! Short-link registry
//!
//! Registers owned QR codes under a short id, resolves short ids back to their
//! targets while counting scans, and handles owner-initiated deletion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};

use crate::auth::Owner;
use crate::database::{InsertOutcome, QrStore, StoreError};
use crate::error::AppError;
use crate::model::QrRecord;
use crate::render::{data_url, RenderStyle, Renderer};

pub const SHORT_ID_LEN: usize = 8;
pub const RECORD_ID_LEN: usize = 16;

/// Attempts at finding a free short id before giving up
const MAX_ID_ATTEMPTS: usize = 8;

/// Outcome of registering a resolved target
#[derive(Debug, Clone)]
pub struct Registration {
    /// String to encode into the QR image
    pub payload: String,
    /// The persisted record, for owned generations only
    pub record: Option<QrRecord>,
}

pub struct ShortLinkRegistry {
    store: QrStore,
    renderer: Arc<dyn Renderer>,
    base_url: String,
}

fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl ShortLinkRegistry {
    pub fn new(store: QrStore, renderer: Arc<dyn Renderer>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            renderer,
            base_url: base_url.into(),
        }
    }

    pub fn redirect_url(&self, short_id: &str) -> String {
        format!("{}/r/{}", self.base_url, short_id)
    }

    /// Registers `target_url` for `owner`.
    ///
    /// Anonymous generations are not persisted and encode the target directly.
    /// Owned generations get a fresh short id and encode the redirect URL.
    pub fn register(
        &self,
        target_url: &str,
        owner: Option<&Owner>,
        title: &str,
    ) -> Result<Registration, AppError> {
        let Some(owner) = owner else {
            return Ok(Registration {
                payload: target_url.to_string(),
                record: None,
            });
        };

        for _ in 0..MAX_ID_ATTEMPTS {
            let short_id = random_token(SHORT_ID_LEN);
            if self.store.short_id_exists(&short_id)? {
                tracing::debug!(short_id = %short_id, "short id collision, retrying");
                continue;
            }

            let payload = self.redirect_url(&short_id);
            let thumbnail = self.renderer.render_image(&payload, &RenderStyle::default())?;

            let now = Utc::now();
            let record = QrRecord {
                id: random_token(RECORD_ID_LEN),
                owner_id: Some(owner.0.clone()),
                title: title.to_string(),
                target_url: target_url.to_string(),
                short_id,
                qr_image: data_url("image/png", &thumbnail),
                scans: 0,
                scan_history: Vec::new(),
                created_at: now,
                updated_at: now,
            };

            // Another request may have claimed the id since the check above
            match self.store.insert(&record)? {
                InsertOutcome::Inserted => {
                    tracing::info!(
                        id = %record.id,
                        short_id = %record.short_id,
                        owner = %owner.0,
                        "registered QR code"
                    );
                    return Ok(Registration {
                        payload,
                        record: Some(record),
                    });
                }
                InsertOutcome::Conflict => continue,
            }
        }

        Err(StoreError::ShortIdExhausted.into())
    }

    /// Records a scan of `short_id` and returns the target to redirect to.
    pub fn resolve(&self, short_id: &str) -> Result<String, AppError> {
        self.resolve_at(short_id, Utc::now())
    }

    pub fn resolve_at(&self, short_id: &str, at: DateTime<Utc>) -> Result<String, AppError> {
        match self.store.record_scan(short_id, at)? {
            Some(record) => {
                tracing::debug!(short_id = %short_id, scans = record.scans, "recorded scan");
                Ok(record.target_url)
            }
            None => Err(AppError::not_found()),
        }
    }

    /// All records of `owner`, newest first.
    pub fn list(&self, owner: &Owner) -> Result<Vec<QrRecord>, AppError> {
        Ok(self.store.list_by_owner(&owner.0)?)
    }

    /// Deletes record `id` if `owner` owns it.
    ///
    /// A record owned by someone else is reported exactly like a missing one.
    pub fn delete(&self, id: &str, owner: &Owner) -> Result<(), AppError> {
        if self.store.delete_owned(id, &owner.0)? {
            tracing::info!(id = %id, owner = %owner.0, "deleted QR code");
            Ok(())
        } else {
            Err(AppError::not_found())
        }
    }
}
