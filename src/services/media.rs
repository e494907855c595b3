//! Image fields of content records
//!
//! Saving a record with images happens in three steps: decode and check
//! every submitted file, upload them, then write the row. Images uploaded
//! by a save whose row write fails are removed again, unless a stored
//! record already points at the same content.
//!
//! Blobs are content addressed, so two saves can share one file. Every save
//! holds a shared [`MediaGate`] guard from its first upload until its row is
//! written; cleanup takes the gate exclusively before it checks references,
//! so no save sits between uploading and committing while a blob is removed.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

pub use crate::blob_store::ImageChange;
use crate::blob_store::{ImageStore, ImageUpload, StoreResult, UploadConstraints};
use crate::db::{media_refs, CmsDb};
use crate::error::{CmsError, FieldErrors};
use crate::views::ImageInput;

/// Decode and check a submitted image field, recording problems under `field`
pub fn decode(
    errors: &mut FieldErrors,
    field: &str,
    input: ImageInput,
    constraints: &UploadConstraints,
) -> ImageChange {
    match input {
        ImageInput::Keep => ImageChange::Keep,
        ImageInput::Clear => ImageChange::Clear,
        ImageInput::Replace(view) => match view.decode() {
            Ok(upload) => {
                if let Err(message) = constraints.check(&upload) {
                    errors.add(field, message);
                }
                ImageChange::Replace(upload)
            }
            Err(message) => {
                errors.add(field, message);
                ImageChange::Keep
            }
        },
    }
}

/// Serializes blob cleanup against saves in flight
pub struct MediaGate {
    lock: RwLock<()>,
    db: Arc<CmsDb>,
    images: Arc<dyn ImageStore>,
}

impl MediaGate {
    pub fn new(db: Arc<CmsDb>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            lock: RwLock::new(()),
            db,
            images,
        }
    }

    /// Start tracking the uploads of one save
    pub fn begin(&self) -> PendingImages<'_> {
        PendingImages {
            gate: self,
            guard: None,
            created: Vec::new(),
        }
    }

    /// Remove `references` no stored record uses. Best effort.
    pub async fn discard(&self, references: &[String]) {
        if references.is_empty() {
            return;
        }
        let _exclusive = self.lock.write().await;

        let in_use = match self.db.with_conn(|conn| media_refs::referenced(conn, references)) {
            Ok(in_use) => in_use,
            Err(e) => {
                warn!(error = %e, count = references.len(), "Could not check image references, keeping uploads");
                return;
            }
        };

        for reference in references {
            if in_use.contains(reference) {
                debug!(reference = %reference, "Upload shared with a stored record, kept");
                continue;
            }
            if let Err(e) = self.images.delete(reference).await {
                warn!(reference = %reference, error = %e, "Failed to remove orphaned upload");
            }
        }
    }
}

/// Tracks the images one save has uploaded
pub struct PendingImages<'a> {
    gate: &'a MediaGate,
    guard: Option<RwLockReadGuard<'a, ()>>,
    created: Vec<String>,
}

impl<'a> PendingImages<'a> {
    /// Upload one image. The caller is responsible for calling [`finish`](Self::finish).
    pub async fn store(
        &mut self,
        upload: &ImageUpload,
        constraints: &UploadConstraints,
    ) -> Result<StoreResult, CmsError> {
        if self.guard.is_none() {
            self.guard = Some(self.gate.lock.read().await);
        }
        let result = self.gate.images.store(upload, constraints).await?;
        if !result.already_existed {
            self.created.push(result.reference.clone());
        }
        Ok(result)
    }

    /// Apply `change` to the `current` reference, uploading if needed.
    ///
    /// On failure everything this save uploaded so far is removed.
    pub async fn apply(
        &mut self,
        field: &str,
        change: ImageChange,
        current: Option<String>,
        constraints: &UploadConstraints,
    ) -> Result<Option<String>, CmsError> {
        let upload = match change {
            ImageChange::Keep => return Ok(current),
            ImageChange::Clear => return Ok(None),
            ImageChange::Replace(upload) => upload,
        };

        match self.store(&upload, constraints).await {
            Ok(result) => {
                debug!(field = %field, reference = %result.reference, "Image field replaced");
                Ok(Some(result.reference))
            }
            Err(e) => {
                self.abort().await;
                Err(match e {
                    CmsError::Validation(fields) => CmsError::Validation(fields.rekey(field)),
                    other => other,
                })
            }
        }
    }

    /// Pass `result` through, removing this save's uploads when it failed
    pub async fn finish<T>(mut self, result: Result<T, CmsError>) -> Result<T, CmsError> {
        if result.is_err() {
            self.abort().await;
        }
        result
    }

    async fn abort(&mut self) {
        // Our own shared guard would block the exclusive cleanup
        self.guard = None;
        let created = std::mem::take(&mut self.created);
        if !created.is_empty() {
            warn!(count = created.len(), "Save failed, removing its new uploads");
        }
        self.gate.discard(&created).await;
    }
}
