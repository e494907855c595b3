//! Turn an edited position sequence into the stored set
//!
//! Uploads run before anything is written. Everything uploaded is tracked
//! in the caller's [`PendingImages`], which removes it again if the commit
//! or the following row write fails.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::blob_store::{ImageChange, UploadConstraints};
use crate::error::{CmsError, FieldErrors};
use crate::services::media::PendingImages;

use super::registry::PositionRegistry;
use super::{PositionEdit, StoredPosition};

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Full replacement set, ascending by order
    pub positions: Vec<StoredPosition>,
    /// References created by this commit (not previously stored)
    pub uploaded: Vec<String>,
}

/// Build the stored set that replaces `previous`.
///
/// - every in-range edit becomes a stored position, even when empty
/// - orders outside the registry and repeated orders are dropped
/// - a new image is uploaded and its reference stored
/// - a kept image is the one the editor was shown for that order
/// - a cleared image is dropped
pub async fn commit(
    registry: &PositionRegistry,
    edited: Vec<PositionEdit>,
    previous: &[StoredPosition],
    pending: &mut PendingImages<'_>,
    constraints: &UploadConstraints,
) -> Result<CommitOutcome, CmsError> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(registry.len());
    for edit in edited {
        if !registry.contains(edit.order) {
            debug!(order = edit.order, "Dropping edit outside the registry");
            continue;
        }
        if !seen.insert(edit.order) {
            warn!(order = edit.order, "Dropping repeated edit for the same position");
            continue;
        }
        accepted.push(edit);
    }
    accepted.sort_by_key(|e| e.order);

    // Reject bad files before touching storage
    let mut errors = FieldErrors::new();
    for edit in &accepted {
        if let ImageChange::Replace(upload) = &edit.image {
            if let Err(message) = constraints.check(upload) {
                errors.add(format!("positions.{}.image", edit.order), message);
            }
        }
    }
    errors.into_result()?;

    // Same first-entry-wins rule as reconcile, image or not
    let mut previous_images: HashMap<i64, Option<&str>> = HashMap::new();
    for stored in previous {
        if registry.contains(stored.order) {
            previous_images
                .entry(stored.order)
                .or_insert(stored.image.as_deref());
        }
    }

    let mut uploaded = Vec::new();
    let mut positions = Vec::with_capacity(accepted.len());
    for edit in accepted {
        let image = match &edit.image {
            ImageChange::Keep => previous_images
                .get(&edit.order)
                .copied()
                .flatten()
                .map(str::to_string),
            ImageChange::Clear => None,
            ImageChange::Replace(upload) => match pending.store(upload, constraints).await {
                Ok(result) => {
                    if !result.already_existed {
                        uploaded.push(result.reference.clone());
                    }
                    Some(result.reference)
                }
                Err(e) => {
                    warn!(order = edit.order, error = %e, "Image upload failed, aborting structure save");
                    return Err(match e {
                        CmsError::Validation(fields) => {
                            let mut prefixed = FieldErrors::new();
                            prefixed.merge_prefixed(&format!("positions.{}", edit.order), fields);
                            CmsError::Validation(prefixed)
                        }
                        other => other,
                    });
                }
            },
        };

        positions.push(StoredPosition {
            order: edit.order,
            title: clean(edit.title),
            name: clean(edit.name),
            image,
        });
    }

    Ok(CommitOutcome { positions, uploaded })
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::test_images::png;
    use crate::blob_store::{ImageStore, ImageUpload, StoreResult};
    use crate::db::CmsDb;
    use crate::services::media::MediaGate;
    use crate::structure::reconcile;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// In-memory image store that can be told to fail on a given upload
    #[derive(Default)]
    struct FakeImages {
        stored: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
        fail_on_call: Option<usize>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ImageStore for FakeImages {
        async fn store(
            &self,
            upload: &ImageUpload,
            _constraints: &UploadConstraints,
        ) -> Result<StoreResult, CmsError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.fail_on_call == Some(*calls) {
                return Err(CmsError::Blob("disk full".into()));
            }
            let reference = format!("ref-{}", upload.data[upload.data.len() - 1]);
            self.stored.lock().unwrap().push(reference.clone());
            Ok(StoreResult {
                reference,
                size_bytes: upload.data.len() as u64,
                already_existed: false,
            })
        }

        async fn delete(&self, reference: &str) -> Result<(), CmsError> {
            self.deleted.lock().unwrap().push(reference.to_string());
            Ok(())
        }

        fn resolve(&self, reference: &str) -> String {
            format!("/media/{reference}")
        }
    }

    fn gate(images: Arc<FakeImages>) -> MediaGate {
        MediaGate::new(Arc::new(CmsDb::open_in_memory().unwrap()), images)
    }

    fn registry(n: usize) -> PositionRegistry {
        PositionRegistry::from_labels((1..=n).map(|i| format!("Role {i}"))).unwrap()
    }

    fn constraints() -> UploadConstraints {
        UploadConstraints::images(1024)
    }

    fn stored(order: i64, name: &str, image: Option<&str>) -> StoredPosition {
        StoredPosition {
            order,
            title: None,
            name: Some(name.to_string()),
            image: image.map(str::to_string),
        }
    }

    fn edit(order: i64, name: &str) -> PositionEdit {
        PositionEdit {
            order,
            title: None,
            name: Some(name.to_string()),
            image: ImageChange::Keep,
        }
    }

    async fn run(
        registry: &PositionRegistry,
        edits: Vec<PositionEdit>,
        previous: &[StoredPosition],
        images: Arc<FakeImages>,
    ) -> Result<CommitOutcome, CmsError> {
        let gate = gate(images);
        let mut pending = gate.begin();
        let result = commit(registry, edits, previous, &mut pending, &constraints()).await;
        pending.finish(result).await
    }

    #[tokio::test]
    async fn test_commit_of_reconciled_full_set_is_identity() {
        let registry = registry(3);
        let previous = vec![
            stored(1, "Ana", Some("img-1")),
            stored(2, "Budi", None),
            stored(3, "Citra", Some("img-3")),
        ];

        let edits = reconcile(&registry, previous.clone())
            .into_iter()
            .map(PositionEdit::from)
            .collect();
        let outcome = run(&registry, edits, &previous, Arc::default()).await.unwrap();

        assert_eq!(outcome.positions, previous);
        assert!(outcome.uploaded.is_empty());
    }

    #[tokio::test]
    async fn test_kept_image_follows_first_stored_entry_per_order() {
        let registry = registry(2);
        let previous = vec![
            stored(1, "first", None),
            StoredPosition {
                order: 1,
                image: Some("dup-img".into()),
                ..Default::default()
            },
            stored(2, "Budi", Some("img-2")),
        ];

        let edits = reconcile(&registry, previous.clone())
            .into_iter()
            .map(PositionEdit::from)
            .collect();
        let outcome = run(&registry, edits, &previous, Arc::default()).await.unwrap();

        assert_eq!(outcome.positions[0].name.as_deref(), Some("first"));
        assert_eq!(outcome.positions[0].image, None);
        assert_eq!(outcome.positions[1].image.as_deref(), Some("img-2"));
    }

    #[tokio::test]
    async fn test_missing_new_image_keeps_previous_reference() {
        let registry = registry(2);
        let previous = vec![stored(1, "Ana", Some("img-1")), stored(2, "Budi", Some("img-2"))];

        let mut with_image = edit(2, "Budi");
        with_image.image = ImageChange::Replace(ImageUpload::new("image/png", png(9)));

        let outcome = run(
            &registry,
            vec![edit(1, "Ana Renamed"), with_image],
            &previous,
            Arc::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.positions[0].image.as_deref(), Some("img-1"));
        assert_eq!(outcome.positions[0].name.as_deref(), Some("Ana Renamed"));
        assert_eq!(outcome.positions[1].image.as_deref(), Some("ref-9"));
        assert_eq!(outcome.uploaded, vec!["ref-9".to_string()]);
    }

    #[tokio::test]
    async fn test_cleared_image_is_dropped() {
        let registry = registry(1);
        let previous = vec![stored(1, "Ana", Some("img-1"))];

        let mut cleared = edit(1, "Ana");
        cleared.image = ImageChange::Clear;

        let outcome = run(&registry, vec![cleared], &previous, Arc::default()).await.unwrap();
        assert_eq!(outcome.positions, vec![stored(1, "Ana", None)]);
    }

    #[tokio::test]
    async fn test_shrunk_registry_drops_higher_orders() {
        let previous: Vec<StoredPosition> =
            (1..=5).map(|i| stored(i, &format!("p{i}"), None)).collect();
        let edits: Vec<PositionEdit> = (1..=5).map(|i| edit(i, &format!("p{i}"))).collect();

        let outcome = run(&registry(3), edits, &previous, Arc::default()).await.unwrap();

        let orders: Vec<i64> = outcome.positions.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_entries_are_still_stored() {
        let blank = PositionEdit {
            order: 1,
            title: Some("   ".into()),
            name: None,
            image: ImageChange::Keep,
        };
        let outcome = run(&registry(1), vec![blank], &[], Arc::default()).await.unwrap();

        assert_eq!(
            outcome.positions,
            vec![StoredPosition { order: 1, ..Default::default() }]
        );
    }

    #[tokio::test]
    async fn test_failed_upload_aborts_and_cleans_up() {
        let mut first = edit(1, "Ana");
        first.image = ImageChange::Replace(ImageUpload::new("image/png", png(1)));
        let mut second = edit(2, "Budi");
        second.image = ImageChange::Replace(ImageUpload::new("image/png", png(2)));

        let images = Arc::new(FakeImages {
            fail_on_call: Some(2),
            ..Default::default()
        });
        let err = run(&registry(2), vec![first, second], &[], images.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, CmsError::Blob(_)));
        assert_eq!(*images.deleted.lock().unwrap(), vec!["ref-1".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_image_rejected_before_any_upload() {
        let mut bad = edit(2, "Budi");
        bad.image = ImageChange::Replace(ImageUpload::new("image/png", b"plain text".to_vec()));
        let mut good = edit(1, "Ana");
        good.image = ImageChange::Replace(ImageUpload::new("image/png", png(1)));

        let images = Arc::new(FakeImages::default());
        let err = run(&registry(2), vec![good, bad], &[], images.clone())
            .await
            .unwrap_err();

        match err {
            CmsError::Validation(fields) => assert!(fields.get("positions.2.image").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(images.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_output_sorted_and_deduplicated() {
        let outcome = run(
            &registry(3),
            vec![edit(3, "c"), edit(1, "a"), edit(3, "c2"), edit(0, "zero")],
            &[],
            Arc::default(),
        )
        .await
        .unwrap();

        let names: Vec<&str> = outcome
            .positions
            .iter()
            .map(|p| p.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
