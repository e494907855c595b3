//! Structure service - the organization chart editor
//!
//! Reading reconciles the stored positions against the registry. Saving
//! commits the edited sequence (uploads first), then replaces the stored set
//! in one transaction. If that write fails the new uploads no other record
//! uses are removed, so a failed save leaves both the row and the media
//! directory as they were.

use std::sync::Arc;

use tracing::info;

use crate::blob_store::UploadConstraints;
use crate::db::org_structure;
use crate::db::CmsDb;
use crate::error::{CmsError, FieldErrors};
use crate::structure::{commit, reconcile, PositionEdit, PositionRegistry, ReconciledPosition};
use crate::views::StructureInputView;

use super::events::{ContentEvent, EventBus};
use super::media::{self, MediaGate};
use super::validate::MAX_TITLE_LEN;

/// The chart as the editor and the profile page see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureEditor {
    pub section_title: String,
    /// Exactly one entry per registry position
    pub positions: Vec<ReconciledPosition>,
    pub updated_at: Option<String>,
}

pub struct StructureService {
    db: Arc<CmsDb>,
    media: Arc<MediaGate>,
    events: Arc<EventBus>,
    registry: Arc<PositionRegistry>,
    constraints: UploadConstraints,
}

impl StructureService {
    pub fn new(
        db: Arc<CmsDb>,
        media: Arc<MediaGate>,
        events: Arc<EventBus>,
        registry: Arc<PositionRegistry>,
        constraints: UploadConstraints,
    ) -> Self {
        Self {
            db,
            media,
            events,
            registry,
            constraints,
        }
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    /// Load and reconcile the stored chart
    pub fn load(&self) -> Result<StructureEditor, CmsError> {
        let stored = self.db.with_conn(org_structure::load)?;
        Ok(StructureEditor {
            section_title: stored.section_title,
            positions: reconcile(&self.registry, stored.positions),
            updated_at: stored.updated_at,
        })
    }

    /// Replace the stored chart with the submitted one
    pub async fn save(&self, input: StructureInputView) -> Result<StructureEditor, CmsError> {
        let previous = self.db.with_conn(org_structure::load)?;

        let mut errors = FieldErrors::new();
        let section_title = match input.section_title.as_deref().map(str::trim) {
            None => previous.section_title.clone(),
            Some("") => {
                errors.add("sectionTitle", "sectionTitle is required");
                String::new()
            }
            Some(title) if title.chars().count() > MAX_TITLE_LEN => {
                errors.add(
                    "sectionTitle",
                    format!("sectionTitle must be at most {} characters", MAX_TITLE_LEN),
                );
                String::new()
            }
            Some(title) => title.to_string(),
        };

        let mut edits = Vec::with_capacity(input.positions.len());
        for position in input.positions {
            let image = media::decode(
                &mut errors,
                &format!("positions.{}.image", position.order),
                position.image,
                &self.constraints,
            );
            edits.push(PositionEdit {
                order: position.order,
                title: position.title,
                name: position.name,
                image,
            });
        }
        errors.into_result()?;

        let mut pending = self.media.begin();
        let committed = commit(
            &self.registry,
            edits,
            &previous.positions,
            &mut pending,
            &self.constraints,
        )
        .await;
        let written = committed.and_then(|outcome| {
            self.db
                .with_conn_mut(|conn| org_structure::save(conn, &section_title, &outcome.positions))
                .map(|saved| (outcome, saved))
        });
        let (outcome, saved) = pending.finish(written).await?;

        info!(
            positions = outcome.positions.len(),
            uploaded = outcome.uploaded.len(),
            "Saved organization structure"
        );
        self.events.emit(ContentEvent::StructureSaved {
            positions: outcome.positions.len(),
            uploaded: outcome.uploaded.len(),
        });

        Ok(StructureEditor {
            section_title: saved.section_title,
            positions: reconcile(&self.registry, saved.positions),
            updated_at: saved.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::test_images::png;
    use crate::blob_store::BlobStore;
    use crate::views::{ImageInput, PositionInputView, UploadView};
    use base64::Engine;
    use tempfile::TempDir;

    async fn service(temp_dir: &TempDir, registry: PositionRegistry) -> (StructureService, Arc<BlobStore>) {
        let db = Arc::new(CmsDb::open_in_memory().unwrap());
        let images = Arc::new(BlobStore::new(temp_dir.path(), "http://localhost").await.unwrap());
        let service = StructureService::new(
            db.clone(),
            Arc::new(MediaGate::new(db, images.clone())),
            Arc::new(EventBus::new()),
            Arc::new(registry),
            UploadConstraints::images(1024),
        );
        (service, images)
    }

    fn position(order: i64, name: Option<&str>, image: Option<Vec<u8>>) -> PositionInputView {
        PositionInputView {
            order,
            title: None,
            name: name.map(str::to_string),
            image: match image {
                Some(data) => ImageInput::Replace(UploadView {
                    mime_type: "image/png".into(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                }),
                None => ImageInput::Keep,
            },
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_full_roster() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, PositionRegistry::school_default()).await;

        let editor = service.load().unwrap();
        assert_eq!(editor.positions.len(), 18);
        assert_eq!(editor.positions[0].label, "Kepala Sekolah");
        assert!(editor.positions.iter().all(|p| p.name.is_none()));
    }

    #[tokio::test]
    async fn test_save_then_load_reflects_submission() {
        let temp_dir = TempDir::new().unwrap();
        let registry = PositionRegistry::from_labels(["A", "B", "C"]).unwrap();
        let (service, images) = service(&temp_dir, registry).await;

        let saved = service
            .save(StructureInputView {
                section_title: Some("Struktur Organisasi SMK".into()),
                positions: vec![
                    position(3, Some("Citra"), None),
                    position(1, Some("Budi"), Some(png(1))),
                    position(9, Some("Tidak ada"), None),
                ],
            })
            .await
            .unwrap();

        assert_eq!(saved.section_title, "Struktur Organisasi SMK");
        let names: Vec<_> = saved.positions.iter().map(|p| p.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Budi"), None, Some("Citra")]);
        let image = saved.positions[0].image.clone().unwrap();
        assert!(images.exists(&image).await);

        // A later save without an image keeps the stored one
        let again = service
            .save(StructureInputView {
                section_title: None,
                positions: vec![position(1, Some("Budi Santoso"), None)],
            })
            .await
            .unwrap();
        assert_eq!(again.section_title, "Struktur Organisasi SMK");
        assert_eq!(again.positions[0].image.as_deref(), Some(image.as_str()));
        assert_eq!(again.positions[2].name, None);
        assert_eq!(service.load().unwrap(), again);
    }

    #[tokio::test]
    async fn test_invalid_image_leaves_stored_structure_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let registry = PositionRegistry::from_labels(["A", "B"]).unwrap();
        let (service, _) = service(&temp_dir, registry).await;

        let before = service
            .save(StructureInputView {
                section_title: None,
                positions: vec![position(1, Some("Budi"), None)],
            })
            .await
            .unwrap();

        let err = service
            .save(StructureInputView {
                section_title: None,
                positions: vec![
                    position(1, Some("Ganti"), Some(png(2))),
                    position(2, Some("Sari"), Some(b"not an image".to_vec())),
                ],
            })
            .await
            .unwrap_err();

        let CmsError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("positions.2.image").is_some());
        assert_eq!(service.load().unwrap(), before);
    }

    #[tokio::test]
    async fn test_blank_section_title_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (service, _) = service(&temp_dir, PositionRegistry::school_default()).await;

        let err = service
            .save(StructureInputView {
                section_title: Some("  ".into()),
                positions: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_null_image_clears_one_portrait() {
        let temp_dir = TempDir::new().unwrap();
        let registry = PositionRegistry::from_labels(["A", "B"]).unwrap();
        let (service, _) = service(&temp_dir, registry).await;

        service
            .save(StructureInputView {
                section_title: None,
                positions: vec![
                    position(1, Some("Budi"), Some(png(1))),
                    position(2, Some("Sari"), Some(png(2))),
                ],
            })
            .await
            .unwrap();

        let mut cleared = position(1, Some("Budi"), None);
        cleared.image = ImageInput::Clear;
        let saved = service
            .save(StructureInputView {
                section_title: None,
                positions: vec![cleared, position(2, Some("Sari"), None)],
            })
            .await
            .unwrap();

        assert_eq!(saved.positions[0].name.as_deref(), Some("Budi"));
        assert_eq!(saved.positions[0].image, None);
        assert!(saved.positions[1].image.is_some());
    }
}
