//! Settings service - the school profile singleton

use std::sync::Arc;

use crate::blob_store::UploadConstraints;
use crate::db::settings::{self, SettingsRow};
use crate::db::CmsDb;
use crate::error::{CmsError, FieldErrors};
use crate::views::SettingsInputView;

use super::events::{ContentEvent, EventBus};
use super::media::{self, MediaGate};
use super::validate::{optional, optional_email, optional_url, required};

pub struct SettingsService {
    db: Arc<CmsDb>,
    media: Arc<MediaGate>,
    events: Arc<EventBus>,
    default_school_name: String,
    constraints: UploadConstraints,
}

impl SettingsService {
    pub fn new(
        db: Arc<CmsDb>,
        media: Arc<MediaGate>,
        events: Arc<EventBus>,
        default_school_name: String,
        constraints: UploadConstraints,
    ) -> Self {
        Self {
            db,
            media,
            events,
            default_school_name,
            constraints,
        }
    }

    /// Current settings, created with the configured school name on first read
    pub fn get(&self) -> Result<SettingsRow, CmsError> {
        self.db
            .with_conn(|conn| settings::get_or_create(conn, &self.default_school_name))
    }

    pub async fn update(&self, input: SettingsInputView) -> Result<SettingsRow, CmsError> {
        let current = self.get()?;

        let mut errors = FieldErrors::new();
        let school_name = required(&mut errors, "schoolName", &input.school_name);
        let email = optional_email(&mut errors, "email", input.email);
        let map_embed_url = optional_url(&mut errors, "mapEmbedUrl", input.map_embed_url);
        let facebook_url = optional_url(&mut errors, "facebookUrl", input.facebook_url);
        let instagram_url = optional_url(&mut errors, "instagramUrl", input.instagram_url);
        let youtube_url = optional_url(&mut errors, "youtubeUrl", input.youtube_url);
        let principal_photo =
            media::decode(&mut errors, "principalPhoto", input.principal_photo, &self.constraints);
        let logo = media::decode(&mut errors, "logo", input.logo, &self.constraints);
        errors.into_result()?;

        let mut pending = self.media.begin();
        let principal_photo = pending
            .apply(
                "principalPhoto",
                principal_photo,
                current.principal_photo.clone(),
                &self.constraints,
            )
            .await?;
        let logo = pending
            .apply("logo", logo, current.logo.clone(), &self.constraints)
            .await?;

        let updated = SettingsRow {
            school_name,
            tagline: optional(input.tagline),
            address: optional(input.address),
            phone: optional(input.phone),
            email,
            about: optional(input.about),
            vision: optional(input.vision),
            mission: optional(input.mission),
            principal_name: optional(input.principal_name),
            principal_greeting: optional(input.principal_greeting),
            principal_photo,
            logo,
            map_embed_url,
            facebook_url,
            instagram_url,
            youtube_url,
            updated_at: current.updated_at,
        };
        let result = self.db.with_conn(|conn| settings::update(conn, &updated));
        let row = pending.finish(result).await?;

        self.events.emit(ContentEvent::SettingsUpdated);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::BlobStore;
    use tempfile::TempDir;

    async fn service(temp_dir: &TempDir) -> SettingsService {
        let db = Arc::new(CmsDb::open_in_memory().unwrap());
        let images = Arc::new(BlobStore::new(temp_dir.path(), "http://localhost").await.unwrap());
        let media = Arc::new(MediaGate::new(db.clone(), images.clone()));
        SettingsService::new(
            db,
            media,
            Arc::new(EventBus::new()),
            "SMK Negeri 1 Contoh".into(),
            UploadConstraints::images(1024),
        )
    }

    #[tokio::test]
    async fn test_first_read_uses_default_name() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;
        assert_eq!(service.get().unwrap().school_name, "SMK Negeri 1 Contoh");
    }

    #[tokio::test]
    async fn test_update_validates_links() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;

        let err = service
            .update(SettingsInputView {
                school_name: "SMK Negeri 1 Contoh".into(),
                email: Some("bukan-email".into()),
                youtube_url: Some("youtube".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        let CmsError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("email").is_some());
        assert!(fields.get("youtubeUrl").is_some());

        let saved = service
            .update(SettingsInputView {
                school_name: "SMK Negeri 1 Contoh".into(),
                vision: Some("  Unggul  ".into()),
                tagline: Some("   ".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(saved.vision.as_deref(), Some("Unggul"));
        assert_eq!(saved.tagline, None);
    }
}
