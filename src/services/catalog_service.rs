//! Catalog service - majors, extracurriculars, galleries and achievements
//!
//! The slugged pages of the public site besides articles. Every write
//! validates, uploads images, assigns a slug and then stores the row.

use std::sync::Arc;

use crate::blob_store::UploadConstraints;
use crate::config::Config;
use crate::db::achievements::{self, AchievementRecord, AchievementRow};
use crate::db::extracurriculars::{self, ExtracurricularRecord, ExtracurricularRow};
use crate::db::galleries::{self, GalleryRecord, GalleryRow};
use crate::db::majors::{self, MajorRecord, MajorRow};
use crate::db::slug::{unique_slug, SlugScope};
use crate::db::{CmsDb, ListQuery, Page, PageRequest};
use crate::error::{CmsError, FieldErrors};
use crate::views::{AchievementInputView, ExtracurricularInputView, GalleryInputView, MajorInputView};

use super::events::{ContentEvent, EventBus};
use super::media::{self, ImageChange, MediaGate};
use super::validate::{optional, optional_date, required};
use super::Collection;

/// Service for the catalog collections
pub struct CatalogService {
    db: Arc<CmsDb>,
    media: Arc<MediaGate>,
    events: Arc<EventBus>,
    thumbnail: UploadConstraints,
    preview: UploadConstraints,
    gallery: UploadConstraints,
}

impl CatalogService {
    pub fn new(db: Arc<CmsDb>, media: Arc<MediaGate>, events: Arc<EventBus>, config: &Config) -> Self {
        Self {
            db,
            media,
            events,
            thumbnail: config.thumbnail_constraints(),
            preview: config.preview_constraints(),
            gallery: config.gallery_constraints(),
        }
    }

    /// Slug for a saved row: unchanged when the name is, fresh otherwise
    fn slug_for(
        conn: &rusqlite::Connection,
        scope: SlugScope,
        name: &str,
        existing: Option<(i64, &str, &str)>,
    ) -> Result<String, CmsError> {
        match existing {
            Some((_, old_name, old_slug)) if old_name == name => Ok(old_slug.to_string()),
            Some((id, _, _)) => unique_slug(conn, scope, name, Some(id)),
            None => unique_slug(conn, scope, name, None),
        }
    }

    fn emit_saved(&self, collection: Collection, id: i64, title: &str, is_new: bool) {
        let title = title.to_string();
        self.events.emit(if is_new {
            ContentEvent::Created { collection, id, title }
        } else {
            ContentEvent::Updated { collection, id, title }
        });
    }

    fn emit_deleted(&self, collection: Collection, id: i64, deleted: bool) {
        if deleted {
            self.events.emit(ContentEvent::Deleted { collection, id });
        }
    }

    // =========================================================================
    // Majors
    // =========================================================================

    pub fn list_majors(&self, query: &ListQuery, request: PageRequest) -> Result<Page<MajorRow>, CmsError> {
        self.db.with_conn(|conn| majors::list_majors(conn, query, request))
    }

    pub fn all_majors(&self) -> Result<Vec<MajorRow>, CmsError> {
        self.db.with_conn(majors::all_majors)
    }

    pub fn get_major(&self, id: i64) -> Result<Option<MajorRow>, CmsError> {
        self.db.with_conn(|conn| majors::get_major(conn, id))
    }

    pub fn get_major_by_slug(&self, slug: &str) -> Result<Option<MajorRow>, CmsError> {
        self.db.with_conn(|conn| majors::get_major_by_slug(conn, slug))
    }

    /// Create when `id` is `None`, otherwise update
    pub async fn save_major(&self, id: Option<i64>, input: MajorInputView) -> Result<MajorRow, CmsError> {
        let existing = match id {
            Some(id) => Some(
                self.get_major(id)?
                    .ok_or_else(|| CmsError::NotFound(format!("major {}", id)))?,
            ),
            None => None,
        };

        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", &input.name);
        let thumbnail = media::decode(&mut errors, "thumbnail", input.thumbnail, &self.thumbnail);
        let preview_image = media::decode(&mut errors, "previewImage", input.preview_image, &self.preview);
        errors.into_result()?;

        let mut pending = self.media.begin();
        let thumbnail = pending
            .apply(
                "thumbnail",
                thumbnail,
                existing.as_ref().and_then(|m| m.thumbnail.clone()),
                &self.thumbnail,
            )
            .await?;
        let preview_image = pending
            .apply(
                "previewImage",
                preview_image,
                existing.as_ref().and_then(|m| m.preview_image.clone()),
                &self.preview,
            )
            .await?;

        let result = self.db.with_conn(|conn| {
            let slug = Self::slug_for(
                conn,
                SlugScope::Majors,
                &name,
                existing.as_ref().map(|m| (m.id, m.name.as_str(), m.slug.as_str())),
            )?;
            let record = MajorRecord {
                name: name.clone(),
                slug,
                abbreviation: optional(input.abbreviation),
                description: optional(input.description),
                thumbnail,
                preview_image,
            };
            match id {
                Some(id) => majors::update_major(conn, id, &record)?
                    .ok_or_else(|| CmsError::NotFound(format!("major {}", id))),
                None => majors::create_major(conn, &record),
            }
        });
        let row = pending.finish(result).await?;

        self.emit_saved(Collection::Majors, row.id, &row.name, id.is_none());
        Ok(row)
    }

    pub fn delete_major(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self.db.with_conn(|conn| majors::delete_major(conn, id))?;
        self.emit_deleted(Collection::Majors, id, deleted);
        Ok(deleted)
    }

    // =========================================================================
    // Extracurriculars
    // =========================================================================

    pub fn list_extracurriculars(
        &self,
        query: &ListQuery,
        request: PageRequest,
    ) -> Result<Page<ExtracurricularRow>, CmsError> {
        self.db
            .with_conn(|conn| extracurriculars::list_extracurriculars(conn, query, request))
    }

    pub fn get_extracurricular(&self, id: i64) -> Result<Option<ExtracurricularRow>, CmsError> {
        self.db.with_conn(|conn| extracurriculars::get_extracurricular(conn, id))
    }

    pub fn get_extracurricular_by_slug(&self, slug: &str) -> Result<Option<ExtracurricularRow>, CmsError> {
        self.db
            .with_conn(|conn| extracurriculars::get_extracurricular_by_slug(conn, slug))
    }

    pub async fn save_extracurricular(
        &self,
        id: Option<i64>,
        input: ExtracurricularInputView,
    ) -> Result<ExtracurricularRow, CmsError> {
        let existing = match id {
            Some(id) => Some(
                self.get_extracurricular(id)?
                    .ok_or_else(|| CmsError::NotFound(format!("extracurricular {}", id)))?,
            ),
            None => None,
        };

        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", &input.name);
        let image = media::decode(&mut errors, "image", input.image, &self.thumbnail);
        errors.into_result()?;

        let mut pending = self.media.begin();
        let image = pending
            .apply(
                "image",
                image,
                existing.as_ref().and_then(|e| e.image.clone()),
                &self.thumbnail,
            )
            .await?;

        let result = self.db.with_conn(|conn| {
            let slug = Self::slug_for(
                conn,
                SlugScope::Extracurriculars,
                &name,
                existing.as_ref().map(|e| (e.id, e.name.as_str(), e.slug.as_str())),
            )?;
            let record = ExtracurricularRecord {
                name: name.clone(),
                slug,
                description: optional(input.description),
                image,
            };
            match id {
                Some(id) => extracurriculars::update_extracurricular(conn, id, &record)?
                    .ok_or_else(|| CmsError::NotFound(format!("extracurricular {}", id))),
                None => extracurriculars::create_extracurricular(conn, &record),
            }
        });
        let row = pending.finish(result).await?;

        self.emit_saved(Collection::Extracurriculars, row.id, &row.name, id.is_none());
        Ok(row)
    }

    pub fn delete_extracurricular(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self
            .db
            .with_conn(|conn| extracurriculars::delete_extracurricular(conn, id))?;
        self.emit_deleted(Collection::Extracurriculars, id, deleted);
        Ok(deleted)
    }

    // =========================================================================
    // Galleries
    // =========================================================================

    pub fn list_galleries(&self, query: &ListQuery, request: PageRequest) -> Result<Page<GalleryRow>, CmsError> {
        self.db.with_conn(|conn| galleries::list_galleries(conn, query, request))
    }

    pub fn get_gallery(&self, id: i64) -> Result<Option<GalleryRow>, CmsError> {
        self.db.with_conn(|conn| galleries::get_gallery(conn, id))
    }

    pub fn get_gallery_by_slug(&self, slug: &str) -> Result<Option<GalleryRow>, CmsError> {
        self.db.with_conn(|conn| galleries::get_gallery_by_slug(conn, slug))
    }

    pub async fn save_gallery(&self, id: Option<i64>, input: GalleryInputView) -> Result<GalleryRow, CmsError> {
        let existing = match id {
            Some(id) => Some(
                self.get_gallery(id)?
                    .ok_or_else(|| CmsError::NotFound(format!("gallery item {}", id)))?,
            ),
            None => None,
        };

        let mut errors = FieldErrors::new();
        let title = required(&mut errors, "title", &input.title);
        let taken_at = optional_date(&mut errors, "takenAt", input.taken_at);
        let image = media::decode(&mut errors, "image", input.image, &self.gallery);
        let has_image = match &image {
            ImageChange::Replace(_) => true,
            ImageChange::Keep => existing.is_some(),
            ImageChange::Clear => false,
        };
        if !has_image && errors.get("image").is_none() {
            errors.add("image", "image is required");
        }
        errors.into_result()?;

        let mut pending = self.media.begin();
        let image = pending
            .apply("image", image, existing.as_ref().map(|g| g.image.clone()), &self.gallery)
            .await?
            .ok_or_else(|| CmsError::invalid("image", "image is required"))?;

        let result = self.db.with_conn(|conn| {
            let slug = Self::slug_for(
                conn,
                SlugScope::Galleries,
                &title,
                existing.as_ref().map(|g| (g.id, g.title.as_str(), g.slug.as_str())),
            )?;
            let record = GalleryRecord {
                title: title.clone(),
                slug,
                description: optional(input.description),
                image,
                taken_at,
            };
            match id {
                Some(id) => galleries::update_gallery(conn, id, &record)?
                    .ok_or_else(|| CmsError::NotFound(format!("gallery item {}", id))),
                None => galleries::create_gallery(conn, &record),
            }
        });
        let row = pending.finish(result).await?;

        self.emit_saved(Collection::Galleries, row.id, &row.title, id.is_none());
        Ok(row)
    }

    pub fn delete_gallery(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self.db.with_conn(|conn| galleries::delete_gallery(conn, id))?;
        self.emit_deleted(Collection::Galleries, id, deleted);
        Ok(deleted)
    }

    // =========================================================================
    // Achievements
    // =========================================================================

    pub fn list_achievements(
        &self,
        query: &ListQuery,
        request: PageRequest,
    ) -> Result<Page<AchievementRow>, CmsError> {
        self.db
            .with_conn(|conn| achievements::list_achievements(conn, query, request))
    }

    pub fn get_achievement(&self, id: i64) -> Result<Option<AchievementRow>, CmsError> {
        self.db.with_conn(|conn| achievements::get_achievement(conn, id))
    }

    pub fn get_achievement_by_slug(&self, slug: &str) -> Result<Option<AchievementRow>, CmsError> {
        self.db
            .with_conn(|conn| achievements::get_achievement_by_slug(conn, slug))
    }

    pub async fn save_achievement(
        &self,
        id: Option<i64>,
        input: AchievementInputView,
    ) -> Result<AchievementRow, CmsError> {
        let existing = match id {
            Some(id) => Some(
                self.get_achievement(id)?
                    .ok_or_else(|| CmsError::NotFound(format!("achievement {}", id)))?,
            ),
            None => None,
        };

        let mut errors = FieldErrors::new();
        let title = required(&mut errors, "title", &input.title);
        let achieved_at = optional_date(&mut errors, "achievedAt", input.achieved_at);
        let image = media::decode(&mut errors, "image", input.image, &self.thumbnail);
        errors.into_result()?;

        let mut pending = self.media.begin();
        let image = pending
            .apply(
                "image",
                image,
                existing.as_ref().and_then(|a| a.image.clone()),
                &self.thumbnail,
            )
            .await?;

        let result = self.db.with_conn(|conn| {
            let slug = Self::slug_for(
                conn,
                SlugScope::Achievements,
                &title,
                existing.as_ref().map(|a| (a.id, a.title.as_str(), a.slug.as_str())),
            )?;
            let record = AchievementRecord {
                title: title.clone(),
                slug,
                description: optional(input.description),
                image,
                level: optional(input.level),
                achieved_at,
            };
            match id {
                Some(id) => achievements::update_achievement(conn, id, &record)?
                    .ok_or_else(|| CmsError::NotFound(format!("achievement {}", id))),
                None => achievements::create_achievement(conn, &record),
            }
        });
        let row = pending.finish(result).await?;

        self.emit_saved(Collection::Achievements, row.id, &row.title, id.is_none());
        Ok(row)
    }

    pub fn delete_achievement(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self
            .db
            .with_conn(|conn| achievements::delete_achievement(conn, id))?;
        self.emit_deleted(Collection::Achievements, id, deleted);
        Ok(deleted)
    }
}
