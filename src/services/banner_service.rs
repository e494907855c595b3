//! Banner service - landing page carousel

use std::sync::Arc;

use crate::blob_store::UploadConstraints;
use crate::db::banners::{self, BannerRecord, BannerRow};
use crate::db::{CmsDb, ListQuery, Page, PageRequest};
use crate::error::{CmsError, FieldErrors};
use crate::views::BannerInputView;

use super::events::{ContentEvent, EventBus};
use super::media::{self, ImageChange, MediaGate};
use super::validate::{optional, optional_link, required};
use super::Collection;

pub struct BannerService {
    db: Arc<CmsDb>,
    media: Arc<MediaGate>,
    events: Arc<EventBus>,
    constraints: UploadConstraints,
}

impl BannerService {
    pub fn new(
        db: Arc<CmsDb>,
        media: Arc<MediaGate>,
        events: Arc<EventBus>,
        constraints: UploadConstraints,
    ) -> Self {
        Self {
            db,
            media,
            events,
            constraints,
        }
    }

    pub fn list(&self, query: &ListQuery, request: PageRequest) -> Result<Page<BannerRow>, CmsError> {
        self.db.with_conn(|conn| banners::list_banners(conn, query, request))
    }

    pub fn active(&self) -> Result<Vec<BannerRow>, CmsError> {
        self.db.with_conn(banners::active_banners)
    }

    pub fn get(&self, id: i64) -> Result<Option<BannerRow>, CmsError> {
        self.db.with_conn(|conn| banners::get_banner(conn, id))
    }

    /// Create when `id` is `None`, otherwise update
    pub async fn save(&self, id: Option<i64>, input: BannerInputView) -> Result<BannerRow, CmsError> {
        let existing = match id {
            Some(id) => Some(
                self.get(id)?
                    .ok_or_else(|| CmsError::NotFound(format!("banner {}", id)))?,
            ),
            None => None,
        };

        let mut errors = FieldErrors::new();
        let title = required(&mut errors, "title", &input.title);
        let link_url = optional_link(&mut errors, "linkUrl", input.link_url);
        let image = media::decode(&mut errors, "image", input.image, &self.constraints);
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
            .apply("image", image, existing.map(|b| b.image), &self.constraints)
            .await?
            .ok_or_else(|| CmsError::invalid("image", "image is required"))?;

        let record = BannerRecord {
            title,
            subtitle: optional(input.subtitle),
            image,
            link_url,
            sort_order: input.sort_order,
            active: input.active,
        };
        let result = self.db.with_conn(|conn| match id {
            Some(id) => banners::update_banner(conn, id, &record)?
                .ok_or_else(|| CmsError::NotFound(format!("banner {}", id))),
            None => banners::create_banner(conn, &record),
        });
        let row = pending.finish(result).await?;

        let title = row.title.clone();
        self.events.emit(match id {
            None => ContentEvent::Created {
                collection: Collection::Banners,
                id: row.id,
                title,
            },
            Some(id) => ContentEvent::Updated {
                collection: Collection::Banners,
                id,
                title,
            },
        });
        Ok(row)
    }

    pub fn delete(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self.db.with_conn(|conn| banners::delete_banner(conn, id))?;
        if deleted {
            self.events.emit(ContentEvent::Deleted {
                collection: Collection::Banners,
                id,
            });
        }
        Ok(deleted)
    }
}
