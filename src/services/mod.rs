//! Service layer for school-cms
//!
//! Services sit between the HTTP handlers and the repositories. Each one
//! wraps database operations with:
//! - Input validation (collected per field)
//! - Image uploads, removed again when the row write fails
//! - Slug assignment
//! - Event emission for the audit log
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (validation, images, events)
//!     ↓
//! Repository Layer (db/*.rs)       Blob store (media/)
//!     ↓
//! SQLite Database
//! ```

pub mod article_service;
pub mod banner_service;
pub mod catalog_service;
pub mod events;
pub mod media;
pub mod response;
pub mod settings_service;
pub mod site_service;
pub mod structure_service;
pub mod validate;

pub use article_service::ArticleService;
pub use banner_service::BannerService;
pub use catalog_service::CatalogService;
pub use events::{ContentEvent, EventBus, EventListener};
pub use media::MediaGate;
pub use response::*;
pub use settings_service::SettingsService;
pub use site_service::SiteService;
pub use structure_service::StructureService;

use std::fmt;
use std::sync::Arc;

use crate::blob_store::ImageStore;
use crate::config::Config;
use crate::db::CmsDb;
use crate::structure::PositionRegistry;

/// Admin-managed content collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Articles,
    Categories,
    Majors,
    Extracurriculars,
    Banners,
    Galleries,
    Achievements,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Articles,
        Collection::Categories,
        Collection::Majors,
        Collection::Extracurriculars,
        Collection::Banners,
        Collection::Galleries,
        Collection::Achievements,
    ];

    /// URL path segment, e.g. `/admin/api/majors`
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Articles => "articles",
            Collection::Categories => "categories",
            Collection::Majors => "majors",
            Collection::Extracurriculars => "extracurriculars",
            Collection::Banners => "banners",
            Collection::Galleries => "galleries",
            Collection::Achievements => "achievements",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == segment)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service container for dependency injection
///
/// Holds all services with a shared database and image store.
/// Pass this to HttpServer for handler access.
pub struct Services {
    pub articles: Arc<ArticleService>,
    pub catalog: Arc<CatalogService>,
    pub banners: Arc<BannerService>,
    pub settings: Arc<SettingsService>,
    pub structure: Arc<StructureService>,
    pub site: Arc<SiteService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services with the default school roster
    pub fn new(db: Arc<CmsDb>, images: Arc<dyn ImageStore>, config: &Config) -> Self {
        Self::with_registry(db, images, config, PositionRegistry::school_default())
    }

    pub fn with_registry(
        db: Arc<CmsDb>,
        images: Arc<dyn ImageStore>,
        config: &Config,
        registry: PositionRegistry,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        let media = Arc::new(MediaGate::new(db.clone(), images));

        let articles = Arc::new(ArticleService::new(
            db.clone(),
            media.clone(),
            events.clone(),
            config.thumbnail_constraints(),
        ));
        let catalog = Arc::new(CatalogService::new(db.clone(), media.clone(), events.clone(), config));
        let banners = Arc::new(BannerService::new(
            db.clone(),
            media.clone(),
            events.clone(),
            config.thumbnail_constraints(),
        ));
        let settings = Arc::new(SettingsService::new(
            db.clone(),
            media.clone(),
            events.clone(),
            config.default_school_name.clone(),
            config.thumbnail_constraints(),
        ));
        let structure = Arc::new(StructureService::new(
            db.clone(),
            media,
            events.clone(),
            Arc::new(registry),
            config.thumbnail_constraints(),
        ));
        let site = Arc::new(SiteService::new(
            db,
            articles.clone(),
            settings.clone(),
            structure.clone(),
        ));

        Self {
            articles,
            catalog,
            banners,
            settings,
            structure,
            site,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_segments_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_segment(collection.as_str()), Some(collection));
        }
        assert_eq!(Collection::from_segment("settings"), None);
    }
}
