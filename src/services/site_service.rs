//! Site service - page aggregates for the public site

use std::sync::Arc;

use crate::db::achievements::{self, AchievementRow};
use crate::db::articles::ArticleRow;
use crate::db::banners::{self, BannerRow};
use crate::db::galleries::{self, GalleryRow};
use crate::db::majors::{self, MajorRow};
use crate::db::settings::SettingsRow;
use crate::db::{CmsDb, ListQuery, PageRequest};
use crate::error::CmsError;

use super::structure_service::StructureEditor;
use super::{ArticleService, SettingsService, StructureService};

/// How many items each landing page section shows
pub const HOME_ARTICLES: u32 = 6;
pub const HOME_GALLERIES: u32 = 8;
pub const HOME_ACHIEVEMENTS: u32 = 4;

/// Everything the landing page shows
#[derive(Debug, Clone)]
pub struct HomePage {
    pub settings: SettingsRow,
    pub banners: Vec<BannerRow>,
    pub latest_articles: Vec<ArticleRow>,
    pub majors: Vec<MajorRow>,
    pub galleries: Vec<GalleryRow>,
    pub achievements: Vec<AchievementRow>,
}

/// School profile page
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub settings: SettingsRow,
    pub structure: StructureEditor,
}

pub struct SiteService {
    db: Arc<CmsDb>,
    articles: Arc<ArticleService>,
    settings: Arc<SettingsService>,
    structure: Arc<StructureService>,
}

impl SiteService {
    pub fn new(
        db: Arc<CmsDb>,
        articles: Arc<ArticleService>,
        settings: Arc<SettingsService>,
        structure: Arc<StructureService>,
    ) -> Self {
        Self {
            db,
            articles,
            settings,
            structure,
        }
    }

    pub fn home(&self) -> Result<HomePage, CmsError> {
        let settings = self.settings.get()?;
        let latest_articles = self.articles.latest_published(HOME_ARTICLES)?;

        let (banners, majors, galleries, achievements) = self.db.with_conn(|conn| {
            let first_page = |n: u32| PageRequest::new(Some(1), Some(n), n);
            Ok((
                banners::active_banners(conn)?,
                majors::all_majors(conn)?,
                galleries::list_galleries(conn, &ListQuery::default(), first_page(HOME_GALLERIES))?.items,
                achievements::list_achievements(conn, &ListQuery::default(), first_page(HOME_ACHIEVEMENTS))?
                    .items,
            ))
        })?;

        Ok(HomePage {
            settings,
            banners,
            latest_articles,
            majors,
            galleries,
            achievements,
        })
    }

    pub fn profile(&self) -> Result<ProfilePage, CmsError> {
        Ok(ProfilePage {
            settings: self.settings.get()?,
            structure: self.structure.load()?,
        })
    }
}
