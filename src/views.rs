//! View types for the HTTP API boundary
//!
//! Output views use camelCase for the TypeScript front end and carry every
//! image as a reference plus its public URL. Repository rows keep the
//! snake_case column names and bare references.
//!
//! InputView types (suffix InputView) are what the admin forms submit. Image
//! fields in them follow one rule: an absent key keeps the stored image,
//! `null` clears it, and `{ "mimeType", "data" }` replaces it.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::blob_store::{ImageStore, ImageUpload};
use crate::db::achievements::AchievementRow;
use crate::db::articles::ArticleRow;
use crate::db::banners::BannerRow;
use crate::db::categories::CategoryRow;
use crate::db::extracurriculars::ExtracurricularRow;
use crate::db::galleries::GalleryRow;
use crate::db::majors::MajorRow;
use crate::db::settings::SettingsRow;
use crate::structure::ReconciledPosition;

/// A stored image and where to fetch it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ImageView {
    pub reference: String,
    pub url: String,
}

impl ImageView {
    pub fn new(images: &dyn ImageStore, reference: String) -> Self {
        Self {
            url: images.resolve(&reference),
            reference,
        }
    }

    pub fn from_opt(images: &dyn ImageStore, reference: Option<String>) -> Option<Self> {
        reference.map(|r| Self::new(images, r))
    }
}

// ============================================================================
// Article Views
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub article_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CategoryRow> for CategoryView {
    fn from(c: CategoryRow) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            article_count: c.article_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Category as embedded in an article
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryRefView {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub thumbnail: Option<ImageView>,
    pub published: bool,
    pub published_at: Option<String>,
    pub category: Option<CategoryRefView>,
    pub created_at: String,
    pub updated_at: String,
}

impl ArticleView {
    pub fn build(a: ArticleRow, images: &dyn ImageStore) -> Self {
        let category = match (a.category_id, a.category_name, a.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(CategoryRefView { id, name, slug }),
            _ => None,
        };
        Self {
            id: a.id,
            title: a.title,
            slug: a.slug,
            excerpt: a.excerpt,
            body: a.body,
            thumbnail: ImageView::from_opt(images, a.thumbnail),
            published: a.published,
            published_at: a.published_at,
            category,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

// ============================================================================
// Catalog Views
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MajorView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<ImageView>,
    pub preview_image: Option<ImageView>,
    pub created_at: String,
    pub updated_at: String,
}

impl MajorView {
    pub fn build(m: MajorRow, images: &dyn ImageStore) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            abbreviation: m.abbreviation,
            description: m.description,
            thumbnail: ImageView::from_opt(images, m.thumbnail),
            preview_image: ImageView::from_opt(images, m.preview_image),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExtracurricularView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<ImageView>,
    pub created_at: String,
    pub updated_at: String,
}

impl ExtracurricularView {
    pub fn build(e: ExtracurricularRow, images: &dyn ImageStore) -> Self {
        Self {
            id: e.id,
            name: e.name,
            slug: e.slug,
            description: e.description,
            image: ImageView::from_opt(images, e.image),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GalleryView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: ImageView,
    pub taken_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GalleryView {
    pub fn build(g: GalleryRow, images: &dyn ImageStore) -> Self {
        Self {
            id: g.id,
            title: g.title,
            slug: g.slug,
            description: g.description,
            image: ImageView::new(images, g.image),
            taken_at: g.taken_at,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AchievementView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<ImageView>,
    pub level: Option<String>,
    pub achieved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AchievementView {
    pub fn build(a: AchievementRow, images: &dyn ImageStore) -> Self {
        Self {
            id: a.id,
            title: a.title,
            slug: a.slug,
            description: a.description,
            image: ImageView::from_opt(images, a.image),
            level: a.level,
            achieved_at: a.achieved_at,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BannerView {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: ImageView,
    pub link_url: Option<String>,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BannerView {
    pub fn build(b: BannerRow, images: &dyn ImageStore) -> Self {
        Self {
            id: b.id,
            title: b.title,
            subtitle: b.subtitle,
            image: ImageView::new(images, b.image),
            link_url: b.link_url,
            sort_order: b.sort_order,
            active: b.active,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

// ============================================================================
// Settings & Structure Views
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SettingsView {
    pub school_name: String,
    pub tagline: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub about: Option<String>,
    pub vision: Option<String>,
    pub mission: Option<String>,
    pub principal_name: Option<String>,
    pub principal_greeting: Option<String>,
    pub principal_photo: Option<ImageView>,
    pub logo: Option<ImageView>,
    pub map_embed_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
    pub updated_at: String,
}

impl SettingsView {
    pub fn build(s: SettingsRow, images: &dyn ImageStore) -> Self {
        Self {
            school_name: s.school_name,
            tagline: s.tagline,
            address: s.address,
            phone: s.phone,
            email: s.email,
            about: s.about,
            vision: s.vision,
            mission: s.mission,
            principal_name: s.principal_name,
            principal_greeting: s.principal_greeting,
            principal_photo: ImageView::from_opt(images, s.principal_photo),
            logo: ImageView::from_opt(images, s.logo),
            map_embed_url: s.map_embed_url,
            facebook_url: s.facebook_url,
            instagram_url: s.instagram_url,
            youtube_url: s.youtube_url,
            updated_at: s.updated_at,
        }
    }
}

/// One chart slot
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PositionView {
    pub order: u32,
    pub label: String,
    /// Title override, or the label when none is stored
    pub display_title: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub image: Option<ImageView>,
}

impl PositionView {
    pub fn build(p: ReconciledPosition, images: &dyn ImageStore) -> Self {
        Self {
            display_title: p.display_title().to_string(),
            order: p.order,
            label: p.label,
            title: p.title,
            name: p.name,
            image: ImageView::from_opt(images, p.image),
        }
    }
}

/// The full organization chart
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StructureView {
    pub section_title: String,
    /// Exactly one entry per registry position, ascending by order
    pub positions: Vec<PositionView>,
    /// Orders grouped into tree tiers, top first
    pub rows: Vec<Vec<u32>>,
    pub updated_at: Option<String>,
}

// ============================================================================
// Page Views
// ============================================================================

/// Landing page
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomeView {
    pub settings: SettingsView,
    pub banners: Vec<BannerView>,
    pub latest_articles: Vec<ArticleView>,
    pub majors: Vec<MajorView>,
    pub galleries: Vec<GalleryView>,
    pub achievements: Vec<AchievementView>,
}

/// School profile page
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileView {
    pub settings: SettingsView,
    pub structure: StructureView,
}

// ============================================================================
// Input Views
// ============================================================================

/// A base64 image as submitted by the admin forms
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadView {
    pub mime_type: String,
    pub data: String,
}

impl UploadView {
    pub fn decode(&self) -> Result<ImageUpload, String> {
        ImageUpload::from_base64(&self.mime_type, &self.data)
    }
}

/// Image field of an input: keep, clear or replace
#[derive(Debug, Clone, Default)]
pub enum ImageInput {
    #[default]
    Keep,
    Clear,
    Replace(UploadView),
}

impl<'de> Deserialize<'de> for ImageInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; absent keys use Default
        Ok(match Option::<UploadView>::deserialize(deserializer)? {
            Some(upload) => ImageInput::Replace(upload),
            None => ImageInput::Clear,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryInputView {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleInputView {
    pub category_id: Option<i64>,
    pub title: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub published: bool,
    pub published_at: Option<String>,
    pub thumbnail: ImageInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MajorInputView {
    pub name: String,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
    pub thumbnail: ImageInput,
    pub preview_image: ImageInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtracurricularInputView {
    pub name: String,
    pub description: Option<String>,
    pub image: ImageInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryInputView {
    pub title: String,
    pub description: Option<String>,
    pub taken_at: Option<String>,
    pub image: ImageInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementInputView {
    pub title: String,
    pub description: Option<String>,
    pub level: Option<String>,
    pub achieved_at: Option<String>,
    pub image: ImageInput,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerInputView {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub image: ImageInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsInputView {
    pub school_name: String,
    pub tagline: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub about: Option<String>,
    pub vision: Option<String>,
    pub mission: Option<String>,
    pub principal_name: Option<String>,
    pub principal_greeting: Option<String>,
    pub principal_photo: ImageInput,
    pub logo: ImageInput,
    pub map_embed_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
}

/// One edited chart slot. Without `image` the stored one is kept, an
/// explicit `null` removes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInputView {
    pub order: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: ImageInput,
}

/// Organization structure save request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureInputView {
    /// Keeps the stored title when absent
    #[serde(default)]
    pub section_title: Option<String>,
    pub positions: Vec<PositionInputView>,
}
