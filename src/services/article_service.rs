//! Article service - news articles and their categories

use std::sync::Arc;

use crate::blob_store::UploadConstraints;
use crate::db::articles::{self, ArticleRecord, ArticleRow};
use crate::db::categories::{self, CategoryRow};
use crate::db::slug::{unique_slug, SlugScope};
use crate::db::{CmsDb, ListQuery, Page, PageRequest};
use crate::error::{CmsError, FieldErrors};
use crate::views::{ArticleInputView, CategoryInputView};

use super::events::{ContentEvent, EventBus};
use super::media::{self, MediaGate};
use super::validate::{optional, optional_date, required};
use super::Collection;

/// Article and category service
pub struct ArticleService {
    db: Arc<CmsDb>,
    media: Arc<MediaGate>,
    events: Arc<EventBus>,
    thumbnail: UploadConstraints,
}

impl ArticleService {
    pub fn new(
        db: Arc<CmsDb>,
        media: Arc<MediaGate>,
        events: Arc<EventBus>,
        thumbnail: UploadConstraints,
    ) -> Self {
        Self {
            db,
            media,
            events,
            thumbnail,
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub fn list_categories(&self, query: &ListQuery, request: PageRequest) -> Result<Page<CategoryRow>, CmsError> {
        self.db.with_conn(|conn| categories::list_categories(conn, query, request))
    }

    pub fn all_categories(&self) -> Result<Vec<CategoryRow>, CmsError> {
        self.db.with_conn(categories::all_categories)
    }

    pub fn get_category(&self, id: i64) -> Result<Option<CategoryRow>, CmsError> {
        self.db.with_conn(|conn| categories::get_category(conn, id))
    }

    pub fn create_category(&self, input: CategoryInputView) -> Result<CategoryRow, CmsError> {
        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", &input.name);
        errors.into_result()?;

        let row = self.db.with_conn(|conn| {
            let slug = unique_slug(conn, SlugScope::Categories, &name, None)?;
            categories::create_category(conn, &name, &slug)
        })?;

        self.events.emit(ContentEvent::Created {
            collection: Collection::Categories,
            id: row.id,
            title: row.name.clone(),
        });
        Ok(row)
    }

    pub fn update_category(&self, id: i64, input: CategoryInputView) -> Result<CategoryRow, CmsError> {
        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", &input.name);
        errors.into_result()?;

        let row = self.db.with_conn(|conn| {
            let existing = categories::get_category(conn, id)?
                .ok_or_else(|| CmsError::NotFound(format!("category {}", id)))?;
            let slug = if existing.name == name {
                existing.slug
            } else {
                unique_slug(conn, SlugScope::Categories, &name, Some(id))?
            };
            categories::update_category(conn, id, &name, &slug)?
                .ok_or_else(|| CmsError::NotFound(format!("category {}", id)))
        })?;

        self.events.emit(ContentEvent::Updated {
            collection: Collection::Categories,
            id,
            title: row.name.clone(),
        });
        Ok(row)
    }

    pub fn delete_category(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self.db.with_conn(|conn| categories::delete_category(conn, id))?;
        if deleted {
            self.events.emit(ContentEvent::Deleted {
                collection: Collection::Categories,
                id,
            });
        }
        Ok(deleted)
    }

    // =========================================================================
    // Articles
    // =========================================================================

    /// List articles; the public site passes `published_only`
    pub fn list(
        &self,
        query: &ListQuery,
        request: PageRequest,
        published_only: bool,
    ) -> Result<Page<ArticleRow>, CmsError> {
        self.db
            .with_conn(|conn| articles::list_articles(conn, query, request, published_only))
    }

    pub fn latest_published(&self, limit: u32) -> Result<Vec<ArticleRow>, CmsError> {
        self.db.with_conn(|conn| articles::latest_published(conn, limit))
    }

    pub fn get(&self, id: i64) -> Result<Option<ArticleRow>, CmsError> {
        self.db.with_conn(|conn| articles::get_article(conn, id))
    }

    /// Published article by slug; drafts are invisible to the public site
    pub fn get_published_by_slug(&self, slug: &str) -> Result<Option<ArticleRow>, CmsError> {
        let row = self.db.with_conn(|conn| articles::get_article_by_slug(conn, slug))?;
        Ok(row.filter(|a| a.published))
    }

    pub async fn create(&self, input: ArticleInputView) -> Result<ArticleRow, CmsError> {
        let validated = self.validate(input)?;

        let mut pending = self.media.begin();
        let thumbnail = pending
            .apply("thumbnail", validated.thumbnail, None, &self.thumbnail)
            .await?;

        let result = self.db.with_conn(|conn| {
            let slug = unique_slug(conn, SlugScope::Articles, &validated.title, None)?;
            articles::create_article(
                conn,
                &ArticleRecord {
                    category_id: validated.category_id,
                    title: validated.title.clone(),
                    slug,
                    excerpt: validated.excerpt.clone(),
                    body: validated.body.clone(),
                    thumbnail,
                    published: validated.published,
                    published_at: published_at(validated.published, validated.published_at.clone(), None),
                },
            )
        });
        let row = pending.finish(result).await?;

        self.events.emit(ContentEvent::Created {
            collection: Collection::Articles,
            id: row.id,
            title: row.title.clone(),
        });
        Ok(row)
    }

    pub async fn update(&self, id: i64, input: ArticleInputView) -> Result<ArticleRow, CmsError> {
        let existing = self
            .get(id)?
            .ok_or_else(|| CmsError::NotFound(format!("article {}", id)))?;
        let validated = self.validate(input)?;

        let mut pending = self.media.begin();
        let thumbnail = pending
            .apply("thumbnail", validated.thumbnail, existing.thumbnail.clone(), &self.thumbnail)
            .await?;

        let result = self.db.with_conn(|conn| {
            let slug = if existing.title == validated.title {
                existing.slug.clone()
            } else {
                unique_slug(conn, SlugScope::Articles, &validated.title, Some(id))?
            };
            articles::update_article(
                conn,
                id,
                &ArticleRecord {
                    category_id: validated.category_id,
                    title: validated.title.clone(),
                    slug,
                    excerpt: validated.excerpt.clone(),
                    body: validated.body.clone(),
                    thumbnail,
                    published: validated.published,
                    published_at: published_at(
                        validated.published,
                        validated.published_at.clone(),
                        existing.published_at.clone(),
                    ),
                },
            )?
            .ok_or_else(|| CmsError::NotFound(format!("article {}", id)))
        });
        let row = pending.finish(result).await?;

        self.events.emit(ContentEvent::Updated {
            collection: Collection::Articles,
            id,
            title: row.title.clone(),
        });
        Ok(row)
    }

    pub fn delete(&self, id: i64) -> Result<bool, CmsError> {
        let deleted = self.db.with_conn(|conn| articles::delete_article(conn, id))?;
        if deleted {
            self.events.emit(ContentEvent::Deleted {
                collection: Collection::Articles,
                id,
            });
        }
        Ok(deleted)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn validate(&self, input: ArticleInputView) -> Result<ValidatedArticle, CmsError> {
        let mut errors = FieldErrors::new();
        let title = required(&mut errors, "title", &input.title);
        let published_at = optional_date(&mut errors, "publishedAt", input.published_at);
        let thumbnail = media::decode(&mut errors, "thumbnail", input.thumbnail, &self.thumbnail);

        if let Some(category_id) = input.category_id {
            if self.get_category(category_id)?.is_none() {
                errors.add("categoryId", "category does not exist");
            }
        }
        errors.into_result()?;

        Ok(ValidatedArticle {
            category_id: input.category_id,
            title,
            excerpt: optional(input.excerpt),
            body: input.body.trim().to_string(),
            published: input.published,
            published_at,
            thumbnail,
        })
    }
}

struct ValidatedArticle {
    category_id: Option<i64>,
    title: String,
    excerpt: Option<String>,
    body: String,
    published: bool,
    published_at: Option<String>,
    thumbnail: media::ImageChange,
}

/// A published article always has a publication date
fn published_at(published: bool, requested: Option<String>, existing: Option<String>) -> Option<String> {
    match requested.or(existing) {
        Some(date) => Some(date),
        None if published => Some(crate::db::now()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::BlobStore;
    use tempfile::TempDir;

    async fn service(temp_dir: &TempDir) -> ArticleService {
        let db = Arc::new(CmsDb::open_in_memory().unwrap());
        let images = Arc::new(BlobStore::new(temp_dir.path(), "http://localhost").await.unwrap());
        let media = Arc::new(MediaGate::new(db.clone(), images.clone()));
        ArticleService::new(db, media, Arc::new(EventBus::new()), UploadConstraints::images(1024))
    }

    fn article(title: &str, published: bool) -> ArticleInputView {
        ArticleInputView {
            title: title.into(),
            body: "Isi berita".into(),
            published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_unique_slugs() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;

        let first = service.create(article("Upacara 17 Agustus", true)).await.unwrap();
        let second = service.create(article("Upacara 17 Agustus!", true)).await.unwrap();

        assert_eq!(first.slug, "upacara-17-agustus");
        assert_eq!(second.slug, "upacara-17-agustus-1");
        assert!(first.published_at.is_some());
    }

    #[tokio::test]
    async fn test_validation_collects_fields() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;

        let err = service
            .create(ArticleInputView {
                category_id: Some(99),
                published_at: Some("kemarin".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        let CmsError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("title").is_some());
        assert!(fields.get("categoryId").is_some());
        assert!(fields.get("publishedAt").is_some());
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_public() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;

        let draft = service.create(article("Draf Pengumuman", false)).await.unwrap();
        assert!(service.get_published_by_slug(&draft.slug).unwrap().is_none());
        assert!(draft.published_at.is_none());

        let page = service
            .list(&ListQuery::default(), PageRequest::new(None, None, 10), true)
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_rename_regenerates_slug_without_self_collision() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;

        let created = service.create(article("Lomba", true)).await.unwrap();
        let same = service.update(created.id, article("Lomba", true)).await.unwrap();
        assert_eq!(same.slug, "lomba");

        let renamed = service.update(created.id, article("Lomba Debat", true)).await.unwrap();
        assert_eq!(renamed.slug, "lomba-debat");
        assert_eq!(renamed.published_at, created.published_at);
    }

    #[tokio::test]
    async fn test_deleting_category_keeps_articles() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;

        let category = service
            .create_category(CategoryInputView { name: "Prestasi".into() })
            .unwrap();
        let created = service
            .create(ArticleInputView {
                category_id: Some(category.id),
                ..article("Juara LKS", true)
            })
            .await
            .unwrap();
        assert_eq!(created.category_slug.as_deref(), Some("prestasi"));

        assert!(service.delete_category(category.id).unwrap());
        let reloaded = service.get(created.id).unwrap().unwrap();
        assert_eq!(reloaded.category_id, None);
    }
}
