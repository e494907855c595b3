//! HTTP API for the school website
//!
//! ## Public API (no auth)
//! - `GET /health` - Liveness and storage counts
//! - `GET /api/home` - Landing page aggregate
//! - `GET /api/profile` - Settings plus organization chart
//! - `GET /api/structure` - Organization chart
//! - `GET /api/categories` - Article categories
//! - `GET /api/{articles|majors|extracurriculars|galleries|achievements}` - Paged listings
//! - `GET /api/{collection}/{slug}` - Detail page; a missing slug redirects (303) to the listing
//! - `GET /media/{reference}` - Stored image
//!
//! ## Admin API (`Authorization: Bearer <admin_token>`)
//! - `GET|POST /admin/api/{collection}`
//! - `GET|PUT|DELETE /admin/api/{collection}/{id}`
//! - `GET|PUT /admin/api/settings`
//! - `GET|PUT /admin/api/structure`
//!
//! Listings accept `page`, `per_page` and `search`; articles also take
//! `category` (a category slug).
//!
//! ## Example Usage
//!
//! ```bash
//! # Latest news, second page
//! curl 'http://localhost:8080/api/articles?page=2&category=pengumuman'
//!
//! # Rename a position holder on the chart
//! curl -X PUT -H "Authorization: Bearer $CMS_ADMIN_TOKEN" \
//!      -d '{"positions": [{"order": 1, "name": "Drs. Budi Santoso"}]}' \
//!      http://localhost:8080/admin/api/structure
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::auth::AdminAuth;
use crate::blob_store::{BlobStore, ImageStore};
use crate::config::Config;
use crate::db::{CmsDb, ListQuery};
use crate::error::CmsError;
use crate::services::response::{self, HandlerResult};
use crate::services::structure_service::StructureEditor;
use crate::services::{Collection, Services};
use crate::views::{
    AchievementView, ArticleView, BannerView, CategoryView, ExtracurricularView, GalleryView, HomeView,
    MajorView, PositionView, ProfileView, SettingsView, StructureView,
};

/// Largest accepted request body. A full chart save carries one base64
/// image per position.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    blobs: Arc<BlobStore>,
    db: Arc<CmsDb>,
    auth: AdminAuth,
    default_per_page: u32,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(
        services: Arc<Services>,
        blobs: Arc<BlobStore>,
        db: Arc<CmsDb>,
        config: &Config,
        bind_addr: SocketAddr,
    ) -> Self {
        Self {
            services,
            blobs,
            db,
            auth: AdminAuth::new(config.admin_token.clone()),
            default_per_page: config.default_per_page,
            bind_addr,
        }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), CmsError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, admin = self.auth.is_configured(), "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.handle_request(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    fn images(&self) -> &dyn ImageStore {
        self.blobs.as_ref()
    }

    /// Route a request and turn any error into a response
    pub async fn handle_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!(
            "request",
            id = %request_id,
            method = %req.method(),
            path = %req.uri().path()
        );

        async move {
            debug!("Incoming request");
            let response = match self.route(req).await {
                Ok(response) => response,
                Err(e) => response::error_response(e),
            };
            debug!(status = response.status().as_u16(), "Request complete");
            response
        }
        .instrument(span)
        .await
    }

    async fn route<B>(&self, req: Request<B>) -> HandlerResult
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = ListQuery::from_query_string(req.uri().query());
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (&method, segments.as_slice()) {
            (&Method::GET, ["health"]) => self.handle_health().await,
            (&Method::GET, ["media", reference]) => self.handle_media(reference).await,

            // Public site
            (&Method::GET, ["api", "home"]) => self.handle_home(),
            (&Method::GET, ["api", "profile"]) => self.handle_profile(),
            (&Method::GET, ["api", "structure"]) => {
                let editor = self.services.structure.load()?;
                Ok(response::ok(&self.structure_view(editor)))
            }
            (&Method::GET, ["api", "categories"]) => {
                let categories = self.services.articles.all_categories()?;
                let views: Vec<CategoryView> = categories.into_iter().map(CategoryView::from).collect();
                Ok(response::ok(&views))
            }
            (&Method::GET, ["api", collection]) => match public_collection(collection) {
                Some(collection) => self.public_list(collection, &path, &query),
                None => Ok(response::not_found("Route not found")),
            },
            (&Method::GET, ["api", collection, slug]) => match public_collection(collection) {
                Some(collection) => self.public_detail(collection, slug),
                None => Ok(response::not_found("Route not found")),
            },

            // Back office
            (_, ["admin", "api", rest @ ..]) => {
                self.auth.check(req.headers())?;
                self.route_admin(req, &method, &path, rest, &query).await
            }

            (m, ["api", ..]) | (m, ["media", _]) | (m, ["health"]) if *m != Method::GET => {
                Ok(response::method_not_allowed())
            }
            _ => Ok(response::not_found("Route not found")),
        }
    }

    async fn route_admin<B>(
        &self,
        req: Request<B>,
        method: &Method,
        path: &str,
        rest: &[&str],
        query: &ListQuery,
    ) -> HandlerResult
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match (method, rest) {
            (&Method::GET, ["settings"]) => {
                let settings = self.services.settings.get()?;
                Ok(response::ok(&SettingsView::build(settings, self.images())))
            }
            (&Method::PUT, ["settings"]) => {
                let input = read_json(req).await?;
                let settings = self.services.settings.update(input).await?;
                Ok(response::ok(&SettingsView::build(settings, self.images())))
            }
            (&Method::GET, ["structure"]) => {
                let editor = self.services.structure.load()?;
                Ok(response::ok(&self.structure_view(editor)))
            }
            (&Method::PUT, ["structure"]) => {
                let input = read_json(req).await?;
                let editor = self.services.structure.save(input).await?;
                Ok(response::ok(&self.structure_view(editor)))
            }
            (_, ["settings"]) | (_, ["structure"]) => Ok(response::method_not_allowed()),

            (_, [segment]) | (_, [segment, _]) if Collection::from_segment(segment).is_none() => {
                Ok(response::not_found("Route not found"))
            }
            (&Method::GET, [segment]) => self.admin_list(admin_collection(segment)?, path, query),
            (&Method::POST, [segment]) => {
                let collection = admin_collection(segment)?;
                let body = read_body(req).await?;
                let view = self.admin_save(collection, None, &body).await?;
                Ok(response::created(&view))
            }
            (&Method::GET, [segment, id]) => self.admin_get(admin_collection(segment)?, parse_id(id)?),
            (&Method::PUT, [segment, id]) => {
                let (collection, id) = (admin_collection(segment)?, parse_id(id)?);
                let body = read_body(req).await?;
                let view = self.admin_save(collection, Some(id), &body).await?;
                Ok(response::ok(&view))
            }
            (&Method::DELETE, [segment, id]) => {
                let (collection, id) = (admin_collection(segment)?, parse_id(id)?);
                self.admin_delete(collection, id)
            }
            (_, [_]) | (_, [_, _]) => Ok(response::method_not_allowed()),
            _ => Ok(response::not_found("Route not found")),
        }
    }

    // =========================================================================
    // Public handlers
    // =========================================================================

    /// GET /health
    async fn handle_health(&self) -> HandlerResult {
        let content = self.db.stats()?;
        let media = self.blobs.stats().await?;
        Ok(response::ok(&serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "content": content,
            "media": media,
        })))
    }

    /// GET /media/{reference}
    async fn handle_media(&self, reference: &str) -> HandlerResult {
        let (data, mime_type) = self.blobs.get(reference).await?;
        debug!(reference = %reference, size = data.len(), "Serving media");
        Ok(response::binary_response(mime_type, data))
    }

    fn handle_home(&self) -> HandlerResult {
        let home = self.services.site.home()?;
        let images = self.images();
        Ok(response::ok(&HomeView {
            settings: SettingsView::build(home.settings, images),
            banners: home.banners.into_iter().map(|b| BannerView::build(b, images)).collect(),
            latest_articles: home
                .latest_articles
                .into_iter()
                .map(|a| ArticleView::build(a, images))
                .collect(),
            majors: home.majors.into_iter().map(|m| MajorView::build(m, images)).collect(),
            galleries: home.galleries.into_iter().map(|g| GalleryView::build(g, images)).collect(),
            achievements: home
                .achievements
                .into_iter()
                .map(|a| AchievementView::build(a, images))
                .collect(),
        }))
    }

    fn handle_profile(&self) -> HandlerResult {
        let profile = self.services.site.profile()?;
        Ok(response::ok(&ProfileView {
            settings: SettingsView::build(profile.settings, self.images()),
            structure: self.structure_view(profile.structure),
        }))
    }

    fn public_list(&self, collection: Collection, path: &str, query: &ListQuery) -> HandlerResult {
        let request = query.page_request(self.default_per_page);
        let links = query.link_params();
        let images = self.images();
        let catalog = &self.services.catalog;

        let body = match collection {
            Collection::Articles => {
                let page = self.services.articles.list(query, request, true)?;
                to_json(&page.map(|a| ArticleView::build(a, images)).with_links(path, &links))?
            }
            Collection::Majors => {
                let page = catalog.list_majors(query, request)?;
                to_json(&page.map(|m| MajorView::build(m, images)).with_links(path, &links))?
            }
            Collection::Extracurriculars => {
                let page = catalog.list_extracurriculars(query, request)?;
                to_json(&page.map(|e| ExtracurricularView::build(e, images)).with_links(path, &links))?
            }
            Collection::Galleries => {
                let page = catalog.list_galleries(query, request)?;
                to_json(&page.map(|g| GalleryView::build(g, images)).with_links(path, &links))?
            }
            Collection::Achievements => {
                let page = catalog.list_achievements(query, request)?;
                to_json(&page.map(|a| AchievementView::build(a, images)).with_links(path, &links))?
            }
            Collection::Categories | Collection::Banners => {
                return Ok(response::not_found("Route not found"));
            }
        };
        Ok(response::ok(&body))
    }

    /// Detail page by slug. A missing page redirects to its listing.
    fn public_detail(&self, collection: Collection, slug: &str) -> HandlerResult {
        let images = self.images();
        let catalog = &self.services.catalog;

        let (found, label) = match collection {
            Collection::Articles => (
                self.services
                    .articles
                    .get_published_by_slug(slug)?
                    .map(|a| to_json(&ArticleView::build(a, images)))
                    .transpose()?,
                "Article",
            ),
            Collection::Majors => (
                catalog
                    .get_major_by_slug(slug)?
                    .map(|m| to_json(&MajorView::build(m, images)))
                    .transpose()?,
                "Major",
            ),
            Collection::Extracurriculars => (
                catalog
                    .get_extracurricular_by_slug(slug)?
                    .map(|e| to_json(&ExtracurricularView::build(e, images)))
                    .transpose()?,
                "Extracurricular",
            ),
            Collection::Galleries => (
                catalog
                    .get_gallery_by_slug(slug)?
                    .map(|g| to_json(&GalleryView::build(g, images)))
                    .transpose()?,
                "Gallery item",
            ),
            Collection::Achievements => (
                catalog
                    .get_achievement_by_slug(slug)?
                    .map(|a| to_json(&AchievementView::build(a, images)))
                    .transpose()?,
                "Achievement",
            ),
            Collection::Categories | Collection::Banners => {
                return Ok(response::not_found("Route not found"));
            }
        };

        match found {
            Some(body) => Ok(response::ok(&body)),
            None => {
                debug!(collection = %collection, slug = %slug, "Detail page not found, redirecting");
                Ok(response::redirect_with_message(
                    &format!("/api/{}", collection),
                    &format!("{} not found", label),
                ))
            }
        }
    }

    // =========================================================================
    // Admin handlers
    // =========================================================================

    fn admin_list(&self, collection: Collection, path: &str, query: &ListQuery) -> HandlerResult {
        let request = query.page_request(self.default_per_page);
        let links = query.link_params();
        let images = self.images();

        let body = match collection {
            Collection::Articles => {
                let page = self.services.articles.list(query, request, false)?;
                to_json(&page.map(|a| ArticleView::build(a, images)).with_links(path, &links))?
            }
            Collection::Categories => {
                let page = self.services.articles.list_categories(query, request)?;
                to_json(&page.map(CategoryView::from).with_links(path, &links))?
            }
            Collection::Banners => {
                let page = self.services.banners.list(query, request)?;
                to_json(&page.map(|b| BannerView::build(b, images)).with_links(path, &links))?
            }
            other => return self.public_list(other, path, query),
        };
        Ok(response::ok(&body))
    }

    fn admin_get(&self, collection: Collection, id: i64) -> HandlerResult {
        let images = self.images();
        let catalog = &self.services.catalog;

        let found = match collection {
            Collection::Articles => self
                .services
                .articles
                .get(id)?
                .map(|a| to_json(&ArticleView::build(a, images))),
            Collection::Categories => self
                .services
                .articles
                .get_category(id)?
                .map(|c| to_json(&CategoryView::from(c))),
            Collection::Majors => catalog.get_major(id)?.map(|m| to_json(&MajorView::build(m, images))),
            Collection::Extracurriculars => catalog
                .get_extracurricular(id)?
                .map(|e| to_json(&ExtracurricularView::build(e, images))),
            Collection::Banners => self
                .services
                .banners
                .get(id)?
                .map(|b| to_json(&BannerView::build(b, images))),
            Collection::Galleries => catalog
                .get_gallery(id)?
                .map(|g| to_json(&GalleryView::build(g, images))),
            Collection::Achievements => catalog
                .get_achievement(id)?
                .map(|a| to_json(&AchievementView::build(a, images))),
        };

        match found.transpose()? {
            Some(body) => Ok(response::ok(&body)),
            None => Err(CmsError::NotFound(format!("{} {}", collection, id))),
        }
    }

    /// Create (`id` is `None`) or update a record from a JSON body
    async fn admin_save(
        &self,
        collection: Collection,
        id: Option<i64>,
        body: &[u8],
    ) -> Result<serde_json::Value, CmsError> {
        let images = self.images();
        let catalog = &self.services.catalog;
        let articles = &self.services.articles;

        match collection {
            Collection::Articles => {
                let input = parse_json(body)?;
                let row = match id {
                    Some(id) => articles.update(id, input).await?,
                    None => articles.create(input).await?,
                };
                to_json(&ArticleView::build(row, images))
            }
            Collection::Categories => {
                let input = parse_json(body)?;
                let row = match id {
                    Some(id) => articles.update_category(id, input)?,
                    None => articles.create_category(input)?,
                };
                to_json(&CategoryView::from(row))
            }
            Collection::Majors => {
                let row = catalog.save_major(id, parse_json(body)?).await?;
                to_json(&MajorView::build(row, images))
            }
            Collection::Extracurriculars => {
                let row = catalog.save_extracurricular(id, parse_json(body)?).await?;
                to_json(&ExtracurricularView::build(row, images))
            }
            Collection::Banners => {
                let row = self.services.banners.save(id, parse_json(body)?).await?;
                to_json(&BannerView::build(row, images))
            }
            Collection::Galleries => {
                let row = catalog.save_gallery(id, parse_json(body)?).await?;
                to_json(&GalleryView::build(row, images))
            }
            Collection::Achievements => {
                let row = catalog.save_achievement(id, parse_json(body)?).await?;
                to_json(&AchievementView::build(row, images))
            }
        }
    }

    fn admin_delete(&self, collection: Collection, id: i64) -> HandlerResult {
        let catalog = &self.services.catalog;
        let result = match collection {
            Collection::Articles => self.services.articles.delete(id),
            Collection::Categories => self.services.articles.delete_category(id),
            Collection::Majors => catalog.delete_major(id),
            Collection::Extracurriculars => catalog.delete_extracurricular(id),
            Collection::Banners => self.services.banners.delete(id),
            Collection::Galleries => catalog.delete_gallery(id),
            Collection::Achievements => catalog.delete_achievement(id),
        };
        Ok(response::from_delete_bool_result(
            result,
            &format!("Not found: {} {}", collection, id),
        ))
    }

    fn structure_view(&self, editor: StructureEditor) -> StructureView {
        let images = self.images();
        StructureView {
            section_title: editor.section_title,
            positions: editor
                .positions
                .into_iter()
                .map(|p| PositionView::build(p, images))
                .collect(),
            rows: self.services.structure.registry().rows().to_vec(),
            updated_at: editor.updated_at,
        }
    }
}

/// Collections with public listing and detail pages
fn public_collection(segment: &str) -> Option<Collection> {
    Collection::from_segment(segment)
        .filter(|c| !matches!(c, Collection::Categories | Collection::Banners))
}

fn admin_collection(segment: &str) -> Result<Collection, CmsError> {
    Collection::from_segment(segment).ok_or_else(|| CmsError::NotFound(format!("collection {}", segment)))
}

fn parse_id(id: &str) -> Result<i64, CmsError> {
    id.parse()
        .map_err(|_| CmsError::NotFound(format!("record {}", id)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, CmsError> {
    Ok(serde_json::to_value(value)?)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, CmsError> {
    if body.is_empty() {
        return Err(CmsError::BadRequest("Request body is required".into()));
    }
    Ok(serde_json::from_slice(body)?)
}

async fn read_body<B>(req: Request<B>) -> Result<Bytes, CmsError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| CmsError::BadRequest(format!("Failed to read body: {}", e)))?;
    Ok(collected.to_bytes())
}

async fn read_json<T: DeserializeOwned, B>(req: Request<B>) -> Result<T, CmsError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = read_body(req).await?;
    parse_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_collections_exclude_admin_only() {
        assert_eq!(public_collection("majors"), Some(Collection::Majors));
        assert_eq!(public_collection("banners"), None);
        assert_eq!(public_collection("categories"), None);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert!(matches!(parse_id("abc"), Err(CmsError::NotFound(_))));
    }

    #[test]
    fn test_empty_body_is_bad_request() {
        let result: Result<serde_json::Value, _> = parse_json(b"");
        assert!(matches!(result, Err(CmsError::BadRequest(_))));
        let result: Result<serde_json::Value, _> = parse_json(b"{oops");
        assert!(matches!(result, Err(CmsError::Json(_))));
    }
}
