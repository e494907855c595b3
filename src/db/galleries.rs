//! Gallery CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: String,
    pub taken_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GalleryRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            slug: row.get("slug")?,
            description: row.get("description")?,
            image: row.get("image")?,
            taken_at: row.get("taken_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRecord {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: String,
    pub taken_at: Option<String>,
}

pub fn get_gallery(conn: &Connection, id: i64) -> Result<Option<GalleryRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM galleries WHERE id = ?", params![id], GalleryRow::from_row)
        .optional()?)
}

pub fn get_gallery_by_slug(conn: &Connection, slug: &str) -> Result<Option<GalleryRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM galleries WHERE slug = ?", params![slug], GalleryRow::from_row)
        .optional()?)
}

/// Newest first
pub fn list_galleries(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
) -> Result<Page<GalleryRow>, CmsError> {
    let mut filter = Filter::new();
    filter.search(&["title"], query.search.as_deref());
    filter.fetch_page(
        conn,
        "*",
        "galleries",
        "COALESCE(taken_at, created_at) DESC, id DESC",
        request,
        |row| GalleryRow::from_row(row),
    )
}

pub fn create_gallery(conn: &Connection, record: &GalleryRecord) -> Result<GalleryRow, CmsError> {
    let now = super::now();
    conn.execute(
        "INSERT INTO galleries (title, slug, description, image, taken_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            record.title,
            record.slug,
            record.description,
            record.image,
            record.taken_at,
            now,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_gallery(conn, id)?
        .ok_or_else(|| CmsError::Internal("Gallery item not found after insert".to_string()))
}

pub fn update_gallery(
    conn: &Connection,
    id: i64,
    record: &GalleryRecord,
) -> Result<Option<GalleryRow>, CmsError> {
    let changes = conn.execute(
        "UPDATE galleries SET title = ?, slug = ?, description = ?, image = ?, taken_at = ?, updated_at = ?
         WHERE id = ?",
        params![
            record.title,
            record.slug,
            record.description,
            record.image,
            record.taken_at,
            super::now(),
            id
        ],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_gallery(conn, id)
}

pub fn delete_gallery(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM galleries WHERE id = ?", params![id])?;
    Ok(changes > 0)
}
