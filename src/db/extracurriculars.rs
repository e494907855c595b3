//! Extracurricular CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtracurricularRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ExtracurricularRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            description: row.get("description")?,
            image: row.get("image")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtracurricularRecord {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

pub fn get_extracurricular(conn: &Connection, id: i64) -> Result<Option<ExtracurricularRow>, CmsError> {
    Ok(conn
        .query_row(
            "SELECT * FROM extracurriculars WHERE id = ?",
            params![id],
            ExtracurricularRow::from_row,
        )
        .optional()?)
}

pub fn get_extracurricular_by_slug(
    conn: &Connection,
    slug: &str,
) -> Result<Option<ExtracurricularRow>, CmsError> {
    Ok(conn
        .query_row(
            "SELECT * FROM extracurriculars WHERE slug = ?",
            params![slug],
            ExtracurricularRow::from_row,
        )
        .optional()?)
}

pub fn list_extracurriculars(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
) -> Result<Page<ExtracurricularRow>, CmsError> {
    let mut filter = Filter::new();
    filter.search(&["name"], query.search.as_deref());
    filter.fetch_page(conn, "*", "extracurriculars", "name COLLATE NOCASE, id", request, |row| {
        ExtracurricularRow::from_row(row)
    })
}

pub fn create_extracurricular(
    conn: &Connection,
    record: &ExtracurricularRecord,
) -> Result<ExtracurricularRow, CmsError> {
    let now = super::now();
    conn.execute(
        "INSERT INTO extracurriculars (name, slug, description, image, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![record.name, record.slug, record.description, record.image, now, now],
    )?;
    let id = conn.last_insert_rowid();
    get_extracurricular(conn, id)?
        .ok_or_else(|| CmsError::Internal("Extracurricular not found after insert".to_string()))
}

pub fn update_extracurricular(
    conn: &Connection,
    id: i64,
    record: &ExtracurricularRecord,
) -> Result<Option<ExtracurricularRow>, CmsError> {
    let changes = conn.execute(
        "UPDATE extracurriculars SET name = ?, slug = ?, description = ?, image = ?, updated_at = ?
         WHERE id = ?",
        params![record.name, record.slug, record.description, record.image, super::now(), id],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_extracurricular(conn, id)
}

pub fn delete_extracurricular(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM extracurriculars WHERE id = ?", params![id])?;
    Ok(changes > 0)
}
