//! Achievement CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Competition level, e.g. "Kabupaten", "Provinsi", "Nasional"
    pub level: Option<String>,
    pub achieved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AchievementRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            slug: row.get("slug")?,
            description: row.get("description")?,
            image: row.get("image")?,
            level: row.get("level")?,
            achieved_at: row.get("achieved_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementRecord {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub level: Option<String>,
    pub achieved_at: Option<String>,
}

pub fn get_achievement(conn: &Connection, id: i64) -> Result<Option<AchievementRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM achievements WHERE id = ?", params![id], AchievementRow::from_row)
        .optional()?)
}

pub fn get_achievement_by_slug(conn: &Connection, slug: &str) -> Result<Option<AchievementRow>, CmsError> {
    Ok(conn
        .query_row(
            "SELECT * FROM achievements WHERE slug = ?",
            params![slug],
            AchievementRow::from_row,
        )
        .optional()?)
}

/// Most recent first
pub fn list_achievements(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
) -> Result<Page<AchievementRow>, CmsError> {
    let mut filter = Filter::new();
    filter.search(&["title"], query.search.as_deref());
    filter.fetch_page(
        conn,
        "*",
        "achievements",
        "COALESCE(achieved_at, created_at) DESC, id DESC",
        request,
        |row| AchievementRow::from_row(row),
    )
}

pub fn create_achievement(conn: &Connection, record: &AchievementRecord) -> Result<AchievementRow, CmsError> {
    let now = super::now();
    conn.execute(
        r#"
        INSERT INTO achievements (
            title, slug, description, image, level, achieved_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            record.title,
            record.slug,
            record.description,
            record.image,
            record.level,
            record.achieved_at,
            now,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_achievement(conn, id)?
        .ok_or_else(|| CmsError::Internal("Achievement not found after insert".to_string()))
}

pub fn update_achievement(
    conn: &Connection,
    id: i64,
    record: &AchievementRecord,
) -> Result<Option<AchievementRow>, CmsError> {
    let changes = conn.execute(
        r#"
        UPDATE achievements SET
            title = ?, slug = ?, description = ?, image = ?, level = ?,
            achieved_at = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            record.title,
            record.slug,
            record.description,
            record.image,
            record.level,
            record.achieved_at,
            super::now(),
            id,
        ],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_achievement(conn, id)
}

pub fn delete_achievement(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM achievements WHERE id = ?", params![id])?;
    Ok(changes > 0)
}
