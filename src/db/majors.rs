//! Major (study program) CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

/// Major row from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MajorRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub preview_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MajorRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            abbreviation: row.get("abbreviation")?,
            description: row.get("description")?,
            thumbnail: row.get("thumbnail")?,
            preview_image: row.get("preview_image")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Column values for insert/update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MajorRecord {
    pub name: String,
    pub slug: String,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub preview_image: Option<String>,
}

pub fn get_major(conn: &Connection, id: i64) -> Result<Option<MajorRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM majors WHERE id = ?", params![id], MajorRow::from_row)
        .optional()?)
}

pub fn get_major_by_slug(conn: &Connection, slug: &str) -> Result<Option<MajorRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM majors WHERE slug = ?", params![slug], MajorRow::from_row)
        .optional()?)
}

/// List majors in the order they were added (the school's program order)
pub fn list_majors(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
) -> Result<Page<MajorRow>, CmsError> {
    let mut filter = Filter::new();
    filter.search(&["name", "abbreviation"], query.search.as_deref());
    filter.fetch_page(conn, "*", "majors", "id", request, |row| MajorRow::from_row(row))
}

pub fn all_majors(conn: &Connection) -> Result<Vec<MajorRow>, CmsError> {
    let mut stmt = conn.prepare("SELECT * FROM majors ORDER BY id")?;
    let rows = stmt
        .query_map([], MajorRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_major(conn: &Connection, record: &MajorRecord) -> Result<MajorRow, CmsError> {
    let now = super::now();
    conn.execute(
        r#"
        INSERT INTO majors (
            name, slug, abbreviation, description, thumbnail, preview_image,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            record.name,
            record.slug,
            record.abbreviation,
            record.description,
            record.thumbnail,
            record.preview_image,
            now,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_major(conn, id)?.ok_or_else(|| CmsError::Internal("Major not found after insert".to_string()))
}

pub fn update_major(conn: &Connection, id: i64, record: &MajorRecord) -> Result<Option<MajorRow>, CmsError> {
    let changes = conn.execute(
        r#"
        UPDATE majors SET
            name = ?, slug = ?, abbreviation = ?, description = ?,
            thumbnail = ?, preview_image = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            record.name,
            record.slug,
            record.abbreviation,
            record.description,
            record.thumbnail,
            record.preview_image,
            super::now(),
            id,
        ],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_major(conn, id)
}

pub fn delete_major(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM majors WHERE id = ?", params![id])?;
    Ok(changes > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CmsDb;

    #[test]
    fn test_search_matches_abbreviation() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            create_major(
                conn,
                &MajorRecord {
                    name: "Teknik Komputer dan Jaringan".into(),
                    slug: "teknik-komputer-dan-jaringan".into(),
                    abbreviation: Some("TKJ".into()),
                    description: None,
                    thumbnail: None,
                    preview_image: None,
                },
            )?;
            let found = list_majors(
                conn,
                &ListQuery { search: Some("tkj".into()), ..Default::default() },
                PageRequest::new(None, None, 10),
            )?;
            assert_eq!(found.total, 1);
            assert!(get_major_by_slug(conn, "teknik-komputer-dan-jaringan")?.is_some());
            Ok(())
        })
        .unwrap();
    }
}
