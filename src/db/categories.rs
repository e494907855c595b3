//! Article category CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

/// Category row from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Number of articles filed under this category
    pub article_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl CategoryRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            article_count: row.get("article_count")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const COLUMNS: &str = "c.*, (SELECT COUNT(*) FROM articles a WHERE a.category_id = c.id) AS article_count";

pub fn get_category(conn: &Connection, id: i64) -> Result<Option<CategoryRow>, CmsError> {
    let sql = format!("SELECT {} FROM categories c WHERE c.id = ?", COLUMNS);
    Ok(conn.query_row(&sql, params![id], CategoryRow::from_row).optional()?)
}

pub fn get_category_by_slug(conn: &Connection, slug: &str) -> Result<Option<CategoryRow>, CmsError> {
    let sql = format!("SELECT {} FROM categories c WHERE c.slug = ?", COLUMNS);
    Ok(conn.query_row(&sql, params![slug], CategoryRow::from_row).optional()?)
}

pub fn list_categories(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
) -> Result<Page<CategoryRow>, CmsError> {
    let mut filter = Filter::new();
    filter.search(&["c.name"], query.search.as_deref());
    filter.fetch_page(conn, COLUMNS, "categories c", "c.name COLLATE NOCASE, c.id", request, |row| {
        CategoryRow::from_row(row)
    })
}

/// Every category, alphabetical (for menus and article forms)
pub fn all_categories(conn: &Connection) -> Result<Vec<CategoryRow>, CmsError> {
    let sql = format!(
        "SELECT {} FROM categories c ORDER BY c.name COLLATE NOCASE, c.id",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], CategoryRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_category(conn: &Connection, name: &str, slug: &str) -> Result<CategoryRow, CmsError> {
    let now = super::now();
    conn.execute(
        "INSERT INTO categories (name, slug, created_at, updated_at) VALUES (?, ?, ?, ?)",
        params![name, slug, now, now],
    )?;
    let id = conn.last_insert_rowid();
    get_category(conn, id)?
        .ok_or_else(|| CmsError::Internal("Category not found after insert".to_string()))
}

pub fn update_category(
    conn: &Connection,
    id: i64,
    name: &str,
    slug: &str,
) -> Result<Option<CategoryRow>, CmsError> {
    let changes = conn.execute(
        "UPDATE categories SET name = ?, slug = ?, updated_at = ? WHERE id = ?",
        params![name, slug, super::now(), id],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_category(conn, id)
}

/// Delete a category. Its articles become uncategorised (FK `ON DELETE SET NULL`).
pub fn delete_category(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
    Ok(changes > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CmsDb;

    #[test]
    fn test_crud() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let created = create_category(conn, "Berita", "berita")?;
            assert_eq!(created.article_count, 0);

            let by_slug = get_category_by_slug(conn, "berita")?.unwrap();
            assert_eq!(by_slug.id, created.id);

            let updated = update_category(conn, created.id, "Berita Sekolah", "berita-sekolah")?.unwrap();
            assert_eq!(updated.slug, "berita-sekolah");
            assert!(update_category(conn, 999, "x", "x")?.is_none());

            assert!(delete_category(conn, created.id)?);
            assert!(!delete_category(conn, created.id)?);
            assert!(get_category(conn, created.id)?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_all_categories_sorted_by_name() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            create_category(conn, "pengumuman", "pengumuman")?;
            create_category(conn, "Berita", "berita")?;
            let names: Vec<String> = all_categories(conn)?.into_iter().map(|c| c.name).collect();
            assert_eq!(names, vec!["Berita", "pengumuman"]);
            Ok(())
        })
        .unwrap();
    }
}
