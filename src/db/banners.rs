//! Landing page banner CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerRow {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: String,
    pub link_url: Option<String>,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BannerRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            subtitle: row.get("subtitle")?,
            image: row.get("image")?,
            link_url: row.get("link_url")?,
            sort_order: row.get("sort_order")?,
            active: row.get::<_, i64>("active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerRecord {
    pub title: String,
    pub subtitle: Option<String>,
    pub image: String,
    pub link_url: Option<String>,
    pub sort_order: i64,
    pub active: bool,
}

const ORDER_BY: &str = "sort_order, id";

pub fn get_banner(conn: &Connection, id: i64) -> Result<Option<BannerRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM banners WHERE id = ?", params![id], BannerRow::from_row)
        .optional()?)
}

pub fn list_banners(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
) -> Result<Page<BannerRow>, CmsError> {
    let mut filter = Filter::new();
    filter.search(&["title"], query.search.as_deref());
    filter.fetch_page(conn, "*", "banners", ORDER_BY, request, |row| BannerRow::from_row(row))
}

/// Banners shown on the landing page carousel
pub fn active_banners(conn: &Connection) -> Result<Vec<BannerRow>, CmsError> {
    let sql = format!("SELECT * FROM banners WHERE active = 1 ORDER BY {}", ORDER_BY);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], BannerRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_banner(conn: &Connection, record: &BannerRecord) -> Result<BannerRow, CmsError> {
    let now = super::now();
    conn.execute(
        r#"
        INSERT INTO banners (title, subtitle, image, link_url, sort_order, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            record.title,
            record.subtitle,
            record.image,
            record.link_url,
            record.sort_order,
            record.active as i64,
            now,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_banner(conn, id)?.ok_or_else(|| CmsError::Internal("Banner not found after insert".to_string()))
}

pub fn update_banner(conn: &Connection, id: i64, record: &BannerRecord) -> Result<Option<BannerRow>, CmsError> {
    let changes = conn.execute(
        r#"
        UPDATE banners SET
            title = ?, subtitle = ?, image = ?, link_url = ?, sort_order = ?,
            active = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            record.title,
            record.subtitle,
            record.image,
            record.link_url,
            record.sort_order,
            record.active as i64,
            super::now(),
            id,
        ],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_banner(conn, id)
}

pub fn delete_banner(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM banners WHERE id = ?", params![id])?;
    Ok(changes > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CmsDb;

    fn banner(title: &str, sort_order: i64, active: bool) -> BannerRecord {
        BannerRecord {
            title: title.into(),
            subtitle: None,
            image: "sha256-x.png".into(),
            link_url: None,
            sort_order,
            active,
        }
    }

    #[test]
    fn test_active_banners_sorted_and_filtered() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            create_banner(conn, &banner("Ketiga", 3, true))?;
            create_banner(conn, &banner("Pertama", 1, true))?;
            create_banner(conn, &banner("Nonaktif", 2, false))?;

            let titles: Vec<String> = active_banners(conn)?.into_iter().map(|b| b.title).collect();
            assert_eq!(titles, vec!["Pertama", "Ketiga"]);
            Ok(())
        })
        .unwrap();
    }
}
