//! Article CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::pagination::{Filter, ListQuery, Page, PageRequest};
use crate::error::CmsError;

/// Article row from database, joined with its category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRow {
    pub id: i64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub thumbnail: Option<String>,
    pub published: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ArticleRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            category_id: row.get("category_id")?,
            category_name: row.get("category_name")?,
            category_slug: row.get("category_slug")?,
            title: row.get("title")?,
            slug: row.get("slug")?,
            excerpt: row.get("excerpt")?,
            body: row.get("body")?,
            thumbnail: row.get("thumbnail")?,
            published: row.get::<_, i64>("published")? != 0,
            published_at: row.get("published_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Column values for insert/update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub category_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub thumbnail: Option<String>,
    pub published: bool,
    pub published_at: Option<String>,
}

const COLUMNS: &str = "a.*, c.name AS category_name, c.slug AS category_slug";
const FROM: &str = "articles a LEFT JOIN categories c ON c.id = a.category_id";

pub fn get_article(conn: &Connection, id: i64) -> Result<Option<ArticleRow>, CmsError> {
    let sql = format!("SELECT {} FROM {} WHERE a.id = ?", COLUMNS, FROM);
    Ok(conn.query_row(&sql, params![id], ArticleRow::from_row).optional()?)
}

pub fn get_article_by_slug(conn: &Connection, slug: &str) -> Result<Option<ArticleRow>, CmsError> {
    let sql = format!("SELECT {} FROM {} WHERE a.slug = ?", COLUMNS, FROM);
    Ok(conn.query_row(&sql, params![slug], ArticleRow::from_row).optional()?)
}

/// List articles, newest first.
///
/// `published_only` hides drafts (public site). The category filter matches
/// the category slug.
pub fn list_articles(
    conn: &Connection,
    query: &ListQuery,
    request: PageRequest,
    published_only: bool,
) -> Result<Page<ArticleRow>, CmsError> {
    let mut filter = Filter::new();
    if published_only {
        filter.push_raw("a.published = 1");
    }
    if let Some(ref category) = query.category {
        filter.push("c.slug = ?", category.clone());
    }
    filter.search(&["a.title"], query.search.as_deref());

    let order_by = if published_only {
        "COALESCE(a.published_at, a.created_at) DESC, a.id DESC"
    } else {
        "a.created_at DESC, a.id DESC"
    };
    filter.fetch_page(conn, COLUMNS, FROM, order_by, request, |row| ArticleRow::from_row(row))
}

/// Most recent published articles
pub fn latest_published(conn: &Connection, limit: u32) -> Result<Vec<ArticleRow>, CmsError> {
    let page = list_articles(
        conn,
        &ListQuery::default(),
        PageRequest::new(Some(1), Some(limit), limit),
        true,
    )?;
    Ok(page.items)
}

pub fn create_article(conn: &Connection, record: &ArticleRecord) -> Result<ArticleRow, CmsError> {
    let now = super::now();
    conn.execute(
        r#"
        INSERT INTO articles (
            category_id, title, slug, excerpt, body, thumbnail,
            published, published_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            record.category_id,
            record.title,
            record.slug,
            record.excerpt,
            record.body,
            record.thumbnail,
            record.published as i64,
            record.published_at,
            now,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_article(conn, id)?
        .ok_or_else(|| CmsError::Internal("Article not found after insert".to_string()))
}

pub fn update_article(
    conn: &Connection,
    id: i64,
    record: &ArticleRecord,
) -> Result<Option<ArticleRow>, CmsError> {
    let changes = conn.execute(
        r#"
        UPDATE articles SET
            category_id = ?, title = ?, slug = ?, excerpt = ?, body = ?,
            thumbnail = ?, published = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            record.category_id,
            record.title,
            record.slug,
            record.excerpt,
            record.body,
            record.thumbnail,
            record.published as i64,
            record.published_at,
            super::now(),
            id,
        ],
    )?;
    if changes == 0 {
        return Ok(None);
    }
    get_article(conn, id)
}

pub fn delete_article(conn: &Connection, id: i64) -> Result<bool, CmsError> {
    let changes = conn.execute("DELETE FROM articles WHERE id = ?", params![id])?;
    Ok(changes > 0)
}
