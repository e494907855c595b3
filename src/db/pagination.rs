//! Listing filters and pagination shared by every content table

use rusqlite::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CmsError;

/// Upper bound for `per_page`
pub const MAX_PER_PAGE: u32 = 100;

/// Query parameters for listing endpoints - snake_case for URL params
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Case-insensitive substring on the title or name
    #[serde(default)]
    pub search: Option<String>,
    /// Category slug (articles only)
    #[serde(default)]
    pub category: Option<String>,
}

impl ListQuery {
    /// Parse from a raw query string; unknown keys are ignored and malformed
    /// numbers fall back to defaults
    pub fn from_query_string(query: Option<&str>) -> Self {
        let Some(query) = query else {
            return Self::default();
        };
        let mut parsed = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "page" => parsed.page = value.parse().ok(),
                "per_page" => parsed.per_page = value.parse().ok(),
                "search" if !value.is_empty() => parsed.search = Some(value.to_string()),
                "category" if !value.is_empty() => parsed.category = Some(value.to_string()),
                _ => {}
            }
        }
        parsed
    }

    /// Resolve page and size against the configured default
    pub fn page_request(&self, default_per_page: u32) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default_per_page)
    }

    /// Filter params to carry into pagination links
    pub fn link_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref category) = self.category {
            params.push(("category", category.clone()));
        }
        if let Some(ref search) = self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}

/// A clamped page number and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Navigation links for a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PageLinks {
    pub first: String,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub last: String,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
    pub links: PageLinks,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let last_page = total.div_ceil(request.per_page as u64).max(1) as u32;
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            last_page,
            links: PageLinks::default(),
        }
    }

    /// Fill in links for `path`, keeping `params` on every link
    pub fn with_links(mut self, path: &str, params: &[(&str, String)]) -> Self {
        let per_page = self.per_page.to_string();
        let link = |page: u32| {
            let mut pairs: Vec<(&str, String)> = params.to_vec();
            pairs.push(("page", page.to_string()));
            pairs.push(("per_page", per_page.clone()));
            // Serializing string pairs cannot fail
            let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
            format!("{}?{}", path, query)
        };

        self.links = PageLinks {
            first: link(1),
            prev: (self.page > 1).then(|| link((self.page - 1).min(self.last_page))),
            next: (self.page < self.last_page).then(|| link(self.page + 1)),
            last: link(self.last_page),
        };
        self
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            last_page: self.last_page,
            links: self.links,
        }
    }
}

/// WHERE clause builder
#[derive(Default)]
pub struct Filter {
    conditions: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition with one `?` placeholder
    pub fn push<P: ToSql + 'static>(&mut self, condition: &str, param: P) -> &mut Self {
        self.conditions.push(condition.to_string());
        self.params.push(Box::new(param));
        self
    }

    /// Add a condition without parameters
    pub fn push_raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// Substring match on any of `columns`
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = format!("%{}%", escape_like(term));
        let ors: Vec<String> = columns
            .iter()
            .map(|c| format!("{} LIKE ? ESCAPE '\\'", c))
            .collect();
        self.conditions.push(format!("({})", ors.join(" OR ")));
        for _ in columns {
            self.params.push(Box::new(pattern.clone()));
        }
        self
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Run `SELECT {columns} FROM {from}` with this filter, returning one page
    /// and the unpaged total
    pub fn fetch_page<T, F>(
        &self,
        conn: &Connection,
        columns: &str,
        from: &str,
        order_by: &str,
        request: PageRequest,
        map: F,
    ) -> Result<Page<T>, CmsError>
    where
        F: FnMut(&Row) -> rusqlite::Result<T>,
    {
        let where_clause = self.where_clause();
        let param_refs: Vec<&dyn ToSql> = self.params.iter().map(|p| p.as_ref()).collect();

        let count_sql = format!("SELECT COUNT(*) FROM {}{}", from, where_clause);
        let total: i64 = conn.query_row(&count_sql, param_refs.as_slice(), |row| row.get(0))?;

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ? OFFSET ?",
            columns, from, where_clause, order_by
        );
        let limit = request.limit();
        let offset = request.offset();
        let mut all_params = param_refs;
        all_params.push(&limit);
        all_params.push(&offset);

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(all_params.as_slice(), map)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total as u64, request))
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None, 10), PageRequest { page: 1, per_page: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0), 10), PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500), 10).per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(Some(3), Some(10), 10).offset(), 20);
    }

    #[test]
    fn test_last_page_and_links() {
        let request = PageRequest::new(Some(3), Some(10), 10);
        let page = Page::new(vec![1, 2, 3, 4, 5], 25, request)
            .with_links("/api/articles", &[("category", "berita sekolah".to_string())]);

        assert_eq!(page.last_page, 3);
        assert_eq!(page.links.next, None);
        assert_eq!(
            page.links.prev.as_deref(),
            Some("/api/articles?category=berita+sekolah&page=2&per_page=10")
        );
        assert_eq!(
            page.links.first,
            "/api/articles?category=berita+sekolah&page=1&per_page=10"
        );
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page: Page<()> = Page::new(vec![], 0, PageRequest::new(None, None, 10)).with_links("/x", &[]);
        assert_eq!(page.last_page, 1);
        assert!(page.links.prev.is_none());
        assert!(page.links.next.is_none());
    }

    #[test]
    fn test_list_query_parsing() {
        let query = ListQuery::from_query_string(Some("page=2&per_page=abc&search=%20osis%20&category=&x=1"));
        assert_eq!(query.page, Some(2));
        assert_eq!(query.per_page, None);
        assert_eq!(query.search.as_deref(), Some("osis"));
        assert_eq!(query.category, None);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[test]
    fn test_fetch_page_counts_before_limit() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
        for i in 1..=25 {
            conn.execute("INSERT INTO t (name) VALUES (?)", [format!("item {i}")]).unwrap();
        }

        let mut filter = Filter::new();
        filter.search(&["name"], Some("item"));
        let page = filter
            .fetch_page(&conn, "id", "t", "id", PageRequest::new(Some(3), Some(10), 10), |row| {
                row.get::<_, i64>(0)
            })
            .unwrap();

        assert_eq!(page.total, 25);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
    }
}
