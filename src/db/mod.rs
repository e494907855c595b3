//! SQLite database module for school content
//!
//! ## Tables
//!
//! - `categories`, `articles` - news and announcements
//! - `majors`, `extracurriculars`, `achievements`, `galleries` - slugged catalog pages
//! - `banners` - landing page carousel
//! - `settings` - singleton school profile row
//! - `org_structure` - singleton organization chart (positions as a JSON array)
//!
//! Image columns hold blob store references, never bytes.

pub mod achievements;
pub mod articles;
pub mod banners;
pub mod categories;
pub mod extracurriculars;
pub mod galleries;
pub mod majors;
pub mod media_refs;
pub mod org_structure;
pub mod pagination;
pub mod schema;
pub mod settings;
pub mod slug;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::CmsError;

/// SQLite database for content records
pub struct CmsDb {
    conn: Mutex<Connection>,
}

impl CmsDb {
    /// Open or create the content database
    pub fn open(data_dir: &Path) -> Result<Self, CmsError> {
        let db_path = data_dir.join("school.db");
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)?;

        // WAL for concurrent readers while the admin writes
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, CmsError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<(), CmsError> {
        self.with_conn(|conn| schema::init_schema(conn))
    }

    /// Run a read with the shared connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, CmsError>
    where
        F: FnOnce(&Connection) -> Result<T, CmsError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CmsError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, CmsError>
    where
        F: FnOnce(&mut Connection) -> Result<T, CmsError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CmsError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Row counts per content table
    pub fn stats(&self) -> Result<DbStats, CmsError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, CmsError> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
                Ok(n as u64)
            };

            Ok(DbStats {
                articles: count("articles")?,
                categories: count("categories")?,
                majors: count("majors")?,
                extracurriculars: count("extracurriculars")?,
                banners: count("banners")?,
                galleries: count("galleries")?,
                achievements: count("achievements")?,
            })
        })
    }
}

/// Current time as stored in `created_at` / `updated_at`
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub articles: u64,
    pub categories: u64,
    pub majors: u64,
    pub extracurriculars: u64,
    pub banners: u64,
    pub galleries: u64,
    pub achievements: u64,
}

pub use pagination::{ListQuery, Page, PageRequest};
