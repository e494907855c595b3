//! School profile settings (singleton row)

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use crate::error::CmsError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsRow {
    pub school_name: String,
    pub tagline: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub about: Option<String>,
    pub vision: Option<String>,
    pub mission: Option<String>,
    pub principal_name: Option<String>,
    pub principal_greeting: Option<String>,
    pub principal_photo: Option<String>,
    pub logo: Option<String>,
    pub map_embed_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
    pub updated_at: String,
}

impl SettingsRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            school_name: row.get("school_name")?,
            tagline: row.get("tagline")?,
            address: row.get("address")?,
            phone: row.get("phone")?,
            email: row.get("email")?,
            about: row.get("about")?,
            vision: row.get("vision")?,
            mission: row.get("mission")?,
            principal_name: row.get("principal_name")?,
            principal_greeting: row.get("principal_greeting")?,
            principal_photo: row.get("principal_photo")?,
            logo: row.get("logo")?,
            map_embed_url: row.get("map_embed_url")?,
            facebook_url: row.get("facebook_url")?,
            instagram_url: row.get("instagram_url")?,
            youtube_url: row.get("youtube_url")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn get(conn: &Connection) -> Result<Option<SettingsRow>, CmsError> {
    Ok(conn
        .query_row("SELECT * FROM settings WHERE id = 1", [], SettingsRow::from_row)
        .optional()?)
}

/// Read the settings row, creating it on first access
pub fn get_or_create(conn: &Connection, default_school_name: &str) -> Result<SettingsRow, CmsError> {
    if let Some(row) = get(conn)? {
        return Ok(row);
    }

    info!(school_name = %default_school_name, "Creating initial settings row");
    conn.execute(
        "INSERT OR IGNORE INTO settings (id, school_name, updated_at) VALUES (1, ?, ?)",
        params![default_school_name, super::now()],
    )?;
    get(conn)?.ok_or_else(|| CmsError::Internal("Settings row missing after insert".to_string()))
}

/// Replace every settings field. `updated_at` on the input is ignored.
pub fn update(conn: &Connection, settings: &SettingsRow) -> Result<SettingsRow, CmsError> {
    conn.execute(
        r#"
        INSERT INTO settings (
            id, school_name, tagline, address, phone, email, about, vision, mission,
            principal_name, principal_greeting, principal_photo, logo, map_embed_url,
            facebook_url, instagram_url, youtube_url, updated_at
        ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            school_name = excluded.school_name,
            tagline = excluded.tagline,
            address = excluded.address,
            phone = excluded.phone,
            email = excluded.email,
            about = excluded.about,
            vision = excluded.vision,
            mission = excluded.mission,
            principal_name = excluded.principal_name,
            principal_greeting = excluded.principal_greeting,
            principal_photo = excluded.principal_photo,
            logo = excluded.logo,
            map_embed_url = excluded.map_embed_url,
            facebook_url = excluded.facebook_url,
            instagram_url = excluded.instagram_url,
            youtube_url = excluded.youtube_url,
            updated_at = excluded.updated_at
        "#,
        params![
            settings.school_name,
            settings.tagline,
            settings.address,
            settings.phone,
            settings.email,
            settings.about,
            settings.vision,
            settings.mission,
            settings.principal_name,
            settings.principal_greeting,
            settings.principal_photo,
            settings.logo,
            settings.map_embed_url,
            settings.facebook_url,
            settings.instagram_url,
            settings.youtube_url,
            super::now(),
        ],
    )?;
    get(conn)?.ok_or_else(|| CmsError::Internal("Settings row missing after update".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CmsDb;

    #[test]
    fn test_get_or_create_only_seeds_once() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let first = get_or_create(conn, "SMK Negeri 1")?;
            assert_eq!(first.school_name, "SMK Negeri 1");

            let mut changed = first.clone();
            changed.school_name = "SMK Negeri 2 Kota".into();
            changed.vision = Some("Unggul dan berkarakter".into());
            update(conn, &changed)?;

            let again = get_or_create(conn, "SMK Negeri 1")?;
            assert_eq!(again.school_name, "SMK Negeri 2 Kota");
            assert_eq!(again.vision.as_deref(), Some("Unggul dan berkarakter"));
            Ok(())
        })
        .unwrap();
    }
}
