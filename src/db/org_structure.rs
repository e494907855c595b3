//! Organization structure storage
//!
//! One row holding the section title and the stored positions as a JSON
//! array. Reads go through the lenient parser so a damaged column degrades
//! to an empty chart instead of failing the page.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::CmsError;
use crate::structure::{parse_stored, StoredPosition};

/// Section heading used until an admin sets one
pub const DEFAULT_SECTION_TITLE: &str = "Struktur Organisasi";

/// Stored organization structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgStructureRow {
    pub section_title: String,
    pub positions: Vec<StoredPosition>,
    pub updated_at: Option<String>,
}

impl Default for OrgStructureRow {
    fn default() -> Self {
        Self {
            section_title: DEFAULT_SECTION_TITLE.to_string(),
            positions: Vec::new(),
            updated_at: None,
        }
    }
}

/// Load the structure; a missing row reads as the empty default
pub fn load(conn: &Connection) -> Result<OrgStructureRow, CmsError> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT section_title, positions_json, updated_at FROM org_structure WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    Ok(match row {
        Some((section_title, positions_json, updated_at)) => OrgStructureRow {
            section_title,
            positions: parse_stored(&positions_json),
            updated_at: Some(updated_at),
        },
        None => OrgStructureRow::default(),
    })
}

/// Replace the whole stored structure in one transaction
pub fn save(
    conn: &mut Connection,
    section_title: &str,
    positions: &[StoredPosition],
) -> Result<OrgStructureRow, CmsError> {
    let positions_json = serde_json::to_string(positions)?;

    let tx = conn.transaction()?;
    tx.execute(
        r#"
        INSERT INTO org_structure (id, section_title, positions_json, updated_at)
        VALUES (1, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            section_title = excluded.section_title,
            positions_json = excluded.positions_json,
            updated_at = excluded.updated_at
        "#,
        params![section_title, positions_json, super::now()],
    )?;
    tx.commit()?;

    load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CmsDb;

    #[test]
    fn test_load_without_row_is_empty_default() {
        let db = CmsDb::open_in_memory().unwrap();
        let row = db.with_conn(load).unwrap();
        assert_eq!(row.section_title, DEFAULT_SECTION_TITLE);
        assert!(row.positions.is_empty());
        assert!(row.updated_at.is_none());
    }

    #[test]
    fn test_save_replaces_previous_set() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            save(
                conn,
                "Struktur Organisasi",
                &[
                    StoredPosition { order: 1, name: Some("Budi".into()), ..Default::default() },
                    StoredPosition { order: 2, name: Some("Sari".into()), ..Default::default() },
                ],
            )?;
            let saved = save(
                conn,
                "Pengurus Sekolah",
                &[StoredPosition { order: 2, name: Some("Ana".into()), ..Default::default() }],
            )?;

            assert_eq!(saved.section_title, "Pengurus Sekolah");
            assert_eq!(saved.positions.len(), 1);
            assert_eq!(saved.positions[0].name.as_deref(), Some("Ana"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_damaged_json_reads_as_empty() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO org_structure (id, section_title, positions_json, updated_at)
                 VALUES (1, 'Struktur', '{not json', '2024-01-01T00:00:00Z')",
                [],
            )?;
            let row = load(conn)?;
            assert!(row.positions.is_empty());
            Ok(())
        })
        .unwrap();
    }
}
