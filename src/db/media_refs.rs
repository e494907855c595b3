//! Which stored records point at which images

use std::collections::HashSet;

use rusqlite::{params, Connection};

use crate::error::CmsError;

/// Every `(table, column)` holding a single image reference
const IMAGE_COLUMNS: &[(&str, &str)] = &[
    ("articles", "thumbnail"),
    ("majors", "thumbnail"),
    ("majors", "preview_image"),
    ("extracurriculars", "image"),
    ("banners", "image"),
    ("galleries", "image"),
    ("achievements", "image"),
    ("settings", "principal_photo"),
    ("settings", "logo"),
];

/// The subset of `references` that some stored record uses
pub fn referenced(conn: &Connection, references: &[String]) -> Result<HashSet<String>, CmsError> {
    let mut in_use = HashSet::new();
    for reference in references {
        if is_referenced(conn, reference)? {
            in_use.insert(reference.clone());
        }
    }
    Ok(in_use)
}

fn is_referenced(conn: &Connection, reference: &str) -> Result<bool, CmsError> {
    for (table, column) in IMAGE_COLUMNS {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)", table, column);
        let found: bool = conn.query_row(&sql, params![reference], |row| row.get(0))?;
        if found {
            return Ok(true);
        }
    }

    // Chart portraits live inside the positions JSON
    let found: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM org_structure WHERE instr(positions_json, ?1) > 0)",
        params![format!("\"{}\"", reference)],
        |row| row.get(0),
    )?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{org_structure, CmsDb};
    use crate::structure::StoredPosition;

    #[test]
    fn test_finds_column_and_chart_references() {
        let db = CmsDb::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO extracurriculars (name, slug, image, created_at, updated_at)
                 VALUES ('Pramuka', 'pramuka', 'sha256-aa.png', 'now', 'now')",
                [],
            )?;
            org_structure::save(
                conn,
                "Struktur Organisasi",
                &[StoredPosition {
                    order: 1,
                    image: Some("sha256-bb.png".into()),
                    ..Default::default()
                }],
            )?;

            let candidates = vec![
                "sha256-aa.png".to_string(),
                "sha256-bb.png".to_string(),
                "sha256-cc.png".to_string(),
            ];
            let in_use = referenced(conn, &candidates)?;
            assert!(in_use.contains("sha256-aa.png"));
            assert!(in_use.contains("sha256-bb.png"));
            assert!(!in_use.contains("sha256-cc.png"));
            Ok(())
        })
        .unwrap();
    }
}
