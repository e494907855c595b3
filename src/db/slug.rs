//! URL slugs, unique among rows of the same table

use std::collections::HashSet;

use rusqlite::{params, Connection};

use crate::error::CmsError;

/// Tables whose rows are addressed by slug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Categories,
    Articles,
    Majors,
    Extracurriculars,
    Galleries,
    Achievements,
}

impl SlugScope {
    fn table(self) -> &'static str {
        match self {
            SlugScope::Categories => "categories",
            SlugScope::Articles => "articles",
            SlugScope::Majors => "majors",
            SlugScope::Extracurriculars => "extracurriculars",
            SlugScope::Galleries => "galleries",
            SlugScope::Achievements => "achievements",
        }
    }
}

/// Lowercase ASCII alphanumerics joined by single hyphens.
///
/// Anything else (spaces, punctuation, non-ASCII letters) separates words.
/// Names with no usable characters slug to `item`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

/// Slug for `name` that no other row in `scope` uses.
///
/// `exclude_id` is the row being renamed, so it does not collide with itself.
pub fn unique_slug(
    conn: &Connection,
    scope: SlugScope,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<String, CmsError> {
    let base = slugify(name);

    let sql = format!(
        "SELECT slug FROM {} WHERE (slug = ?1 OR slug LIKE ?2 ESCAPE '\\') AND id != ?3",
        scope.table()
    );
    // Only hyphens, digits and lowercase letters can appear in a slug, so the
    // base never contains LIKE wildcards
    let pattern = format!("{}-%", base);
    let mut stmt = conn.prepare(&sql)?;
    let taken: HashSet<String> = stmt
        .query_map(params![base, pattern, exclude_id.unwrap_or(-1)], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    if !taken.contains(&base) {
        return Ok(base);
    }

    let mut n = 1u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
        n += 1;
    }
}
