//! Merge stored positions with the registry
//!
//! Stored data is sparse and may be stale or malformed. The reconciled view is
//! always exactly one entry per registry position, ascending by order.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use super::registry::PositionRegistry;
use super::{ReconciledPosition, StoredPosition};

/// Build the complete view: one entry per registry order, stored fields where
/// present, nulls otherwise.
///
/// Entries whose order is outside the registry, and later duplicates of an
/// order, are dropped and logged. This never fails.
pub fn reconcile<I>(registry: &PositionRegistry, stored: I) -> Vec<ReconciledPosition>
where
    I: IntoIterator<Item = StoredPosition>,
{
    let mut by_order: HashMap<u32, StoredPosition> = HashMap::with_capacity(registry.len());

    for entry in stored {
        if !registry.contains(entry.order) {
            warn!(
                order = entry.order,
                positions = registry.len(),
                "Discarding stored position with out-of-range order"
            );
            continue;
        }
        let order = entry.order as u32;
        if by_order.contains_key(&order) {
            warn!(order, "Discarding duplicate stored position");
            continue;
        }
        by_order.insert(order, entry);
    }

    registry
        .layout()
        .iter()
        .map(|position| {
            let stored = by_order.remove(&position.order);
            ReconciledPosition {
                order: position.order,
                label: position.label.clone(),
                title: stored.as_ref().and_then(|s| s.title.clone()),
                name: stored.as_ref().and_then(|s| s.name.clone()),
                image: stored.and_then(|s| s.image),
            }
        })
        .collect()
}

/// Parse persisted positions leniently.
///
/// Anything that is not an array yields no entries. Array items that are not
/// objects or lack an integer `order` are skipped; string fields with the
/// wrong type read as absent.
pub fn parse_stored(json: &str) -> Vec<StoredPosition> {
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Stored organization structure is not valid JSON");
            return Vec::new();
        }
    };

    let Value::Array(items) = value else {
        warn!("Stored organization structure is not an array");
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed = parse_entry(item);
            if parsed.is_none() {
                warn!(index, "Skipping malformed stored position");
            }
            parsed
        })
        .collect()
}

fn parse_entry(item: &Value) -> Option<StoredPosition> {
    let object = item.as_object()?;
    let order = match object.get("order")? {
        Value::Number(n) => n.as_i64()?,
        // Older saves wrote form values verbatim
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(StoredPosition {
        order,
        title: text("title"),
        name: text("name"),
        image: text("image"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: usize) -> PositionRegistry {
        PositionRegistry::from_labels((1..=n).map(|i| format!("Role {i}"))).unwrap()
    }

    fn named(order: i64, name: &str) -> StoredPosition {
        StoredPosition {
            order,
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fills_gaps_with_nulls() {
        let result = reconcile(&registry(3), vec![named(2, "Ana")]);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].order, 1);
        assert_eq!(result[0].name, None);
        assert_eq!(result[1].order, 2);
        assert_eq!(result[1].name.as_deref(), Some("Ana"));
        assert_eq!(result[1].label, "Role 2");
        assert_eq!(result[2].order, 3);
        assert_eq!(result[2].name, None);
    }

    #[test]
    fn test_always_n_entries_for_hostile_orders() {
        let stored: Vec<StoredPosition> = [-5, 0, 1, 1, 2, 7, 7, 40, i64::MAX, i64::MIN, 3]
            .iter()
            .enumerate()
            .map(|(i, order)| named(*order, &format!("p{i}")))
            .collect();

        for n in 1..=10 {
            let result = reconcile(&registry(n), stored.clone());
            assert_eq!(result.len(), n);
            let orders: Vec<u32> = result.iter().map(|p| p.order).collect();
            assert_eq!(orders, (1..=n as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_first_duplicate_wins() {
        let result = reconcile(&registry(2), vec![named(1, "first"), named(1, "second")]);
        assert_eq!(result[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn test_output_ignores_input_order() {
        let forward = reconcile(&registry(3), vec![named(1, "a"), named(3, "c")]);
        let backward = reconcile(&registry(3), vec![named(3, "c"), named(1, "a")]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_parse_stored_tolerates_garbage() {
        assert!(parse_stored("not json").is_empty());
        assert!(parse_stored(r#"{"order": 1}"#).is_empty());

        let parsed = parse_stored(
            r#"[
                {"order": 2, "name": "Ana", "title": 5, "image": ""},
                "junk",
                {"name": "no order"},
                {"order": "3", "name": "  Budi  "},
                {"order": 1.5}
            ]"#,
        );

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], named(2, "Ana"));
        assert_eq!(parsed[1], named(3, "Budi"));
    }

    #[test]
    fn test_reconcile_of_malformed_json_is_all_null() {
        let result = reconcile(&registry(4), parse_stored("[[[["));
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|p| p.name.is_none() && p.image.is_none()));
    }
}
