//! Position layout registry
//!
//! The fixed roster of roles the organization chart always shows. Orders are
//! contiguous from 1, so a position's order is both its identity and its slot
//! in the canonical sequence. Tree rows are kept beside the roster and only
//! matter for rendering.

use serde::Serialize;
use ts_rs::TS;

/// A named role slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Position {
    pub order: u32,
    pub label: String,
}

/// Roles of the default school roster, in order, with their tree row
const SCHOOL_ROSTER: &[(&str, u8)] = &[
    ("Kepala Sekolah", 0),
    ("Komite Sekolah", 0),
    ("Kepala Tata Usaha", 1),
    ("Bendahara", 1),
    ("Wakasek Kurikulum", 2),
    ("Wakasek Kesiswaan", 2),
    ("Wakasek Sarana Prasarana", 2),
    ("Wakasek Hubungan Industri", 2),
    ("Koordinator BK", 3),
    ("Kepala Perpustakaan", 3),
    ("Kepala Laboratorium", 3),
    ("Pembina OSIS", 3),
    ("Kaprog TKJ", 4),
    ("Kaprog RPL", 4),
    ("Kaprog Multimedia", 4),
    ("Kaprog Akuntansi", 4),
    ("Kaprog Perkantoran", 4),
    ("Ketua OSIS", 5),
];

/// Rejected roster definitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("roster is empty")]
    Empty,
    #[error("expected order {expected} at index {index}, found {found}")]
    NonContiguous { index: usize, expected: u32, found: u32 },
    #[error("position {order} has an empty label")]
    EmptyLabel { order: u32 },
}

/// Immutable, ordered catalog of positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRegistry {
    positions: Vec<Position>,
    rows: Vec<Vec<u32>>,
}

impl PositionRegistry {
    /// The 18-role school roster
    pub fn school_default() -> Self {
        let mut rows: Vec<Vec<u32>> = Vec::new();
        let positions = SCHOOL_ROSTER
            .iter()
            .enumerate()
            .map(|(i, (label, row))| {
                let order = i as u32 + 1;
                let row = *row as usize;
                if rows.len() <= row {
                    rows.resize_with(row + 1, Vec::new);
                }
                rows[row].push(order);
                Position {
                    order,
                    label: (*label).to_string(),
                }
            })
            .collect();

        Self { positions, rows }
    }

    /// Build a registry from labels; orders are assigned 1..=N.
    /// The chart renders as a single row.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let positions = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| Position {
                order: i as u32 + 1,
                label: label.into(),
            })
            .collect();
        Self::from_positions(positions)
    }

    /// Build a registry from explicit positions, which must carry orders
    /// 1..=N in sequence
    pub fn from_positions(positions: Vec<Position>) -> Result<Self, RegistryError> {
        if positions.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (index, position) in positions.iter().enumerate() {
            let expected = index as u32 + 1;
            if position.order != expected {
                return Err(RegistryError::NonContiguous {
                    index,
                    expected,
                    found: position.order,
                });
            }
            if position.label.trim().is_empty() {
                return Err(RegistryError::EmptyLabel {
                    order: position.order,
                });
            }
        }
        let rows = vec![positions.iter().map(|p| p.order).collect()];
        Ok(Self { positions, rows })
    }

    /// The canonical ordered layout
    pub fn layout(&self) -> &[Position] {
        &self.positions
    }

    /// Number of positions (N)
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether `order` names a slot in this registry
    pub fn contains(&self, order: i64) -> bool {
        order >= 1 && order <= self.positions.len() as i64
    }

    /// Position for an order, if in range
    pub fn get(&self, order: u32) -> Option<&Position> {
        order
            .checked_sub(1)
            .and_then(|i| self.positions.get(i as usize))
    }

    /// Orders grouped by tree row, top row first
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }
}

impl Default for PositionRegistry {
    fn default() -> Self {
        Self::school_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_default_has_18_contiguous_positions() {
        let registry = PositionRegistry::school_default();
        assert_eq!(registry.len(), 18);
        for (i, position) in registry.layout().iter().enumerate() {
            assert_eq!(position.order, i as u32 + 1);
            assert!(!position.label.is_empty());
        }
        assert_eq!(registry.get(1).unwrap().label, "Kepala Sekolah");
        assert!(registry.get(0).is_none());
        assert!(registry.get(19).is_none());
    }

    #[test]
    fn test_rows_cover_every_position_once() {
        let registry = PositionRegistry::school_default();
        let mut orders: Vec<u32> = registry.rows().iter().flatten().copied().collect();
        orders.sort_unstable();
        assert_eq!(orders, (1..=18).collect::<Vec<_>>());
        assert_eq!(registry.rows()[0], vec![1, 2]);
    }

    #[test]
    fn test_from_positions_rejects_gaps() {
        let err = PositionRegistry::from_positions(vec![
            Position { order: 1, label: "A".into() },
            Position { order: 3, label: "C".into() },
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NonContiguous { index: 1, expected: 2, found: 3 }
        );
    }

    #[test]
    fn test_from_labels() {
        let registry = PositionRegistry::from_labels(["Ketua", "Sekretaris", "Bendahara"]).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(3));
        assert!(!registry.contains(0));
        assert!(!registry.contains(-1));
        assert!(!registry.contains(4));
        assert!(PositionRegistry::from_labels(Vec::<String>::new()).is_err());
        assert!(PositionRegistry::from_labels(["", "B"]).is_err());
    }
}
