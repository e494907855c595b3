//! Organization structure
//!
//! A fixed roster of positions (the registry), the sparse data stored for
//! them, and the two conversions between the two:
//!
//! ```text
//! PositionRegistry ─┐
//!                   ├─ reconcile ─▶ [ReconciledPosition; N] ─▶ editor
//! stored positions ─┘                                            │
//!        ▲                                                       │
//!        └──────────────── commit ◀─ [PositionEdit] ◀────────────┘
//! ```

pub mod commit;
pub mod reconciler;
pub mod registry;

pub use commit::{commit, CommitOutcome};
pub use reconciler::{parse_stored, reconcile};
pub use registry::{Position, PositionRegistry, RegistryError};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::blob_store::ImageChange;

/// Persisted data for one position, keyed by `order`.
///
/// `order` is signed because persisted data is not trusted to be in range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPosition {
    pub order: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One row of the editor: registry label plus whatever is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ReconciledPosition {
    pub order: u32,
    pub label: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl ReconciledPosition {
    /// Title shown on the chart: the override if set, otherwise the role label
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.label)
    }
}

/// An edited row as submitted by the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionEdit {
    pub order: i64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub image: ImageChange,
}

impl From<ReconciledPosition> for PositionEdit {
    fn from(p: ReconciledPosition) -> Self {
        Self {
            order: i64::from(p.order),
            title: p.title,
            name: p.name,
            image: ImageChange::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_falls_back_to_label() {
        let mut position = ReconciledPosition {
            order: 1,
            label: "Kepala Sekolah".into(),
            title: None,
            name: None,
            image: None,
        };
        assert_eq!(position.display_title(), "Kepala Sekolah");

        position.title = Some("Plt. Kepala Sekolah".into());
        assert_eq!(position.display_title(), "Plt. Kepala Sekolah");
    }

    #[test]
    fn test_stored_position_deserializes_sparse_json() {
        let parsed: StoredPosition = serde_json::from_str(r#"{"order": 4}"#).unwrap();
        assert_eq!(parsed, StoredPosition { order: 4, ..Default::default() });
    }
}
