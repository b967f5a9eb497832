//! Append-only state-change history.
//!
//! One row per item state transition, including the implicit ones at
//! registration, loan open, and loan close. Pure audit trail: nothing
//! in the consistency logic ever reads it back.

use crate::storage::parse_timestamp;
use crate::types::{ItemState, StateChange};
use chrono::Utc;
use eyre::{Context, Result};
use rusqlite::{Connection, params};

/// History access over a borrowed connection.
pub struct StateHistory<'c> {
    conn: &'c Connection,
}

impl<'c> StateHistory<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Append one transition record.
    pub fn append(
        &self,
        item_id: &str,
        prior_state: Option<ItemState>,
        new_state: ItemState,
        reason: &str,
        notes: Option<&str>,
        changed_by: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO state_history
                     (item_id, prior_state, new_state, reason, notes, changed_by, changed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    item_id,
                    prior_state.map(|s| s.as_str()),
                    new_state.as_str(),
                    reason,
                    notes,
                    changed_by,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to persist state change")?;
        Ok(())
    }

    /// Transition history for one item, most recent first.
    pub fn list_for_item(&self, item_id: &str) -> Result<Vec<StateChange>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE item_id = ? ORDER BY id DESC",
            SELECT_CHANGE
        ))?;
        let changes: Vec<StateChange> = stmt
            .query_map(params![item_id], row_to_change)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(changes)
    }

    /// The most recent transitions across all items.
    pub fn recent(&self, limit: usize) -> Result<Vec<StateChange>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id DESC LIMIT ?", SELECT_CHANGE))?;
        let changes: Vec<StateChange> = stmt
            .query_map(params![limit as i64], row_to_change)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(changes)
    }
}

const SELECT_CHANGE: &str = "SELECT id, item_id, prior_state, new_state, reason, notes,
        changed_by, changed_at FROM state_history";

fn row_to_change(row: &rusqlite::Row) -> rusqlite::Result<StateChange> {
    let prior_str: Option<String> = row.get(2)?;
    let new_str: String = row.get(3)?;
    let changed_at_str: String = row.get(7)?;

    Ok(StateChange {
        id: row.get(0)?,
        item_id: row.get(1)?,
        prior_state: prior_str.and_then(|s| ItemState::parse(&s)),
        new_state: ItemState::parse(&new_str).unwrap_or(ItemState::Available),
        reason: row.get(4)?,
        notes: row.get(5)?,
        changed_by: row.get(6)?,
        changed_at: parse_timestamp(&changed_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::init(temp_dir.path()).unwrap();
        let history = StateHistory::new(storage.conn());

        history
            .append("el-0000000001", None, ItemState::Available, "registered", None, "clerk")
            .unwrap();
        history
            .append(
                "el-0000000001",
                Some(ItemState::Available),
                ItemState::Loaned,
                "loan opened",
                None,
                "clerk",
            )
            .unwrap();
        history
            .append("el-0000000002", None, ItemState::Available, "registered", None, "clerk")
            .unwrap();

        let changes = history.list_for_item("el-0000000001").unwrap();
        assert_eq!(changes.len(), 2);
        // Most recent first
        assert_eq!(changes[0].new_state, ItemState::Loaned);
        assert_eq!(changes[0].prior_state, Some(ItemState::Available));
        assert_eq!(changes[1].prior_state, None);

        let recent = history.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].item_id, "el-0000000002");
    }
}
