//! Inventory store: the durable record of physical items.
//!
//! A plain keyed record store with a uniqueness constraint on `code`.
//! No loan rule lives here; the consistency engine decides when an
//! item's state may change.

use crate::error::BeoError;
use crate::id::{ITEM_PREFIX, generate_id};
use crate::storage::{parse_date, parse_timestamp};
use crate::types::{Item, ItemState};
use chrono::{NaiveDate, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

/// Fields for registering a new item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category_id: String,
    pub deposit_id: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    /// Defaults to today when unset.
    pub entered_on: Option<NaiveDate>,
}

impl NewItem {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        category_id: impl Into<String>,
        deposit_id: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category_id: category_id.into(),
            deposit_id: deposit_id.into(),
            brand: None,
            model: None,
            serial_number: None,
            description: None,
            notes: None,
            entered_on: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn entered_on(mut self, date: NaiveDate) -> Self {
        self.entered_on = Some(date);
        self
    }
}

/// Filter for item listings.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub state: Option<ItemState>,
    pub category_id: Option<String>,
    pub deposit_id: Option<String>,
    pub code_contains: Option<String>,
    pub limit: Option<usize>,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: ItemState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn deposit(mut self, deposit_id: impl Into<String>) -> Self {
        self.deposit_id = Some(deposit_id.into());
        self
    }

    pub fn code_contains(mut self, fragment: impl Into<String>) -> Self {
        self.code_contains = Some(fragment.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Inventory access over a borrowed connection.
///
/// Works unchanged inside a transaction, which is how the engine spans
/// inventory and ledger writes atomically.
pub struct InventoryStore<'c> {
    conn: &'c Connection,
}

impl<'c> InventoryStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Register a new item. Initial state is always `Available`.
    pub fn create(&self, spec: NewItem) -> Result<Item> {
        let now = Utc::now();
        let item = Item {
            id: generate_id(ITEM_PREFIX, &spec.code, now),
            code: spec.code,
            name: spec.name,
            category_id: spec.category_id,
            deposit_id: spec.deposit_id,
            state: ItemState::Available,
            brand: spec.brand,
            model: spec.model,
            serial_number: spec.serial_number,
            description: spec.description,
            notes: spec.notes,
            entered_on: spec.entered_on.unwrap_or_else(|| now.date_naive()),
            created_at: now,
        };
        item.validate().map_err(|e| eyre::eyre!(BeoError::Validation(e)))?;

        if self.find_by_code(&item.code)?.is_some() {
            return Err(eyre::eyre!(BeoError::DuplicateCode(item.code)));
        }
        self.ensure_reference("categories", &item.category_id)?;
        self.ensure_reference("deposits", &item.deposit_id)?;

        self.conn
            .execute(
                "INSERT INTO items
                     (id, code, name, category_id, deposit_id, state, brand, model,
                      serial_number, description, notes, entered_on, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    item.id,
                    item.code,
                    item.name,
                    item.category_id,
                    item.deposit_id,
                    item.state.as_str(),
                    item.brand,
                    item.model,
                    item.serial_number,
                    item.description,
                    item.notes,
                    item.entered_on.to_string(),
                    item.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to persist item")?;

        Ok(item)
    }

    /// Get an item by internal ID.
    pub fn get(&self, id: &str) -> Result<Option<Item>> {
        let mut stmt = self.conn.prepare(&format!("{} WHERE id = ?", SELECT_ITEM))?;
        let item = stmt.query_row(params![id], row_to_item).optional()?;
        Ok(item)
    }

    /// Find an item by its human-assigned code.
    pub fn find_by_code(&self, code: &str) -> Result<Option<Item>> {
        let mut stmt = self.conn.prepare(&format!("{} WHERE code = ?", SELECT_ITEM))?;
        let item = stmt.query_row(params![code], row_to_item).optional()?;
        Ok(item)
    }

    /// Overwrite an item's lifecycle state.
    ///
    /// Callers are expected to have decided the transition is legal;
    /// this only guarantees the row exists.
    pub fn set_state(&self, id: &str, new_state: ItemState) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE items SET state = ? WHERE id = ?",
                params![new_state.as_str(), id],
            )
            .context("Failed to persist state change")?;
        if updated == 0 {
            return Err(eyre::eyre!(BeoError::ItemNotFound(id.to_string())));
        }
        Ok(())
    }

    /// Reassign an item's deposit (return-to-deposit override).
    pub fn set_deposit(&self, id: &str, deposit_id: &str) -> Result<()> {
        self.ensure_reference("deposits", deposit_id)?;
        let updated = self
            .conn
            .execute(
                "UPDATE items SET deposit_id = ? WHERE id = ?",
                params![deposit_id, id],
            )
            .context("Failed to persist deposit change")?;
        if updated == 0 {
            return Err(eyre::eyre!(BeoError::ItemNotFound(id.to_string())));
        }
        Ok(())
    }

    /// List items matching a filter, ordered by code.
    pub fn list(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let mut sql = SELECT_ITEM.to_string();
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(state) = filter.state {
            clauses.push("state = ?");
            args.push(state.as_str().to_string());
        }
        if let Some(ref category_id) = filter.category_id {
            clauses.push("category_id = ?");
            args.push(category_id.clone());
        }
        if let Some(ref deposit_id) = filter.deposit_id {
            clauses.push("deposit_id = ?");
            args.push(deposit_id.clone());
        }
        if let Some(ref fragment) = filter.code_contains {
            clauses.push("code LIKE ?");
            args.push(format!("%{}%", fragment));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY code");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let items: Vec<Item> = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), row_to_item)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(items)
    }

    /// Count items in a given state.
    pub fn count_in_state(&self, state: ItemState) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE state = ?",
            params![state.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count all items.
    pub fn count_all(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count)
    }

    fn ensure_reference(&self, table: &str, id: &str) -> Result<()> {
        // table is a compile-time constant at every call site
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE id = ?", table),
            params![id],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(eyre::eyre!(BeoError::ReferenceNotFound(id.to_string())));
        }
        Ok(())
    }
}

const SELECT_ITEM: &str = "SELECT id, code, name, category_id, deposit_id, state, brand, model,
        serial_number, description, notes, entered_on, created_at FROM items";

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    let state_str: String = row.get(5)?;
    let entered_on_str: String = row.get(11)?;
    let created_at_str: String = row.get(12)?;

    Ok(Item {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        deposit_id: row.get(4)?,
        state: ItemState::parse(&state_str).unwrap_or(ItemState::Available),
        brand: row.get(6)?,
        model: row.get(7)?,
        serial_number: row.get(8)?,
        description: row.get(9)?,
        notes: row.get(10)?,
        entered_on: parse_date(&entered_on_str),
        created_at: parse_timestamp(&created_at_str),
    })
}
