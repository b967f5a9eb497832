//! Reference data: beneficiaries, deposits, and equipment categories.
//!
//! Plain keyed record stores with name-uniqueness constraints. No
//! lifecycle logic lives here; the loan flow only needs these rows to
//! exist so it can reference them.

use crate::error::BeoError;
use crate::id::{BENEFICIARY_PREFIX, CATEGORY_PREFIX, DEPOSIT_PREFIX, generate_id};
use crate::storage::parse_timestamp;
use crate::types::{Beneficiary, BeneficiaryKind, Category, Deposit};
use chrono::Utc;
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

/// Categories seeded into a fresh store.
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Wheelchairs", "Manual and electric wheelchairs"),
    ("Canes", "Simple and orthopedic canes"),
    ("Crutches", "Axillary and forearm crutches"),
    ("Walkers", "Walkers with and without wheels"),
    ("Orthopedic beds", "Articulated beds and mattresses"),
    ("Rehabilitation equipment", "Assorted rehabilitation gear"),
    ("Other", "Uncategorized equipment"),
];

/// Deposit seeded into a fresh store.
const DEFAULT_DEPOSIT: &str = "Main deposit";

/// Fields for registering a new beneficiary.
#[derive(Debug, Clone)]
pub struct NewBeneficiary {
    pub kind: BeneficiaryKind,
    pub name: String,
    pub kinship: Option<String>,
    pub responsible_member: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl NewBeneficiary {
    /// A member borrowing for themselves.
    pub fn member(name: impl Into<String>) -> Self {
        Self {
            kind: BeneficiaryKind::Member,
            name: name.into(),
            kinship: None,
            responsible_member: None,
            phone: None,
            address: None,
            notes: None,
        }
    }

    /// A member's relative, with the member answering for the loan.
    pub fn relative(
        name: impl Into<String>,
        kinship: impl Into<String>,
        responsible_member: impl Into<String>,
    ) -> Self {
        Self {
            kind: BeneficiaryKind::Relative,
            name: name.into(),
            kinship: Some(kinship.into()),
            responsible_member: Some(responsible_member.into()),
            phone: None,
            address: None,
            notes: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Reference-data access over a borrowed connection.
pub struct Registry<'c> {
    conn: &'c Connection,
}

impl<'c> Registry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Seed default categories and the default deposit. Idempotent.
    pub fn seed_defaults(&self) -> Result<()> {
        let now = Utc::now();
        for (name, description) in DEFAULT_CATEGORIES {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO categories (id, name, description) VALUES (?, ?, ?)",
                    params![generate_id(CATEGORY_PREFIX, name, now), name, description],
                )
                .context("Failed to seed categories")?;
        }
        self.conn
            .execute(
                "INSERT OR IGNORE INTO deposits (id, name, address, manager, phone, created_at)
                 VALUES (?, ?, NULL, NULL, NULL, ?)",
                params![
                    generate_id(DEPOSIT_PREFIX, DEFAULT_DEPOSIT, now),
                    DEFAULT_DEPOSIT,
                    now.to_rfc3339()
                ],
            )
            .context("Failed to seed default deposit")?;
        Ok(())
    }

    /// Register a beneficiary.
    pub fn add_beneficiary(&self, spec: NewBeneficiary) -> Result<Beneficiary> {
        let now = Utc::now();
        let beneficiary = Beneficiary {
            id: generate_id(BENEFICIARY_PREFIX, &spec.name, now),
            kind: spec.kind,
            name: spec.name,
            kinship: spec.kinship,
            responsible_member: spec.responsible_member,
            phone: spec.phone,
            address: spec.address,
            notes: spec.notes,
            created_at: now,
        };
        beneficiary
            .validate()
            .map_err(|e| eyre::eyre!(BeoError::Validation(e)))?;

        self.conn
            .execute(
                "INSERT INTO beneficiaries
                     (id, kind, name, kinship, responsible_member, phone, address, notes, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    beneficiary.id,
                    beneficiary.kind.as_str(),
                    beneficiary.name,
                    beneficiary.kinship,
                    beneficiary.responsible_member,
                    beneficiary.phone,
                    beneficiary.address,
                    beneficiary.notes,
                    beneficiary.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to persist beneficiary")?;

        Ok(beneficiary)
    }

    /// Get a beneficiary by ID.
    pub fn get_beneficiary(&self, id: &str) -> Result<Option<Beneficiary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, kinship, responsible_member, phone, address, notes, created_at
             FROM beneficiaries WHERE id = ?",
        )?;
        let beneficiary = stmt.query_row(params![id], row_to_beneficiary).optional()?;
        Ok(beneficiary)
    }

    /// List all beneficiaries, alphabetically.
    pub fn list_beneficiaries(&self) -> Result<Vec<Beneficiary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, kinship, responsible_member, phone, address, notes, created_at
             FROM beneficiaries ORDER BY name",
        )?;
        let rows: Vec<Beneficiary> = stmt
            .query_map([], row_to_beneficiary)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Register a deposit.
    pub fn add_deposit(
        &self,
        name: &str,
        address: Option<&str>,
        manager: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Deposit> {
        if self.find_deposit_by_name(name)?.is_some() {
            return Err(eyre::eyre!(BeoError::DuplicateName(name.to_string())));
        }

        let now = Utc::now();
        let deposit = Deposit {
            id: generate_id(DEPOSIT_PREFIX, name, now),
            name: name.to_string(),
            address: address.map(String::from),
            manager: manager.map(String::from),
            phone: phone.map(String::from),
            created_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO deposits (id, name, address, manager, phone, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    deposit.id,
                    deposit.name,
                    deposit.address,
                    deposit.manager,
                    deposit.phone,
                    deposit.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to persist deposit")?;

        Ok(deposit)
    }

    /// Get a deposit by ID.
    pub fn get_deposit(&self, id: &str) -> Result<Option<Deposit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, manager, phone, created_at FROM deposits WHERE id = ?",
        )?;
        let deposit = stmt.query_row(params![id], row_to_deposit).optional()?;
        Ok(deposit)
    }

    /// Find a deposit by its unique name.
    pub fn find_deposit_by_name(&self, name: &str) -> Result<Option<Deposit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, manager, phone, created_at FROM deposits WHERE name = ?",
        )?;
        let deposit = stmt.query_row(params![name], row_to_deposit).optional()?;
        Ok(deposit)
    }

    /// List all deposits, alphabetically.
    pub fn list_deposits(&self) -> Result<Vec<Deposit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, manager, phone, created_at FROM deposits ORDER BY name",
        )?;
        let rows: Vec<Deposit> = stmt
            .query_map([], row_to_deposit)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Register a category.
    pub fn add_category(&self, name: &str, description: Option<&str>) -> Result<Category> {
        if self.find_category_by_name(name)?.is_some() {
            return Err(eyre::eyre!(BeoError::DuplicateName(name.to_string())));
        }

        let category = Category {
            id: generate_id(CATEGORY_PREFIX, name, Utc::now()),
            name: name.to_string(),
            description: description.map(String::from),
        };

        self.conn
            .execute(
                "INSERT INTO categories (id, name, description) VALUES (?, ?, ?)",
                params![category.id, category.name, category.description],
            )
            .context("Failed to persist category")?;

        Ok(category)
    }

    /// Get a category by ID.
    pub fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM categories WHERE id = ?")?;
        let category = stmt.query_row(params![id], row_to_category).optional()?;
        Ok(category)
    }

    /// Find a category by its unique name.
    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM categories WHERE name = ?")?;
        let category = stmt.query_row(params![name], row_to_category).optional()?;
        Ok(category)
    }

    /// List all categories, alphabetically.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM categories ORDER BY name")?;
        let rows: Vec<Category> = stmt
            .query_map([], row_to_category)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

fn row_to_beneficiary(row: &rusqlite::Row) -> rusqlite::Result<Beneficiary> {
    let kind_str: String = row.get(1)?;
    let created_at_str: String = row.get(8)?;
    Ok(Beneficiary {
        id: row.get(0)?,
        kind: BeneficiaryKind::parse(&kind_str).unwrap_or(BeneficiaryKind::Member),
        name: row.get(2)?,
        kinship: row.get(3)?,
        responsible_member: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        notes: row.get(7)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

fn row_to_deposit(row: &rusqlite::Row) -> rusqlite::Result<Deposit> {
    let created_at_str: String = row.get(5)?;
    Ok(Deposit {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        manager: row.get(3)?,
        phone: row.get(4)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}
