use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    db::{
        connection::Database,
        helpers::{parse_datetime, parse_optional_datetime, to_i64, to_u64},
        models::{
            category::validation::{validate_color, validate_name},
            CategoryInput, SkillCategory, XpEntry, XpSource,
        },
    },
    progression::TitleVocabulary,
    registry::SnapshotCategory,
};

const CATEGORY_COLUMNS: &str =
    "id, name, xp, color, custom_color, icon_name, order_index, created_at, updated_at, deleted_at";

const DEFAULT_PALETTE: [&str; 9] = [
    "#00FFAA", "#FF00FF", "#00BFFF", "#FFD700", "#FF6B35", "#7CFC00", "#FF1493", "#9370DB",
    "#40E0D0",
];

/// A category before and after a credit of minutes, plus the log entry
/// written for it.
#[derive(Debug, Clone)]
pub struct CreditedMinutes {
    pub before: SkillCategory,
    pub after: SkillCategory,
    pub entry: XpEntry,
}

/// Counts reported by [`Database::import_snapshot`].
///
/// `updated` includes records merged into a same-named category;
/// `restored` counts soft-deleted categories brought back by their id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub restored: usize,
    pub skipped: usize,
    pub xp_added: u64,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub custom_color: Option<Option<String>>,
    pub icon_name: Option<Option<String>>,
}

fn row_to_category(row: &Row) -> Result<SkillCategory> {
    let xp: i64 = row.get("xp")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;

    Ok(SkillCategory {
        id: row.get("id")?,
        name: row.get("name")?,
        xp: to_u64(xp, "xp")?,
        color: row.get("color")?,
        custom_color: row.get("custom_color")?,
        icon_name: row.get("icon_name")?,
        order_index: row.get("order_index")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        deleted_at: parse_optional_datetime(deleted_at, "deleted_at")?,
    })
}

fn query_one(conn: &Connection, filter: &str, key: &str) -> Result<Option<SkillCategory>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![key])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_category(row)?)),
        None => Ok(None),
    }
}

fn load_category(conn: &Connection, category_id: &str) -> Result<Option<SkillCategory>> {
    query_one(conn, "id = ?1 AND deleted_at IS NULL", category_id)
}

/// Like [`load_category`], but soft-deleted rows are returned too.
fn load_category_with_deleted(conn: &Connection, category_id: &str) -> Result<Option<SkillCategory>> {
    query_one(conn, "id = ?1", category_id)
}

fn load_category_by_name(conn: &Connection, name: &str) -> Result<Option<SkillCategory>> {
    query_one(
        conn,
        "deleted_at IS NULL AND lower(name) = lower(?1)",
        name.trim(),
    )
}

fn load_active_categories(conn: &Connection) -> Result<Vec<SkillCategory>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE deleted_at IS NULL
         ORDER BY order_index ASC, created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        categories.push(row_to_category(row)?);
    }
    Ok(categories)
}

fn name_taken(conn: &Connection, name: &str, except_id: Option<&str>) -> Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM categories
             WHERE deleted_at IS NULL AND lower(name) = lower(?1) AND id IS NOT ?2",
            params![name.trim(), except_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(existing.is_some())
}

/// Smallest order index not used by an active category.
fn next_order_index(conn: &Connection) -> Result<i64> {
    let mut stmt = conn.prepare(
        "SELECT order_index FROM categories WHERE deleted_at IS NULL ORDER BY order_index ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut next_index = 0i64;
    while let Some(row) = rows.next()? {
        let current: i64 = row.get(0)?;
        if current > next_index {
            break;
        }
        if current == next_index {
            next_index += 1;
        }
    }
    Ok(next_index)
}

fn insert_category(
    conn: &Connection,
    id: &str,
    name: &str,
    xp: u64,
    color: &str,
    custom_color: Option<&str>,
    icon_name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let order_index = next_order_index(conn)?;
    conn.execute(
        "INSERT INTO categories (id, name, xp, color, custom_color, icon_name, order_index, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            name.trim(),
            to_i64(xp)?,
            color,
            custom_color,
            icon_name,
            order_index,
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_xp_entry(conn: &Connection, entry: &XpEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO xp_entries (id, category_id, minutes, source, logged_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id,
            entry.category_id,
            to_i64(entry.minutes)?,
            entry.source.as_str(),
            entry.logged_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Where an imported record lands.
enum Placement {
    SameId(SkillCategory),
    Restored(SkillCategory),
    SameName(SkillCategory),
    New,
}

impl Database {
    /// Create a new category with zero XP.
    /// Returns an error if the name is blank or already used.
    pub async fn create_category(&self, input: CategoryInput) -> Result<SkillCategory> {
        validate_name(&input.name)?;
        validate_color(&input.color)?;

        self.transaction(move |tx| {
            if name_taken(tx, &input.name, None)? {
                bail!("A category named '{}' already exists", input.name.trim());
            }

            let id = Uuid::new_v4().to_string();
            insert_category(
                tx,
                &id,
                &input.name,
                0,
                &input.color,
                None,
                input.icon_name.as_deref(),
                Utc::now(),
            )?;

            load_category(tx, &id)?.ok_or_else(|| anyhow!("Category not found after insert"))
        })
        .await
    }

    /// Get all non-deleted categories, ordered by order_index
    pub async fn list_categories(&self) -> Result<Vec<SkillCategory>> {
        self.execute(|conn| load_active_categories(conn)).await
    }

    pub async fn get_category(&self, category_id: &str) -> Result<Option<SkillCategory>> {
        let category_id = category_id.to_string();
        self.execute(move |conn| load_category(conn, &category_id))
            .await
    }

    /// Look a category up by id, falling back to a case-insensitive name match.
    pub async fn find_category(&self, key: &str) -> Result<Option<SkillCategory>> {
        let key = key.trim().to_string();
        self.execute(move |conn| {
            match load_category(conn, &key)? {
                Some(category) => Ok(Some(category)),
                None => load_category_by_name(conn, &key),
            }
        })
        .await
    }

    /// Update presentation fields of a category. XP is never touched here.
    pub async fn update_category(
        &self,
        category_id: &str,
        update: CategoryUpdate,
    ) -> Result<SkillCategory> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(color) = &update.color {
            validate_color(color)?;
        }
        if let Some(Some(custom_color)) = &update.custom_color {
            validate_color(custom_color)?;
        }

        let category_id = category_id.to_string();
        self.transaction(move |tx| {
            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(name) = update.name {
                if name_taken(tx, &name, Some(&category_id))? {
                    bail!("A category named '{}' already exists", name.trim());
                }
                updates.push("name = ?");
                params_vec.push(Box::new(name.trim().to_string()));
            }
            if let Some(color) = update.color {
                updates.push("color = ?");
                params_vec.push(Box::new(color));
            }
            if let Some(custom_color) = update.custom_color {
                updates.push("custom_color = ?");
                params_vec.push(Box::new(custom_color));
            }
            if let Some(icon_name) = update.icon_name {
                updates.push("icon_name = ?");
                params_vec.push(Box::new(icon_name));
            }

            if updates.is_empty() {
                return Err(anyhow!("No fields to update"));
            }

            updates.push("updated_at = ?");
            params_vec.push(Box::new(Utc::now().to_rfc3339()));
            params_vec.push(Box::new(category_id.clone()));

            let query = format!(
                "UPDATE categories SET {} WHERE id = ? AND deleted_at IS NULL",
                updates.join(", ")
            );
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            if tx.execute(&query, params_refs.as_slice())? == 0 {
                return Err(anyhow!("Category not found or already deleted"));
            }

            load_category(tx, &category_id)?
                .ok_or_else(|| anyhow!("Category not found after update"))
        })
        .await
    }

    /// Soft delete a category. Its XP log stays for history.
    pub async fn soft_delete_category(&self, category_id: &str) -> Result<()> {
        let category_id = category_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let rows_affected = conn.execute(
                "UPDATE categories
                 SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, category_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Category not found or already deleted"));
            }
            Ok(())
        })
        .await
    }

    /// Populate an empty registry with the vocabulary's preset categories.
    /// Returns how many were created; a registry that ever held a category is
    /// left alone.
    pub async fn seed_default_categories(&self, vocabulary: TitleVocabulary) -> Result<usize> {
        self.transaction(move |tx| {
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(0);
            }

            let now = Utc::now();
            let mut created = 0;
            for (key, color) in vocabulary.category_keys().zip(DEFAULT_PALETTE.iter().cycle()) {
                let id = Uuid::new_v4().to_string();
                insert_category(tx, &id, &capitalize(key), 0, color, None, None, now)?;
                created += 1;
            }
            Ok(created)
        })
        .await
    }

    /// Add `minutes` to a category's XP and log the credit, atomically.
    pub async fn credit_minutes(
        &self,
        category_id: &str,
        minutes: u64,
        source: XpSource,
    ) -> Result<CreditedMinutes> {
        if minutes == 0 {
            bail!("Cannot credit zero minutes");
        }

        let category_id = category_id.to_string();
        self.transaction(move |tx| {
            let before = load_category(tx, &category_id)?
                .ok_or_else(|| anyhow!("Category {category_id} not found"))?;

            let new_xp = before
                .xp
                .checked_add(minutes)
                .ok_or_else(|| anyhow!("XP overflow for category {category_id}"))?;
            let now = Utc::now();

            tx.execute(
                "UPDATE categories SET xp = ?1, updated_at = ?2 WHERE id = ?3",
                params![to_i64(new_xp)?, now.to_rfc3339(), category_id],
            )?;

            let entry = XpEntry {
                id: Uuid::new_v4().to_string(),
                category_id: category_id.clone(),
                minutes,
                source,
                logged_at: now,
            };
            insert_xp_entry(tx, &entry)?;

            let after = load_category(tx, &category_id)?
                .ok_or_else(|| anyhow!("Category not found after credit"))?;

            Ok(CreditedMinutes {
                before,
                after,
                entry,
            })
        })
        .await
    }

    /// Merge a browser-storage snapshot into the registry.
    ///
    /// Each record lands on the category with its id, restoring it if it was
    /// soft-deleted. Failing that, it merges into the active category with the
    /// same name; otherwise a new category is created under the record's id.
    /// Presentation fields are taken from the snapshot. XP only moves up: the
    /// difference is logged as an `Import` credit.
    pub async fn import_snapshot(&self, records: Vec<SnapshotCategory>) -> Result<ImportSummary> {
        for record in &records {
            validate_name(&record.name)?;
        }

        self.transaction(move |tx| {
            let mut summary = ImportSummary::default();
            let mut palette = DEFAULT_PALETTE.iter().cycle();
            let now = Utc::now();

            for record in records {
                let placement = match load_category_with_deleted(tx, &record.id)? {
                    Some(existing) if existing.deleted_at.is_none() => Placement::SameId(existing),
                    Some(deleted) => {
                        if name_taken(tx, &record.name, Some(&deleted.id))? {
                            warn!(
                                "Skipping deleted category {}: '{}' is now used by another category",
                                deleted.id,
                                record.name.trim()
                            );
                            summary.skipped += 1;
                            continue;
                        }
                        tx.execute(
                            "UPDATE categories SET deleted_at = NULL, order_index = ?1 WHERE id = ?2",
                            params![next_order_index(tx)?, deleted.id],
                        )?;
                        Placement::Restored(deleted)
                    }
                    None => match load_category_by_name(tx, &record.name)? {
                        Some(existing) => Placement::SameName(existing),
                        None => Placement::New,
                    },
                };

                let color = match record.color.as_deref() {
                    Some(color) if validate_color(color).is_ok() => color.to_string(),
                    _ => palette.next().copied().unwrap_or("#FFFFFF").to_string(),
                };
                let custom_color = record
                    .custom_color
                    .filter(|custom| validate_color(custom).is_ok());

                let existing = match placement {
                    Placement::SameId(existing) | Placement::SameName(existing) => {
                        summary.updated += 1;
                        Some(existing)
                    }
                    Placement::Restored(existing) => {
                        summary.restored += 1;
                        Some(existing)
                    }
                    Placement::New => None,
                };

                let (category_id, existing_xp) = match existing {
                    Some(existing) => {
                        let name = if name_taken(tx, &record.name, Some(&existing.id))? {
                            warn!(
                                "Keeping name '{}' for category {}: '{}' is used by another category",
                                existing.name,
                                existing.id,
                                record.name.trim()
                            );
                            existing.name.clone()
                        } else {
                            record.name.trim().to_string()
                        };
                        tx.execute(
                            "UPDATE categories
                             SET name = ?1, color = ?2, custom_color = ?3, icon_name = ?4, updated_at = ?5
                             WHERE id = ?6",
                            params![
                                name,
                                color,
                                custom_color,
                                record.icon_name,
                                now.to_rfc3339(),
                                existing.id,
                            ],
                        )?;
                        (existing.id, existing.xp)
                    }
                    None => {
                        insert_category(
                            tx,
                            &record.id,
                            &record.name,
                            0,
                            &color,
                            custom_color.as_deref(),
                            record.icon_name.as_deref(),
                            now,
                        )?;
                        summary.created += 1;
                        (record.id.clone(), 0)
                    }
                };

                if record.xp > existing_xp {
                    let delta = record.xp - existing_xp;
                    tx.execute(
                        "UPDATE categories SET xp = ?1 WHERE id = ?2",
                        params![to_i64(record.xp)?, category_id],
                    )?;
                    insert_xp_entry(
                        tx,
                        &XpEntry {
                            id: Uuid::new_v4().to_string(),
                            category_id,
                            minutes: delta,
                            source: XpSource::Import,
                            logged_at: now,
                        },
                    )?;
                    summary.xp_added += delta;
                }
            }

            Ok(summary)
        })
        .await
    }
}
