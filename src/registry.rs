//! Reading the category registry the web client keeps in browser storage.
//!
//! The stored shape is a JSON array of `{id, name, xp, color, customColor,
//! iconName}` records. Ids may be strings or numbers and `xp` may be missing.

use anyhow::{bail, Context, Result};
use log::warn;
use serde::Deserialize;
use serde_json::Value;

/// A registry record after validation; `xp` is always a valid minute count.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotCategory {
    pub id: String,
    pub name: String,
    pub xp: u64,
    pub color: Option<String>,
    pub custom_color: Option<String>,
    pub icon_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCategory {
    id: Value,
    name: String,
    #[serde(default)]
    xp: Option<f64>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    custom_color: Option<String>,
    #[serde(default)]
    icon_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSnapshot {
    List(Vec<RawCategory>),
    Wrapped { categories: Vec<RawCategory> },
}

fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Parse a registry snapshot, dropping records that cannot be trusted.
///
/// Missing XP counts as zero; records with negative XP or without a usable id
/// are skipped with a warning. Duplicate ids are an error.
pub fn parse_snapshot(json: &str) -> Result<Vec<SnapshotCategory>> {
    let raw: RawSnapshot =
        serde_json::from_str(json).context("registry snapshot is not a category list")?;
    let records = match raw {
        RawSnapshot::List(records) => records,
        RawSnapshot::Wrapped { categories } => categories,
    };

    let mut categories: Vec<SnapshotCategory> = Vec::with_capacity(records.len());
    for record in records {
        let Some(id) = id_to_string(&record.id) else {
            warn!("Skipping category '{}' without a usable id", record.name);
            continue;
        };

        let xp = record.xp.unwrap_or(0.0);
        if xp < 0.0 {
            warn!("Skipping category {id} with negative xp {xp}");
            continue;
        }

        if categories.iter().any(|existing| existing.id == id) {
            bail!("registry snapshot contains duplicate id {id}");
        }

        categories.push(SnapshotCategory {
            id,
            name: record.name,
            xp: xp.floor() as u64,
            color: record.color,
            custom_color: record.custom_color,
            icon_name: record.icon_name,
        });
    }

    Ok(categories)
}
