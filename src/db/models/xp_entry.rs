use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a credit of minutes came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum XpSource {
    Timer,
    Manual,
    Import,
}

impl XpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            XpSource::Timer => "Timer",
            XpSource::Manual => "Manual",
            XpSource::Import => "Import",
        }
    }
}

impl FromStr for XpSource {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Timer" => Ok(XpSource::Timer),
            "Manual" => Ok(XpSource::Manual),
            "Import" => Ok(XpSource::Import),
            other => Err(anyhow!("unknown xp source {other}")),
        }
    }
}

/// One credit of focus minutes to a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpEntry {
    pub id: String,
    pub category_id: String,
    pub minutes: u64,
    pub source: XpSource,
    pub logged_at: DateTime<Utc>,
}
