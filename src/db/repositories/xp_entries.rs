use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
    models::{XpEntry, XpSource},
};

fn row_to_entry(row: &Row) -> Result<XpEntry> {
    let minutes: i64 = row.get("minutes")?;
    let source: String = row.get("source")?;
    let logged_at: String = row.get("logged_at")?;

    Ok(XpEntry {
        id: row.get("id")?,
        category_id: row.get("category_id")?,
        minutes: to_u64(minutes, "minutes")?,
        source: source.parse::<XpSource>()?,
        logged_at: parse_datetime(&logged_at, "logged_at")?,
    })
}

impl Database {
    /// Most recent credits first, optionally for a single category.
    pub async fn list_xp_entries(
        &self,
        category_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<XpEntry>> {
        let category_id = category_id.map(str::to_string);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category_id, minutes, source, logged_at
                 FROM xp_entries
                 WHERE ?1 IS NULL OR category_id = ?1
                 ORDER BY logged_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![category_id, to_i64(limit)?])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }
            Ok(entries)
        })
        .await
    }

    /// Minutes credited across every category, deleted ones included.
    pub async fn total_logged_minutes(&self) -> Result<u64> {
        self.execute(|conn| {
            let total: i64 =
                conn.query_row("SELECT COALESCE(SUM(minutes), 0) FROM xp_entries", [], |row| {
                    row.get(0)
                })?;
            to_u64(total, "minutes")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{CategoryInput, Database, XpSource};

    #[tokio::test]
    async fn lists_newest_first_and_filters_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.sqlite3")).unwrap();

        let scholar = db
            .create_category(CategoryInput {
                name: "Scholar".into(),
                color: "#00FFAA".into(),
                icon_name: None,
            })
            .await
            .unwrap();
        let artisan = db
            .create_category(CategoryInput {
                name: "Artisan".into(),
                color: "#FF00FF".into(),
                icon_name: None,
            })
            .await
            .unwrap();

        db.credit_minutes(&scholar.id, 25, XpSource::Timer).await.unwrap();
        db.credit_minutes(&artisan.id, 40, XpSource::Manual).await.unwrap();
        db.credit_minutes(&scholar.id, 15, XpSource::Manual).await.unwrap();

        let all = db.list_xp_entries(None, 10).await.unwrap();
        let minutes: Vec<u64> = all.iter().map(|entry| entry.minutes).collect();
        assert_eq!(minutes, [15, 40, 25]);

        let scholar_only = db.list_xp_entries(Some(&scholar.id), 10).await.unwrap();
        assert_eq!(scholar_only.len(), 2);
        assert!(scholar_only.iter().all(|entry| entry.category_id == scholar.id));

        let limited = db.list_xp_entries(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert_eq!(db.total_logged_minutes().await.unwrap(), 80);
    }
}
