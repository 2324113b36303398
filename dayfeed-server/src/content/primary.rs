//! Primary content store backed by the `content_items` table

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use dayfeed_common::{Result, TimeOfDay};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use super::{Category, ContentItem, ContentStore, SourceTier, WeatherAffinity};

/// Content pools stored in the local SQLite database
#[derive(Clone)]
pub struct SqliteContentStore {
    db: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert one item at `position`
    ///
    /// Ingestion normally happens outside the server; this is used by
    /// seeding scripts and tests.
    pub async fn insert(&self, item: &ContentItem, position: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content_items
                (guid, client_id, category, payload, caption, weather_affinity, time_of_day, position)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.client_id)
        .bind(item.category.as_str())
        .bind(&item.payload)
        .bind(&item.caption)
        .bind(affinity_name(item.weather_affinity))
        .bind(item.time_of_day.map(|t| t.label()))
        .bind(position)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

fn affinity_name(affinity: WeatherAffinity) -> &'static str {
    match affinity {
        WeatherAffinity::Any => "any",
        WeatherAffinity::Outdoor => "outdoor",
        WeatherAffinity::Indoor => "indoor",
        WeatherAffinity::Rain => "rain",
        WeatherAffinity::Cold => "cold",
    }
}

/// Parse SQLite `CURRENT_TIMESTAMP` text or RFC 3339
fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch(&self, client_id: &str, category: Category) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query(
            r#"
            SELECT guid, payload, caption, weather_affinity, time_of_day, created_at
            FROM content_items
            WHERE client_id = ? AND category = ?
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(client_id)
        .bind(category.as_str())
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let guid: String = row.try_get("guid")?;

            let affinity_raw: String = row.try_get("weather_affinity")?;
            let weather_affinity = match WeatherAffinity::parse_lenient(&affinity_raw) {
                Ok(affinity) => affinity,
                Err(e) => {
                    warn!(guid = %guid, "Skipping content item: {}", e);
                    continue;
                }
            };

            let time_of_day = match row.try_get::<Option<String>, _>("time_of_day")? {
                Some(raw) if !raw.trim().is_empty() => match raw.parse::<TimeOfDay>() {
                    Ok(slot) => Some(slot),
                    Err(e) => {
                        warn!(guid = %guid, "Skipping content item: {}", e);
                        continue;
                    }
                },
                _ => None,
            };

            let created_raw: String = row.try_get("created_at")?;
            let created_at = parse_created_at(&created_raw).unwrap_or_else(Utc::now);

            items.push(ContentItem {
                id: guid,
                client_id: client_id.to_string(),
                category,
                payload: row.try_get("payload")?,
                caption: row.try_get("caption")?,
                created_at,
                source_tier: SourceTier::Primary,
                weather_affinity,
                time_of_day,
            });
        }

        Ok(items)
    }
}
