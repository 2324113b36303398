//! Acknowledgment ledger
//!
//! Append-only record of confirmed reminders. The logical key is
//! `(date, client_id, task_type, time_slot, description)`; the table's
//! UNIQUE constraint on that key makes the conditional insert atomic, so a
//! double-tap from the tablet produces one row no matter how the two
//! requests interleave. Two clients configured with the same reminder
//! never see each other's confirmations.
//!
//! Writes fail closed: if the database cannot be reached the caller gets
//! `Error::LedgerWriteFailure`, never a reported success.

use chrono::{DateTime, NaiveDate, Utc};
use dayfeed_common::api::AcknowledgmentEntry;
use dayfeed_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, error, info};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ledger key of one reminder on one day (date and client implied)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckKey {
    pub task_type: String,
    pub time_slot: String,
    pub description: String,
}

impl AckKey {
    pub fn new(
        task_type: impl Into<String>,
        time_slot: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            task_type: task_type.into(),
            time_slot: time_slot.into(),
            description: description.into(),
        }
    }
}

#[derive(Clone)]
pub struct AcknowledgmentLedger {
    db: SqlitePool,
}

impl AcknowledgmentLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Whether the backing database answers a trivial query
    pub async fn is_reachable(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db).await.is_ok()
    }

    /// Whether `client_id` already confirmed the reminder on `date`
    pub async fn is_acked(
        &self,
        date: NaiveDate,
        client_id: &str,
        task_type: &str,
        time_slot: &str,
        description: &str,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM acknowledgments
                WHERE ack_date = ? AND client_id = ?
                  AND task_type = ? AND time_slot = ? AND description = ?
            )
            "#,
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(client_id)
        .bind(task_type)
        .bind(time_slot)
        .bind(description)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    /// Record a confirmation
    ///
    /// Returns `true` when this client already confirmed the reminder that
    /// day, in which case nothing is written.
    pub async fn acknowledge(
        &self,
        date: NaiveDate,
        task_type: &str,
        time_slot: &str,
        description: &str,
        client_id: &str,
        acked_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO acknowledgments
                (guid, ack_date, task_type, time_slot, description, client_id, acked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ack_date, client_id, task_type, time_slot, description) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(task_type)
        .bind(time_slot)
        .bind(description)
        .bind(client_id)
        .bind(acked_at.to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(
                client_id = %client_id,
                task_type = %task_type,
                time_slot = %time_slot,
                "Acknowledgment write failed: {}",
                e
            );
            Error::LedgerWriteFailure(e.to_string())
        })?;

        let already_acked = result.rows_affected() == 0;
        if already_acked {
            debug!(
                client_id = %client_id,
                task_type = %task_type,
                time_slot = %time_slot,
                date = %date,
                "Duplicate acknowledgment ignored"
            );
        } else {
            info!(
                client_id = %client_id,
                task_type = %task_type,
                time_slot = %time_slot,
                date = %date,
                "Task acknowledged"
            );
        }

        Ok(already_acked)
    }

    /// Keys `client_id` confirmed on `date`, for planning a whole task list
    /// in one query
    pub async fn acked_keys_for_date(
        &self,
        date: NaiveDate,
        client_id: &str,
    ) -> Result<HashSet<AckKey>> {
        let rows = sqlx::query(
            r#"
            SELECT task_type, time_slot, description FROM acknowledgments
            WHERE ack_date = ? AND client_id = ?
            "#,
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| -> Result<AckKey> {
                Ok(AckKey {
                    task_type: row.try_get("task_type")?,
                    time_slot: row.try_get("time_slot")?,
                    description: row.try_get("description")?,
                })
            })
            .collect()
    }

    /// Records for `date`, optionally limited to one client, oldest first
    pub async fn acks_for_date(
        &self,
        date: NaiveDate,
        client_id: Option<&str>,
    ) -> Result<Vec<AcknowledgmentEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT task_type, time_slot, description, client_id, acked_at
            FROM acknowledgments
            WHERE ack_date = ? AND (? IS NULL OR client_id = ?)
            ORDER BY acked_at ASC
            "#,
        )
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(client_id)
        .bind(client_id)
        .fetch_all(&self.db)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let acked_raw: String = row.try_get("acked_at")?;
            let acked_at = DateTime::parse_from_rfc3339(&acked_raw)
                .map_err(|e| Error::DataInvalid(format!("Bad acked_at '{}': {}", acked_raw, e)))?
                .with_timezone(&Utc);

            entries.push(AcknowledgmentEntry {
                date,
                task_type: row.try_get("task_type")?,
                time_slot: row.try_get("time_slot")?,
                description: row.try_get("description")?,
                client_id: row.try_get("client_id")?,
                acked_at,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dayfeed_common::db::init_memory_database;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 9).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 9, hour, 0, 0).unwrap()
    }

    async fn ledger() -> AcknowledgmentLedger {
        AcknowledgmentLedger::new(init_memory_database().await.unwrap())
    }

    async fn row_count(ledger: &AcknowledgmentLedger) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM acknowledgments")
            .fetch_one(&ledger.db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_acknowledge_is_noop() {
        let ledger = ledger().await;

        let first = ledger
            .acknowledge(day(), "RUOKA", "Aamu", "Lounas", "mom", at(8))
            .await
            .unwrap();
        let second = ledger
            .acknowledge(day(), "RUOKA", "Aamu", "Lounas", "mom", at(9))
            .await
            .unwrap();

        assert!(!first);
        assert!(second);
        assert_eq!(row_count(&ledger).await, 1);
        assert!(ledger.is_acked(day(), "mom", "RUOKA", "Aamu", "Lounas").await.unwrap());
    }

    #[tokio::test]
    async fn test_description_distinguishes_reminders() {
        let ledger = ledger().await;

        ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "mom", at(7))
            .await
            .unwrap();
        let other = ledger
            .acknowledge(day(), "LAAKE", "Aamu", "D-vitamiini", "mom", at(7))
            .await
            .unwrap();

        assert!(!other);
        assert_eq!(row_count(&ledger).await, 2);
        assert!(!ledger.is_acked(day(), "mom", "LAAKE", "Ilta", "D-vitamiini").await.unwrap());
    }

    #[tokio::test]
    async fn test_new_day_is_not_acked() {
        let ledger = ledger().await;
        ledger
            .acknowledge(day(), "RUOKA", "Aamu", "Puuro", "mom", at(8))
            .await
            .unwrap();

        let tomorrow = day().succ_opt().unwrap();
        assert!(!ledger.is_acked(tomorrow, "mom", "RUOKA", "Aamu", "Puuro").await.unwrap());
        assert!(!ledger
            .acknowledge(tomorrow, "RUOKA", "Aamu", "Puuro", "mom", at(8))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_write_once() {
        let ledger = ledger().await;

        let (a, b) = tokio::join!(
            ledger.acknowledge(day(), "RUOKA", "Päivä", "Lounas", "mom", at(12)),
            ledger.acknowledge(day(), "RUOKA", "Päivä", "Lounas", "mom", at(12)),
        );

        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort();
        assert_eq!(outcomes, vec![false, true]);
        assert_eq!(row_count(&ledger).await, 1);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_closed() {
        let ledger = ledger().await;
        ledger.db.close().await;

        let err = ledger
            .acknowledge(day(), "RUOKA", "Aamu", "Lounas", "mom", at(8))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LedgerWriteFailure(_)));
        assert!(ledger.is_acked(day(), "mom", "RUOKA", "Aamu", "Lounas").await.is_err());
    }

    #[tokio::test]
    async fn test_acks_for_date_reports_records() {
        let ledger = ledger().await;
        ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "mom", at(7))
            .await
            .unwrap();
        ledger
            .acknowledge(day(), "RUOKA", "Päivä", "Lounas", "dad", at(12))
            .await
            .unwrap();

        let all = ledger.acks_for_date(day(), None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].task_type, "LAAKE");
        assert_eq!(all[0].acked_at, at(7));

        let moms = ledger.acks_for_date(day(), Some("mom")).await.unwrap();
        assert_eq!(moms.len(), 1);

        let keys = ledger.acked_keys_for_date(day(), "dad").await.unwrap();
        assert!(keys.contains(&AckKey::new("RUOKA", "Päivä", "Lounas")));
        assert!(!keys.contains(&AckKey::new("LAAKE", "Aamu", "Verenpainelääke")));
    }

    #[tokio::test]
    async fn test_clients_sharing_a_reminder_are_independent() {
        let ledger = ledger().await;

        let dad = ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "dad", at(6))
            .await
            .unwrap();
        assert!(!dad);
        assert!(!ledger
            .is_acked(day(), "mom", "LAAKE", "Aamu", "Verenpainelääke")
            .await
            .unwrap());
        assert!(ledger
            .acked_keys_for_date(day(), "mom")
            .await
            .unwrap()
            .is_empty());

        // Mom's own confirmation is recorded, not swallowed as a duplicate
        let mom = ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "mom", at(7))
            .await
            .unwrap();
        assert!(!mom);
        assert_eq!(row_count(&ledger).await, 2);
        assert_eq!(ledger.acks_for_date(day(), Some("mom")).await.unwrap().len(), 1);
    }
}
