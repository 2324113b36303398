//! Daily task list
//!
//! Tasks come from the client's configuration; acknowledgment state comes
//! from the ledger. A ledger read that fails or overruns its time budget
//! degrades to "not acknowledged" so the reminder stays visible.
//!
//! Task type and description are compared trimmed, the same way
//! confirmations are recorded.

use chrono::NaiveDate;
use dayfeed_common::api::DailyTask;
use dayfeed_common::config::ClientConfig;
use dayfeed_common::TimeOfDay;
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

use crate::ledger::{AckKey, AcknowledgmentLedger};

/// Today's tasks for `client`, in configuration order
///
/// The ledger read is bounded by `read_timeout`.
pub async fn plan_tasks(
    client: Option<&ClientConfig>,
    date: NaiveDate,
    current_slot: TimeOfDay,
    ledger: &AcknowledgmentLedger,
    read_timeout: Duration,
) -> Vec<DailyTask> {
    let Some(client) = client else {
        return Vec::new();
    };
    if client.tasks.is_empty() {
        return Vec::new();
    }

    let acked = match tokio::time::timeout(
        read_timeout,
        ledger.acked_keys_for_date(date, client.id.trim()),
    )
    .await
    {
        Ok(Ok(keys)) => keys,
        Ok(Err(e)) => {
            warn!(client_id = %client.id, "Ledger unavailable, showing tasks as unacknowledged: {}", e);
            HashSet::new()
        }
        Err(_) => {
            warn!(
                client_id = %client.id,
                timeout_ms = read_timeout.as_millis() as u64,
                "Ledger read timed out, showing tasks as unacknowledged"
            );
            HashSet::new()
        }
    };

    client
        .tasks
        .iter()
        .map(|task| {
            let task_type = task.task_type.trim();
            let description = task.description.trim();
            let key = AckKey::new(task_type, task.time_slot.label(), description);
            DailyTask {
                task_type: task_type.to_string(),
                time_slot: task.time_slot.label().to_string(),
                description: description.to_string(),
                requires_ack: task.requires_ack,
                is_acked_today: acked.contains(&key),
                is_current_slot: task.time_slot == current_slot,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dayfeed_common::config::TaskConfig;
    use dayfeed_common::db::init_memory_database;

    const BUDGET: Duration = Duration::from_secs(2);

    fn client() -> ClientConfig {
        ClientConfig {
            id: "mom".to_string(),
            name: None,
            location: None,
            timezone: None,
            tasks: vec![
                TaskConfig {
                    task_type: "LAAKE".to_string(),
                    time_slot: TimeOfDay::Morning,
                    description: "Verenpainelääke".to_string(),
                    requires_ack: true,
                },
                TaskConfig {
                    task_type: "RUOKA".to_string(),
                    time_slot: TimeOfDay::Midday,
                    description: "Lounas".to_string(),
                    requires_ack: false,
                },
            ],
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 9).unwrap()
    }

    #[tokio::test]
    async fn test_tasks_carry_ack_state() {
        let ledger = AcknowledgmentLedger::new(init_memory_database().await.unwrap());
        ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "mom", Utc::now())
            .await
            .unwrap();

        let client = client();
        let tasks = plan_tasks(Some(&client), day(), TimeOfDay::Midday, &ledger, BUDGET).await;

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].time_slot, "Aamu");
        assert!(tasks[0].requires_ack);
        assert!(tasks[0].is_acked_today);
        assert!(!tasks[0].is_current_slot);

        assert!(!tasks[1].requires_ack);
        assert!(!tasks[1].is_acked_today);
        assert!(tasks[1].is_current_slot);
    }

    #[tokio::test]
    async fn test_unknown_client_has_no_tasks() {
        let ledger = AcknowledgmentLedger::new(init_memory_database().await.unwrap());
        assert!(plan_tasks(None, day(), TimeOfDay::Morning, &ledger, BUDGET).await.is_empty());
    }

    #[tokio::test]
    async fn test_ledger_failure_degrades_to_unacked() {
        let db = init_memory_database().await.unwrap();
        let ledger = AcknowledgmentLedger::new(db.clone());
        ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "mom", Utc::now())
            .await
            .unwrap();
        db.close().await;

        let client = client();
        let tasks = plan_tasks(Some(&client), day(), TimeOfDay::Morning, &ledger, BUDGET).await;
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| !t.is_acked_today));
    }

    #[tokio::test]
    async fn test_other_clients_confirmation_not_shown() {
        let ledger = AcknowledgmentLedger::new(init_memory_database().await.unwrap());
        ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "dad", Utc::now())
            .await
            .unwrap();

        let client = client();
        let tasks = plan_tasks(Some(&client), day(), TimeOfDay::Morning, &ledger, BUDGET).await;
        assert!(!tasks[0].is_acked_today);
    }

    #[tokio::test]
    async fn test_padded_config_text_matches_trimmed_confirmation() {
        let ledger = AcknowledgmentLedger::new(init_memory_database().await.unwrap());
        ledger
            .acknowledge(day(), "RUOKA", "Päivä", "Lounas", "mom", Utc::now())
            .await
            .unwrap();

        let mut client = client();
        client.tasks[1].task_type = " RUOKA".to_string();
        client.tasks[1].description = "Lounas ".to_string();

        let tasks = plan_tasks(Some(&client), day(), TimeOfDay::Midday, &ledger, BUDGET).await;
        assert!(tasks[1].is_acked_today);
        assert_eq!(tasks[1].task_type, "RUOKA");
        assert_eq!(tasks[1].description, "Lounas");
    }

    #[tokio::test]
    async fn test_blocked_ledger_read_times_out() {
        let db = init_memory_database().await.unwrap();
        let ledger = AcknowledgmentLedger::new(db.clone());
        ledger
            .acknowledge(day(), "LAAKE", "Aamu", "Verenpainelääke", "mom", Utc::now())
            .await
            .unwrap();

        // The memory pool has a single connection; holding it blocks reads
        let _held = db.acquire().await.unwrap();

        let client = client();
        let started = std::time::Instant::now();
        let tasks = plan_tasks(
            Some(&client),
            day(),
            TimeOfDay::Morning,
            &ledger,
            Duration::from_millis(200),
        )
        .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| !t.is_acked_today));
    }
}
