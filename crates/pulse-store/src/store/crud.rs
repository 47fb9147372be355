use super::EventStore;
use crate::error::{Error, Result};
use crate::event::{Event, EventStatus};
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

const EVENT_COLUMNS: &str = "id, event_name, payload, created_at, source, status";

impl EventStore {
    /// Append an event to the log.
    ///
    /// Fails with `Validation` on an empty `event_name` and `Database` when
    /// the write itself fails. On success returns the fully populated row
    /// including the assigned id and `status = new`.
    pub async fn append(
        &self,
        event_name: &str,
        payload: &serde_json::Value,
        source: &str,
    ) -> Result<Event> {
        if event_name.trim().is_empty() {
            return Err(Error::Validation("event_name must not be empty".to_string()));
        }

        let created_at = Utc::now();
        let payload_json = serde_json::to_string(payload)?;

        let result = sqlx::query(
            "INSERT INTO events (event_name, payload, created_at, source, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(event_name)
        .bind(&payload_json)
        .bind(created_at.to_rfc3339())
        .bind(source)
        .bind(EventStatus::New.as_str())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Appended event {} ('{}')", id, event_name);

        Ok(Event {
            id,
            event_name: event_name.to_string(),
            payload: payload.clone(),
            created_at,
            source: source.to_string(),
            status: EventStatus::New,
        })
    }

    /// All stored events, oldest first, optionally restricted to one name.
    pub async fn list(&self, event_name: Option<&str>) -> Result<Vec<Event>> {
        let rows = match event_name {
            Some(name) => {
                sqlx::query(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE event_name = ?1 ORDER BY id"
                ))
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::row_to_event).collect()
    }

    /// Number of stored events.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    /// Events still in `new` status, oldest first.
    pub async fn list_unprocessed(&self, limit: i64) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'new' ORDER BY id LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    /// Advance an event to `processed`. Returns false if the id is unknown.
    pub async fn mark_processed(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE events SET status = ?1 WHERE id = ?2")
            .bind(EventStatus::Processed.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<Event> {
        let payload_str: String = row.try_get("payload")?;
        let created_str: String = row.try_get("created_at")?;
        let status_str: String = row.try_get("status")?;
        Ok(Event {
            id: row.try_get("id")?,
            event_name: row.try_get("event_name")?,
            payload: serde_json::from_str(&payload_str)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            source: row.try_get("source")?,
            status: status_str.parse().unwrap_or(EventStatus::New),
        })
    }
}
