use super::EventStore;
use crate::error::Result;

impl EventStore {
    // ── Migrations ──────────────────────────────────────────────

    pub(crate) async fn run_migrations(&self) -> Result<()> {
        // AUTOINCREMENT keeps ids strictly increasing even after deletes
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                event_name TEXT NOT NULL,
                payload    TEXT NOT NULL,
                created_at TEXT NOT NULL,
                source     TEXT NOT NULL DEFAULT 'system',
                status     TEXT NOT NULL DEFAULT 'new'
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_name ON events(event_name)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_status ON events(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
