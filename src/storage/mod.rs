use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDateTime, Utc};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::models::{ScrapeLog, ScrapeStatus, SubsidyRecord};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS subsidies (
    id                          BIGINT PRIMARY KEY,
    name                        VARCHAR NOT NULL,
    organization                VARCHAR NOT NULL,
    summary                     VARCHAR NOT NULL DEFAULT '',
    target_audience             VARCHAR NOT NULL DEFAULT '',
    subsidy_rate                VARCHAR NOT NULL DEFAULT '',
    max_amount                  VARCHAR NOT NULL DEFAULT '',
    min_amount                  VARCHAR NOT NULL DEFAULT '',
    application_period_start    DATE,
    application_period_end      DATE,
    -- JSON-encoded label arrays
    categories                  VARCHAR NOT NULL DEFAULT '[]',
    industries                  VARCHAR NOT NULL DEFAULT '[]',
    -- NULL means nationwide
    prefecture                  VARCHAR,
    official_page_url           VARCHAR NOT NULL DEFAULT '',
    status                      VARCHAR NOT NULL DEFAULT 'active',
    created_at                  TIMESTAMP NOT NULL,
    updated_at                  TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS scraping_logs (
    id              BIGINT PRIMARY KEY,
    source_url      VARCHAR NOT NULL,
    source_name     VARCHAR NOT NULL,
    status          VARCHAR NOT NULL DEFAULT 'running',
    scraped_count   BIGINT NOT NULL DEFAULT 0,
    error_message   VARCHAR,
    started_at      TIMESTAMP NOT NULL,
    completed_at    TIMESTAMP
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

// Identity lookups go through this index. Deliberately NOT a unique
// constraint: dedup is lookup-then-branch in the single-writer run model,
// and a unique constraint would turn the accepted race into hard failures.
const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_subsidies_identity ON subsidies (name, organization);
CREATE INDEX IF NOT EXISTS idx_logs_started ON scraping_logs (started_at);
"#;

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The connection sits behind a mutex so the repository can be shared with
/// the trigger server's handler futures; the run model itself stays
/// single-writer and sequential.
pub struct Repository {
    conn: Mutex<Connection>,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("store mutex poisoned"))
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        let conn = self.conn()?;
        conn.execute_batch(DDL).context("DDL failed")?;
        conn.execute_batch(INDEXES)
            .context("Index creation failed")?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    fn next_id(conn: &Connection, table: &str) -> Result<i64> {
        let sql = format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {table}");
        let id: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(id)
    }

    // ── Subsidies ─────────────────────────────────────────────────────────────

    /// Identity lookup: exact (name, organization) match.
    pub fn find_subsidy(&self, name: &str, organization: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id FROM subsidies WHERE name = ? AND organization = ? LIMIT 1")?;
        let mut rows = stmt.query(params![name, organization])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn insert_subsidy(&self, record: &SubsidyRecord) -> Result<i64> {
        let conn = self.conn()?;
        let id = Self::next_id(&conn, "subsidies")?;
        let now = Utc::now().naive_utc();
        conn.execute(
                r#"INSERT INTO subsidies
                   (id, name, organization, summary, target_audience, subsidy_rate,
                    max_amount, min_amount, application_period_start, application_period_end,
                    categories, industries, prefecture, official_page_url, status,
                    created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                params![
                    id,
                    record.name,
                    record.organization,
                    record.summary,
                    record.target_audience,
                    record.subsidy_rate,
                    record.max_amount,
                    record.min_amount,
                    record.application_period_start,
                    record.application_period_end,
                    serde_json::to_string(&record.categories)?,
                    serde_json::to_string(&record.industries)?,
                    record.prefecture,
                    record.official_page_url,
                    record.status,
                    now,
                    now,
                ],
        )
        .with_context(|| format!("insert subsidy {}", record.name))?;
        Ok(id)
    }

    fn update_subsidy(&self, id: i64, record: &SubsidyRecord) -> Result<()> {
        self.conn()?
            .execute(
                r#"UPDATE subsidies SET
                   summary = ?, target_audience = ?, subsidy_rate = ?,
                   max_amount = ?, min_amount = ?,
                   application_period_start = ?, application_period_end = ?,
                   categories = ?, industries = ?, prefecture = ?,
                   official_page_url = ?, status = ?, updated_at = ?
                   WHERE id = ?"#,
                params![
                    record.summary,
                    record.target_audience,
                    record.subsidy_rate,
                    record.max_amount,
                    record.min_amount,
                    record.application_period_start,
                    record.application_period_end,
                    serde_json::to_string(&record.categories)?,
                    serde_json::to_string(&record.industries)?,
                    record.prefecture,
                    record.official_page_url,
                    record.status,
                    Utc::now().naive_utc(),
                    id,
                ],
            )
            .with_context(|| format!("update subsidy {}", record.name))?;
        Ok(())
    }

    /// Insert-if-absent, else update-in-place, keyed by (name, organization).
    /// Idempotent when re-run against unchanged source data.
    pub fn upsert_subsidy(&self, record: &SubsidyRecord) -> Result<UpsertOutcome> {
        match self.find_subsidy(&record.name, &record.organization)? {
            Some(id) => {
                self.update_subsidy(id, record)?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.insert_subsidy(record)?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    pub fn subsidy_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let mut s = conn.prepare("SELECT COUNT(*) FROM subsidies")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn count_by_identity(&self, name: &str, organization: &str) -> Result<i64> {
        let conn = self.conn()?;
        let mut s =
            conn.prepare("SELECT COUNT(*) FROM subsidies WHERE name = ? AND organization = ?")?;
        Ok(s.query_row(params![name, organization], |r| r.get(0))?)
    }

    // ── Scraping logs ─────────────────────────────────────────────────────────

    /// Open a run-log row in `running` state. One per target per run.
    pub fn begin_scrape_log(&self, source_url: &str, source_name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let id = Self::next_id(&conn, "scraping_logs")?;
        conn.execute(
            r#"INSERT INTO scraping_logs (id, source_url, source_name, status, started_at)
               VALUES (?, ?, ?, 'running', ?)"#,
            params![id, source_url, source_name, Utc::now().naive_utc()],
        )?;
        Ok(id)
    }

    /// Move a run-log row to its terminal state. Called exactly once per row.
    pub fn finish_scrape_log(
        &self,
        log_id: i64,
        status: ScrapeStatus,
        scraped_count: usize,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn()?.execute(
            r#"UPDATE scraping_logs SET
               status = ?, scraped_count = ?, error_message = ?, completed_at = ?
               WHERE id = ?"#,
            params![
                status.as_str(),
                scraped_count as i64,
                error,
                Utc::now().naive_utc(),
                log_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_scrape_log(&self, log_id: i64) -> Result<Option<ScrapeLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, source_url, source_name, status, scraped_count,
                      error_message, started_at, completed_at
               FROM scraping_logs WHERE id = ?"#,
        )?;
        let mut rows = stmt.query(params![log_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_log(row)?)),
            None => Ok(None),
        }
    }

    pub fn latest_scrape_logs(&self, limit: usize) -> Result<Vec<ScrapeLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, source_url, source_name, status, scraped_count,
                      error_message, started_at, completed_at
               FROM scraping_logs ORDER BY started_at DESC, id DESC LIMIT ?"#,
        )?;
        let logs = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, NaiveDateTime>(6)?,
                    row.get::<_, Option<NaiveDateTime>>(7)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .map(tuple_to_log)
            .collect();
        Ok(logs)
    }

    pub fn log_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let mut s = conn.prepare("SELECT COUNT(*) FROM scraping_logs")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }
}

fn parse_status(s: &str) -> ScrapeStatus {
    match s {
        "success" => ScrapeStatus::Success,
        "failed" => ScrapeStatus::Failed,
        _ => ScrapeStatus::Running,
    }
}

type LogRow = (
    i64,
    String,
    String,
    String,
    i64,
    Option<String>,
    NaiveDateTime,
    Option<NaiveDateTime>,
);

fn tuple_to_log(t: LogRow) -> ScrapeLog {
    ScrapeLog {
        id: t.0,
        source_url: t.1,
        source_name: t.2,
        status: parse_status(&t.3),
        scraped_count: t.4,
        error_message: t.5,
        started_at: t.6,
        completed_at: t.7,
    }
}

fn row_to_log(row: &duckdb::Row<'_>) -> Result<ScrapeLog> {
    Ok(tuple_to_log((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    )))
}
