use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── Scrape target ─────────────────────────────────────────────────────────────

/// One external listing site configured for scraping.
///
/// Immutable for the duration of a run. `selectors` carries the ordered
/// candidate lists per field, most site-specific first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Organization to attribute records to when the page itself names none.
    pub organization: String,
    pub selectors: SelectorSet,
}

/// Ordered candidate selectors per field category.
/// Evaluated left to right; first match wins (containers: largest match set wins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorSet {
    pub container: Vec<String>,
    pub title: Vec<String>,
    pub summary: Vec<String>,
    pub deadline: Vec<String>,
    pub organization: Vec<String>,
    pub amount: Vec<String>,
    pub category: Vec<String>,
}

// ── Raw listing (extractor output) ────────────────────────────────────────────

/// Untyped field text pulled out of one container element.
/// Everything degrades to empty/None; the normalizer decides what survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    pub title: String,
    pub summary: String,
    pub organization: String,
    pub deadline_text: String,
    pub amount_text: String,
    pub category_text: String,
    pub detail_url: Option<String>,
}

// ── Subsidy record ────────────────────────────────────────────────────────────

/// Minimum title length for a listing to count as a real record rather than
/// navigation/noise text.
pub const MIN_NAME_LEN: usize = 5;

/// Cap on the assembled summary text, in characters.
pub const MAX_SUMMARY_LEN: usize = 500;

/// A normalized subsidy listing, ready for upsert.
///
/// Identity for dedup purposes is (`name`, `organization`) exact equality.
/// Known fragility: a year suffix changing in the source title ("2024年度" →
/// "2025年度") produces a new identity rather than an update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubsidyRecord {
    pub name: String,
    pub organization: String,
    pub summary: String,
    pub target_audience: String,
    pub subsidy_rate: String,
    pub max_amount: String,
    pub min_amount: String,
    pub application_period_start: Option<NaiveDate>,
    pub application_period_end: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub industries: Vec<String>,
    /// None means nationwide.
    pub prefecture: Option<String>,
    pub official_page_url: String,
    pub status: String,
    pub scraped_at: NaiveDateTime,
}

// ── Scrape run log ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Running,
    Success,
    Failed,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Running => "running",
            ScrapeStatus::Success => "success",
            ScrapeStatus::Failed => "failed",
        }
    }
}

/// One row per target per run. Append-only; `status` moves from `running`
/// to exactly one terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeLog {
    pub id: i64,
    pub source_url: String,
    pub source_name: String,
    pub status: ScrapeStatus,
    pub scraped_count: i64,
    pub error_message: Option<String>,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}
