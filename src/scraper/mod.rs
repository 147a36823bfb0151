pub mod extractor;
pub mod http_client;
pub mod locator;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ScrapeError;
use crate::models::{ScrapeTarget, SubsidyRecord};
use crate::normalize::{dates, normalize_listing};

use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable subsidy source abstraction.
#[async_trait]
pub trait SubsidySource: Send + Sync {
    fn target(&self) -> &ScrapeTarget;
    async fn fetch_listings(&self) -> Result<Vec<SubsidyRecord>, ScrapeError>;
}

// ── Site scraper ──────────────────────────────────────────────────────────────

/// Selector-driven scraper for one configured listing site.
pub struct SiteScraper {
    client: Arc<HttpClient>,
    target: ScrapeTarget,
}

impl SiteScraper {
    pub fn new(client: Arc<HttpClient>, target: ScrapeTarget) -> Self {
        Self { client, target }
    }

    /// Locate containers and extract records from already-fetched HTML.
    ///
    /// A failed element only skips that element; the loop always finishes.
    pub fn parse_document(&self, html: &str) -> Vec<SubsidyRecord> {
        let doc = Html::parse_document(html);
        let located = locator::locate_containers(&doc, &self.target.selectors.container);

        if located.elements.is_empty() {
            warn!("{}: no candidate containers found", self.target.id);
            locator::log_page_diagnostics(&doc);
            return Vec::new();
        }

        debug!(
            "{}: {} containers via '{}' (keyword-filtered: {})",
            self.target.id,
            located.elements.len(),
            located.selector,
            located.filtered,
        );

        let base = Url::parse(&self.target.url).ok();
        let today = dates::jst_date(Utc::now());
        let now = Utc::now().naive_utc();

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for el in &located.elements {
            let raw = extractor::extract_listing(el, &self.target.selectors, base.as_ref());
            match normalize_listing(&raw, &self.target, today, now) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    debug!("{}: skipping element: {}", self.target.id, e);
                }
            }
        }

        info!(
            "{}: {} records extracted, {} elements skipped",
            self.target.id,
            records.len(),
            skipped
        );
        records
    }
}

#[async_trait]
impl SubsidySource for SiteScraper {
    fn target(&self) -> &ScrapeTarget {
        &self.target
    }

    async fn fetch_listings(&self) -> Result<Vec<SubsidyRecord>, ScrapeError> {
        let html = self.client.get_text(&self.target.url).await?;
        Ok(self.parse_document(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::models::SelectorSet;

    fn scraper_for(target: ScrapeTarget) -> SiteScraper {
        let client = Arc::new(HttpClient::new(&ScraperConfig::default()).expect("client"));
        SiteScraper::new(client, target)
    }

    fn table_target() -> ScrapeTarget {
        ScrapeTarget {
            id: "table-site".into(),
            name: "表形式サイト".into(),
            url: "https://example.jp/subsidies".into(),
            organization: "テスト県".into(),
            selectors: SelectorSet {
                container: vec!["table tr".into()],
                ..SelectorSet::default()
            },
        }
    }

    #[test]
    fn parses_table_page_into_records() {
        let html = r#"
            <html><body><table><tbody>
              <tr>
                <td>ものづくり補助金（設備投資の支援）</td>
                <td>革新的サービス開発を支援。上限100万円。</td>
                <td>2025年5月1日</td>
              </tr>
              <tr>
                <td>持続化補助金（販路開拓の支援）</td>
                <td>小規模事業者の販路開拓。上限100万円。</td>
                <td>2025年5月1日</td>
              </tr>
            </tbody></table></body></html>"#;

        let records = scraper_for(table_target()).parse_document(html);
        assert_eq!(records.len(), 2);
        for rec in &records {
            assert!(rec.max_amount.contains("100万円"));
            assert!(rec.application_period_end.is_some());
            assert_eq!(rec.organization, "テスト県");
            assert!(!rec.categories.is_empty());
        }
    }

    #[test]
    fn empty_page_degrades_to_no_records() {
        let records = scraper_for(table_target())
            .parse_document("<html><body><p>メンテナンス中</p></body></html>");
        assert!(records.is_empty());
    }
}
