//! Container locator: find the repeating "subsidy listing" elements on an
//! arbitrary page.
//!
//! Every candidate selector is evaluated and the one with the largest match
//! count becomes the provisional winner, seeded with a generic structural
//! fallback so a page with any structure at all yields candidates. The raw
//! winner is then narrowed by a semantic filter (minimum text length plus at
//! least one domain keyword); the filtered set is used only when non-empty.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Structural fallback when no site-tuned selector matches anything.
pub const GENERIC_CONTAINER_SELECTOR: &str = "li, tr, article, section";

/// Terms that make an element look like a subsidy listing.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "補助金", "助成金", "支援", "申請", "募集", "交付", "公募", "万円",
];

/// Elements with less text than this are navigation/decoration, not records.
const MIN_CONTAINER_TEXT_LEN: usize = 20;

pub struct LocatedContainers<'a> {
    pub elements: Vec<ElementRef<'a>>,
    /// Which selector produced the set, for run diagnostics.
    pub selector: String,
    /// Whether the semantic keyword filter was applied or bypassed.
    pub filtered: bool,
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn looks_like_listing(el: &ElementRef<'_>) -> bool {
    let text = element_text(el);
    text.chars().count() >= MIN_CONTAINER_TEXT_LEN
        && DOMAIN_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Pick the candidate element set for a page.
///
/// Returns an empty set when the page has no structure at all; the caller is
/// expected to call [`log_page_diagnostics`] in that case rather than fail.
pub fn locate_containers<'a>(doc: &'a Html, candidates: &[String]) -> LocatedContainers<'a> {
    // Seed with the generic fallback.
    let mut winner_selector = GENERIC_CONTAINER_SELECTOR.to_string();
    let mut winner: Vec<ElementRef<'a>> = match Selector::parse(GENERIC_CONTAINER_SELECTOR) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    };

    for candidate in candidates {
        let sel = match Selector::parse(candidate) {
            Ok(sel) => sel,
            Err(e) => {
                warn!("Skipping invalid container selector '{}': {:?}", candidate, e);
                continue;
            }
        };
        let matches: Vec<ElementRef<'a>> = doc.select(&sel).collect();
        if matches.len() > winner.len() {
            winner_selector = candidate.clone();
            winner = matches;
        }
    }

    if winner.is_empty() {
        return LocatedContainers {
            elements: winner,
            selector: winner_selector,
            filtered: false,
        };
    }

    let semantic: Vec<ElementRef<'a>> = winner
        .iter()
        .copied()
        .filter(looks_like_listing)
        .collect();

    if semantic.is_empty() {
        debug!(
            "Keyword filter emptied '{}' ({} raw matches), using unfiltered set",
            winner_selector,
            winner.len()
        );
        LocatedContainers {
            elements: winner,
            selector: winner_selector,
            filtered: false,
        }
    } else {
        LocatedContainers {
            elements: semantic,
            selector: winner_selector,
            filtered: true,
        }
    }
}

/// Log what the page actually contains, to aid future selector tuning.
/// Called when a target produced zero containers.
pub fn log_page_diagnostics(doc: &Html) {
    let Ok(all) = Selector::parse("*") else { return };

    let mut tag_counts: HashMap<String, usize> = HashMap::new();
    let mut class_counts: HashMap<String, usize> = HashMap::new();
    let mut samples: Vec<String> = Vec::new();

    for el in doc.select(&all) {
        *tag_counts.entry(el.value().name().to_string()).or_default() += 1;
        for class in el.value().classes() {
            *class_counts.entry(class.to_string()).or_default() += 1;
        }

        if samples.len() < 5 {
            let text = element_text(&el);
            if DOMAIN_KEYWORDS.iter().any(|kw| text.contains(kw))
                && text.chars().count() >= MIN_CONTAINER_TEXT_LEN
            {
                let snippet: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
                samples.push(format!(
                    "<{}> {}",
                    el.value().name(),
                    snippet.chars().take(80).collect::<String>()
                ));
            }
        }
    }

    let mut tags: Vec<_> = tag_counts.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1));
    tags.truncate(10);

    let mut classes: Vec<_> = class_counts.into_iter().collect();
    classes.sort_by(|a, b| b.1.cmp(&a.1));
    classes.truncate(10);

    debug!("No containers found. Top tags: {:?}", tags);
    debug!("Top classes: {:?}", classes);
    for s in &samples {
        debug!("Keyword-bearing element: {}", s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_PAGE: &str = r#"
        <html><body>
          <table><tbody>
            <tr><td>ものづくり補助金の公募を開始しました。中小企業向けの支援です。</td><td>2025年5月1日</td></tr>
            <tr><td>IT導入補助金の申請受付中。上限450万円まで交付します。</td><td>2025年6月30日</td></tr>
          </tbody></table>
        </body></html>"#;

    #[test]
    fn generic_fallback_with_keyword_rows() {
        let doc = Html::parse_document(TABLE_PAGE);
        // No site-specific candidate matches anything on this page.
        let candidates = vec!["div.subsidy-card".to_string(), "article.grant".to_string()];
        let located = locate_containers(&doc, &candidates);

        assert!(!located.elements.is_empty());
        assert!(located.filtered);
        assert_eq!(located.selector, GENERIC_CONTAINER_SELECTOR);
    }

    #[test]
    fn specific_candidate_beats_generic_seed() {
        let html = r#"
            <html><body>
              <div class="card">ものづくり補助金の募集。設備投資を支援、上限1000万円。</div>
              <div class="card">持続化補助金の申請受付中。販路開拓の支援、上限200万円。</div>
              <div class="card">省エネ補助金の公募。環境投資の支援、上限500万円。</div>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let candidates = vec!["div.card".to_string()];
        let located = locate_containers(&doc, &candidates);
        assert_eq!(located.elements.len(), 3);
        assert_eq!(located.selector, "div.card");
    }

    #[test]
    fn empty_page_yields_empty_set() {
        let doc = Html::parse_document("<html><body><p>準備中</p></body></html>");
        let located = locate_containers(&doc, &["div.item".to_string()]);
        assert!(located.elements.is_empty());
        log_page_diagnostics(&doc); // must not panic
    }

    #[test]
    fn keyword_filter_drops_noise_rows() {
        let html = r#"
            <html><body><table><tbody>
              <tr><td>ホーム</td></tr>
              <tr><td>小規模事業者持続化補助金の募集について、申請は商工会議所まで。</td></tr>
            </tbody></table></body></html>"#;
        let doc = Html::parse_document(html);
        let located = locate_containers(&doc, &[]);
        assert_eq!(located.elements.len(), 1);
        assert!(located.filtered);
    }
}
