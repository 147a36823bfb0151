//! Field extraction from one container element.
//!
//! Every field runs an ordered selector chain, site-tuned selectors first,
//! generic structural fallbacks last. Strict first-match: the first selector
//! producing non-empty, plausible text wins the field. Table rows get
//! special-cased cell handling. Nothing here fails hard — a field that can't
//! be extracted stays empty and the normalizer decides what survives.

use scraper::{ElementRef, Selector};
use tracing::warn;
use url::Url;

use crate::models::{RawListing, SelectorSet, MAX_SUMMARY_LEN, MIN_NAME_LEN};

const TITLE_FALLBACKS: &[&str] = &["a", "h1, h2, h3, h4", ".title", "th", "strong"];
const SUMMARY_FALLBACKS: &[&str] = &[".summary", ".description", ".content", "p"];
const DEADLINE_FALLBACKS: &[&str] = &[".deadline", ".period", ".date", "time"];
const ORGANIZATION_FALLBACKS: &[&str] = &[".organization", ".org", ".agency"];
const AMOUNT_FALLBACKS: &[&str] = &[".amount", ".max-amount", ".price"];
const CATEGORY_FALLBACKS: &[&str] = &[".category", ".tag", ".label"];

/// Separator used when assembling the summary from multiple fragments.
const FRAGMENT_SEPARATOR: &str = " / ";

fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Site-tuned chain first, then the generic fallbacks.
fn chain<'a>(site: &'a [String], fallbacks: &'a [&'a str]) -> impl Iterator<Item = &'a str> {
    site.iter()
        .map(String::as_str)
        .chain(fallbacks.iter().copied())
}

fn parse_selector(expr: &str) -> Option<Selector> {
    match Selector::parse(expr) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!("Skipping invalid field selector '{}': {:?}", expr, e);
            None
        }
    }
}

/// First selector in the chain whose first match has at least `min_len`
/// characters of text.
fn first_text<'a>(el: &ElementRef<'_>, selectors: impl Iterator<Item = &'a str>, min_len: usize) -> String {
    for expr in selectors {
        let Some(sel) = parse_selector(expr) else { continue };
        for found in el.select(&sel) {
            let text = clean_text(&found.text().collect::<String>());
            if text.chars().count() >= min_len {
                return text;
            }
        }
    }
    String::new()
}

/// Concatenate every match of the first productive selector, deduplicating
/// identical fragments, capped at `MAX_SUMMARY_LEN`.
fn collect_fragments<'a>(el: &ElementRef<'_>, selectors: impl Iterator<Item = &'a str>) -> String {
    for expr in selectors {
        let Some(sel) = parse_selector(expr) else { continue };

        let mut fragments: Vec<String> = Vec::new();
        for found in el.select(&sel) {
            let text = clean_text(&found.text().collect::<String>());
            if !text.is_empty() && !fragments.contains(&text) {
                fragments.push(text);
            }
        }

        if !fragments.is_empty() {
            return truncate_chars(&fragments.join(FRAGMENT_SEPARATOR), MAX_SUMMARY_LEN);
        }
    }
    String::new()
}

/// Last-resort title: first line of the element's own text that is long
/// enough to be a real name.
fn title_from_lines(el: &ElementRef<'_>) -> String {
    let text = el.text().collect::<String>();
    text.lines()
        .map(clean_text)
        .find(|line| line.chars().count() >= MIN_NAME_LEN)
        .unwrap_or_default()
}

/// First embedded anchor's href, resolved absolute against the target page.
fn detail_link(el: &ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let sel = parse_selector("a[href]")?;
    let href = el.select(&sel).next()?.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Some(href.to_string()),
    }
}

/// Cell texts of a `<tr>` element, in document order.
fn row_cells(el: &ElementRef<'_>) -> Vec<String> {
    let Some(sel) = parse_selector("td, th") else {
        return Vec::new();
    };
    el.select(&sel)
        .map(|cell| clean_text(&cell.text().collect::<String>()))
        .collect()
}

/// Pull every raw field out of one container element.
pub fn extract_listing(
    el: &ElementRef<'_>,
    selectors: &SelectorSet,
    base: Option<&Url>,
) -> RawListing {
    let mut listing = RawListing {
        detail_url: detail_link(el, base),
        ..RawListing::default()
    };

    listing.title = first_text(el, chain(&selectors.title, TITLE_FALLBACKS), MIN_NAME_LEN);
    if listing.title.is_empty() {
        listing.title = title_from_lines(el);
    }

    listing.summary = collect_fragments(el, chain(&selectors.summary, SUMMARY_FALLBACKS));
    listing.deadline_text = first_text(el, chain(&selectors.deadline, DEADLINE_FALLBACKS), 1);
    listing.organization =
        first_text(el, chain(&selectors.organization, ORGANIZATION_FALLBACKS), 1);
    listing.amount_text = first_text(el, chain(&selectors.amount, AMOUNT_FALLBACKS), 1);
    listing.category_text = collect_fragments(el, chain(&selectors.category, CATEGORY_FALLBACKS));

    // Table rows: the non-title cells are the best summary we will get, and
    // the rightmost cell is usually the deadline column.
    if el.value().name() == "tr" {
        let cells = row_cells(el);
        if !cells.is_empty() {
            if listing.title.is_empty() {
                if let Some(first_long) =
                    cells.iter().find(|c| c.chars().count() >= MIN_NAME_LEN)
                {
                    listing.title = first_long.clone();
                }
            }

            // Resolved after the title fallback so a title taken from a later
            // cell excludes that cell from the summary, not cell 0.
            let title_cell = if listing.title.is_empty() {
                None
            } else {
                cells
                    .iter()
                    .position(|c| *c == listing.title || c.contains(listing.title.as_str()))
            };

            if listing.summary.is_empty() {
                let mut fragments: Vec<String> = Vec::new();
                for (i, cell) in cells.iter().enumerate() {
                    if title_cell != Some(i) && !cell.is_empty() && !fragments.contains(cell) {
                        fragments.push(cell.clone());
                    }
                }
                listing.summary =
                    truncate_chars(&fragments.join(FRAGMENT_SEPARATOR), MAX_SUMMARY_LEN);
            }

            if listing.deadline_text.is_empty() && cells.len() > 1 {
                if let Some(last) = cells.last() {
                    listing.deadline_text = last.clone();
                }
            }
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_container<'a>(doc: &'a Html, expr: &str) -> ElementRef<'a> {
        let sel = Selector::parse(expr).unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn structured_card_extraction() {
        let html = r#"
            <div class="item">
              <h3>小規模事業者持続化補助金</h3>
              <p class="description">販路開拓の取組を支援します。</p>
              <p class="description">補助率：2/3、上限額：50万円。</p>
              <span class="deadline">2025年6月30日</span>
              <a href="/subsidy/jizokuka">詳細</a>
            </div>"#;
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "div.item");
        let base = Url::parse("https://example.jp/list").unwrap();

        let raw = extract_listing(&el, &SelectorSet::default(), Some(&base));
        assert_eq!(raw.title, "小規模事業者持続化補助金");
        assert!(raw.summary.contains("販路開拓"));
        assert!(raw.summary.contains(" / "));
        assert_eq!(raw.deadline_text, "2025年6月30日");
        assert_eq!(raw.detail_url.as_deref(), Some("https://example.jp/subsidy/jizokuka"));
    }

    #[test]
    fn duplicate_fragments_are_deduped() {
        let html = r#"
            <div class="item">
              <h3>事業再構築補助金のご案内</h3>
              <p>新分野展開を支援します。</p>
              <p>新分野展開を支援します。</p>
            </div>"#;
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "div.item");

        let raw = extract_listing(&el, &SelectorSet::default(), None);
        assert_eq!(raw.summary, "新分野展開を支援します。");
    }

    #[test]
    fn table_row_cells_become_summary_and_deadline() {
        let html = r#"
            <table><tbody><tr>
              <td>ものづくり補助金（第20次公募）</td>
              <td>革新的な設備投資を支援。上限1000万円。</td>
              <td>2025年5月1日</td>
            </tr></tbody></table>"#;
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "tr");

        let raw = extract_listing(&el, &SelectorSet::default(), None);
        assert_eq!(raw.title, "ものづくり補助金（第20次公募）");
        assert!(raw.summary.contains("設備投資"));
        assert!(!raw.summary.contains("ものづくり補助金"));
        assert_eq!(raw.deadline_text, "2025年5月1日");
    }

    #[test]
    fn title_filled_from_later_cell_is_excluded_from_summary() {
        // Every text line is too short for the line fallback, so the title
        // comes from the row-cell fallback, and from the second cell.
        let html = "<table><tbody><tr>\n<td>★</td>\n<td>先端\n設備\n導入\n補助金</td>\n<td>上限\n100\n万円</td>\n</tr></tbody></table>";
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "tr");

        let raw = extract_listing(&el, &SelectorSet::default(), None);
        assert_eq!(raw.title, "先端 設備 導入 補助金");
        assert!(!raw.summary.contains("設備"), "{:?}", raw.summary);
        assert!(raw.summary.contains("★"));
        assert_eq!(raw.deadline_text, "上限 100 万円");
    }

    #[test]
    fn title_falls_back_to_first_long_line() {
        let html = r#"<section>
        IT導入補助金2025のお知らせです
        詳細は事務局まで
        </section>"#;
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "section");

        let raw = extract_listing(&el, &SelectorSet::default(), None);
        assert_eq!(raw.title, "IT導入補助金2025のお知らせです");
    }

    #[test]
    fn site_selector_outranks_generic() {
        let html = r#"
            <div class="item">
              <a href="/x">こちらをクリックして詳細へ</a>
              <span class="grant-name">省エネルギー投資促進支援事業</span>
            </div>"#;
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "div.item");
        let selectors = SelectorSet {
            title: vec!["span.grant-name".to_string()],
            ..SelectorSet::default()
        };

        let raw = extract_listing(&el, &selectors, None);
        assert_eq!(raw.title, "省エネルギー投資促進支援事業");
    }

    #[test]
    fn anchor_fragments_are_ignored() {
        let html = r##"<div class="item"><a href="#top">トップへ戻る場合はこちら</a></div>"##;
        let doc = Html::parse_document(html);
        let el = first_container(&doc, "div.item");

        let raw = extract_listing(&el, &SelectorSet::default(), None);
        assert_eq!(raw.detail_url, None);
    }
}
