//! Built-in scrape targets.
//!
//! Selector chains are ordered most site-specific first; the locator and the
//! extractor both fall back to generic structural selectors on their own, so
//! a site redesign degrades to the heuristics instead of breaking the target.

use crate::models::{ScrapeTarget, SelectorSet};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

pub fn builtin_targets() -> Vec<ScrapeTarget> {
    vec![
        ScrapeTarget {
            id: "jnet21".to_string(),
            name: "J-Net21 支援情報ヘッドライン".to_string(),
            url: "https://j-net21.smrj.go.jp/snavi/articles".to_string(),
            organization: "中小企業基盤整備機構".to_string(),
            selectors: SelectorSet {
                container: strings(&[
                    "ul.resultList li",
                    "div.article-list article",
                    "table.support-list tr",
                ]),
                title: strings(&["a.articleTitle", "h3 a", "dt a"]),
                summary: strings(&["p.articleText", "dd.summary"]),
                deadline: strings(&["span.period", "dd.period"]),
                organization: strings(&["span.organization", "dd.organization"]),
                amount: strings(&["dd.amount"]),
                category: strings(&["span.tag", "ul.tagList li"]),
            },
        },
        ScrapeTarget {
            id: "tokyo-kosha".to_string(),
            name: "東京都中小企業振興公社 助成金一覧".to_string(),
            url: "https://www.tokyo-kosha.or.jp/support/josei/index.html".to_string(),
            organization: "東京都中小企業振興公社".to_string(),
            selectors: SelectorSet {
                container: strings(&[
                    "table.joseiList tr",
                    "div.support-item",
                    "ul.entryList li",
                ]),
                title: strings(&["td.title a", "h4 a"]),
                summary: strings(&["td.outline", "p.outline"]),
                deadline: strings(&["td.boshu", "span.period"]),
                organization: strings(&[]),
                amount: strings(&["td.gendo"]),
                category: strings(&["td.bunya"]),
            },
        },
        ScrapeTarget {
            id: "mirasapo".to_string(),
            name: "ミラサポplus 制度ナビ".to_string(),
            url: "https://mirasapo-plus.go.jp/subsidy/".to_string(),
            organization: "中小企業庁".to_string(),
            selectors: SelectorSet {
                container: strings(&[
                    "div.subsidy-card",
                    "li.p-support-list__item",
                    "article.support",
                ]),
                title: strings(&["h3.subsidy-card__title", "a.support-link"]),
                summary: strings(&["p.subsidy-card__text", "div.support-summary"]),
                deadline: strings(&["dd.deadline", "span.subsidy-card__period"]),
                organization: strings(&["dd.agency", "span.subsidy-card__org"]),
                amount: strings(&["dd.subsidy-card__amount"]),
                category: strings(&["ul.subsidy-card__tags li"]),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_targets_are_well_formed() {
        let targets = builtin_targets();
        assert!(!targets.is_empty());
        for t in &targets {
            assert!(!t.id.is_empty());
            assert!(t.url.starts_with("https://"), "{}", t.id);
            assert!(!t.organization.is_empty(), "{}", t.id);
            assert!(!t.selectors.container.is_empty(), "{}", t.id);
        }
    }

    #[test]
    fn target_ids_are_unique() {
        let targets = builtin_targets();
        let mut ids: Vec<_> = targets.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), targets.len());
    }
}
