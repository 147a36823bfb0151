//! Raw listing → typed [`SubsidyRecord`] assembly.
//!
//! Only an implausibly short title rejects a listing; every other field
//! degrades to an empty string, sentinel label, or `None`.

pub mod amounts;
pub mod dates;
pub mod prefecture;
pub mod vocab;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ScrapeError;
use crate::models::{RawListing, ScrapeTarget, SubsidyRecord, MIN_NAME_LEN};

/// Build a record from extracted raw text. An implausibly short title is an
/// extraction warning (noise/navigation rows); the caller collects successes
/// and logs failures.
pub fn normalize_listing(
    raw: &RawListing,
    target: &ScrapeTarget,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<SubsidyRecord, ScrapeError> {
    let name = raw.title.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ScrapeError::extraction(format!(
            "title too short to be a listing: {name:?}"
        )));
    }

    let organization = {
        let org = raw.organization.trim();
        if org.is_empty() {
            target.organization.clone()
        } else {
            org.to_string()
        }
    };

    // Amount heuristics scan everything we have; deadline parsing prefers the
    // dedicated deadline cell and falls back to the summary.
    let money_text = format!("{} {} {}", raw.summary, raw.amount_text, raw.title);
    let class_text = format!("{} {} {}", raw.title, raw.summary, raw.category_text);

    let (start, end) = {
        let parsed = dates::parse_period(&raw.deadline_text, today);
        if parsed.1.is_some() {
            parsed
        } else {
            dates::parse_period(&raw.summary, today)
        }
    };

    let prefecture_text = format!("{} {} {}", raw.title, raw.summary, organization);

    Ok(SubsidyRecord {
        name: name.to_string(),
        organization,
        summary: raw.summary.clone(),
        target_audience: vocab::classify_audience(&class_text),
        subsidy_rate: amounts::extract_subsidy_rate(&money_text),
        max_amount: amounts::extract_max_amount(&money_text),
        min_amount: amounts::extract_min_amount(&money_text),
        application_period_start: start,
        application_period_end: end,
        categories: vocab::classify_categories(&class_text),
        industries: vocab::classify_industries(&class_text),
        prefecture: prefecture::infer_prefecture(&prefecture_text),
        official_page_url: raw
            .detail_url
            .clone()
            .unwrap_or_else(|| target.url.clone()),
        status: "active".to_string(),
        scraped_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectorSet;

    fn target() -> ScrapeTarget {
        ScrapeTarget {
            id: "test".into(),
            name: "テスト補助金ポータル".into(),
            url: "https://example.jp/subsidies".into(),
            organization: "中小企業庁".into(),
            selectors: SelectorSet::default(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn now() -> NaiveDateTime {
        today().and_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn short_title_is_rejected() {
        let raw = RawListing {
            title: "一覧".into(),
            ..RawListing::default()
        };
        assert!(normalize_listing(&raw, &target(), today(), now()).is_err());
    }

    #[test]
    fn full_record_is_assembled() {
        let raw = RawListing {
            title: "ものづくり補助金（設備投資支援）".into(),
            summary: "中小企業の設備導入を支援。補助率：2/3、上限額：450万円".into(),
            deadline_text: "2025年6月30日".into(),
            detail_url: Some("https://example.jp/subsidies/monozukuri".into()),
            ..RawListing::default()
        };

        let rec = normalize_listing(&raw, &target(), today(), now()).unwrap();
        assert_eq!(rec.subsidy_rate, "2/3");
        assert_eq!(rec.max_amount, "450万円");
        assert_eq!(rec.application_period_end, NaiveDate::from_ymd_opt(2025, 6, 30));
        assert_eq!(rec.organization, "中小企業庁");
        assert_eq!(rec.status, "active");
        assert!(rec.categories.contains(&"設備投資".to_string()));
        assert_eq!(rec.official_page_url, "https://example.jp/subsidies/monozukuri");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let raw = RawListing {
            title: "とある支援制度のお知らせ".into(),
            ..RawListing::default()
        };

        let rec = normalize_listing(&raw, &target(), today(), now()).unwrap();
        assert_eq!(rec.subsidy_rate, "");
        assert_eq!(rec.max_amount, "");
        assert_eq!(rec.application_period_end, None);
        assert!(!rec.categories.is_empty());
        assert!(!rec.industries.is_empty());
        assert_eq!(rec.official_page_url, target().url);
        assert_eq!(rec.prefecture, None);
    }
}
