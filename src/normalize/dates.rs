//! Date parsing for Japanese listing pages.
//!
//! Patterns are tried in a fixed priority order; the first pattern that
//! matches anywhere in the text wins. Month/day-only forms are assumed to
//! fall in the current calendar year. No timezone handling — these are
//! local calendar dates.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Calendar date in Japan Standard Time for a given instant. Listing sites
/// publish dates in JST, so month/day-only forms are anchored here rather
/// than in the host clock's UTC date.
pub fn jst_date(at: DateTime<Utc>) -> NaiveDate {
    (at + Duration::hours(9)).date_naive()
}

static YMD_KANJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})年\s*(\d{1,2})月\s*(\d{1,2})日").unwrap());
static YMD_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").unwrap());
static YMD_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());
static YMD_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\.(\d{1,2})\.(\d{1,2})").unwrap());
static MD_KANJI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})月\s*(\d{1,2})日").unwrap());
// Bracketed with non-digit, non-slash classes instead of \b: regex-crate word
// boundaries treat kana/kanji as word characters, and a bare \b would also let
// "06/30" match inside "2025/06/30".
static MD_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\d/])(\d{1,2})/(\d{1,2})(?:[^\d/]|$)").unwrap());

/// Full-date patterns carry their own year; month/day patterns borrow `today`'s.
fn patterns() -> [(&'static Lazy<Regex>, bool); 6] {
    [
        (&YMD_KANJI, true),
        (&YMD_SLASH, true),
        (&YMD_DASH, true),
        (&YMD_DOT, true),
        (&MD_KANJI, false),
        (&MD_SLASH, false),
    ]
}

fn caps_to_date(caps: &regex::Captures<'_>, has_year: bool, today: NaiveDate) -> Option<NaiveDate> {
    let mut idx = 1;
    let year = if has_year {
        let y = caps.get(idx)?.as_str().parse().ok()?;
        idx += 1;
        y
    } else {
        today.year()
    };
    let month: u32 = caps.get(idx)?.as_str().parse().ok()?;
    let day: u32 = caps.get(idx + 1)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Every valid date one pattern finds, in textual order. Each scan resumes
/// right after the day digits: the trailing guard class consumes the
/// following character, which would otherwise hide the second date in
/// ranges like "4/1〜6/30".
fn collect_dates(re: &Regex, text: &str, has_year: bool, today: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut at = 0;
    while let Some(caps) = re.captures_at(text, at) {
        let resume = match caps.get(caps.len() - 1) {
            Some(day) => day.end(),
            None => caps.get(0).map_or(text.len(), |m| m.end()),
        };
        if let Some(d) = caps_to_date(&caps, has_year, today) {
            dates.push(d);
        }
        if resume <= at {
            break;
        }
        at = resume;
    }
    dates
}

/// First date found in `text`, by pattern priority. None if nothing matches
/// or the match is not a valid calendar date.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for (re, has_year) in patterns() {
        if let Some(first) = collect_dates(re, text, has_year, today).into_iter().next() {
            return Some(first);
        }
    }
    None
}

/// Extract an application period from free text.
///
/// All occurrences of the winning pattern are collected in textual order:
/// two or more dates are read as a start/end range, a single date as the
/// deadline (end) only.
pub fn parse_period(text: &str, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
    for (re, has_year) in patterns() {
        let dates = collect_dates(re, text, has_year, today);

        match dates.as_slice() {
            [] => continue,
            [only] => return (None, Some(*only)),
            [first, .., last] => return (Some(*first), Some(*last)),
        }
    }
    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    #[test]
    fn parses_kanji_full_date() {
        assert_eq!(
            parse_date("締切：2025年6月30日まで", today()),
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
    }

    #[test]
    fn parses_slash_dash_dot_variants() {
        for s in ["2025/06/30", "2025-06-30", "2025.6.30"] {
            assert_eq!(parse_date(s, today()), NaiveDate::from_ymd_opt(2025, 6, 30), "{s}");
        }
    }

    #[test]
    fn month_day_assumes_current_year() {
        assert_eq!(
            parse_date("6月30日締切", today()),
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
        assert_eq!(parse_date("申込は 6/30 まで", today()), NaiveDate::from_ymd_opt(2025, 6, 30));
    }

    #[test]
    fn unparseable_text_is_none() {
        assert_eq!(parse_date("随時受付", today()), None);
        assert_eq!(parse_date("", today()), None);
    }

    #[test]
    fn invalid_calendar_date_is_skipped() {
        assert_eq!(parse_date("2025年13月40日", today()), None);
    }

    #[test]
    fn period_range_uses_first_and_last() {
        let (start, end) = parse_period("2025年4月1日〜2025年6月30日", today());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 6, 30));
    }

    #[test]
    fn slash_period_range_keeps_both_endpoints() {
        let (start, end) = parse_period("受付期間：4/1〜6/30", today());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 6, 30));
    }

    #[test]
    fn jst_date_can_lead_the_utc_date() {
        // 23:00 UTC on New Year's Eve is already January 1st in Japan.
        let at = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(jst_date(at), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let noon = NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(jst_date(noon), NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    }

    #[test]
    fn period_single_date_is_deadline_only() {
        let (start, end) = parse_period("2025年5月1日必着", today());
        assert_eq!(start, None);
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 5, 1));
    }
}
