//! Subsidy-rate and amount extraction from free text.
//!
//! Every extractor here is a priority ladder of regex patterns over the
//! combined text (summary + amount cell + title); the first pattern that
//! matches anywhere wins. Labeled matches (補助率 / 上限 / 最大) outrank
//! bare ones. Absence of a match is an empty string, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Subsidy rate ──────────────────────────────────────────────────────────────

static RATE_LABELED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"補助率\s*[:：]?\s*(\d+\s*分の\s*\d+|\d+\s*/\s*\d+|\d+(?:\.\d+)?\s*[%％])")
        .unwrap()
});
static RATE_BUNNO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*分の\s*(\d+)").unwrap());
// No lookaround in the regex crate; bracket the fraction with non-digit,
// non-slash classes so date fragments like "2025/06/30" are not picked up.
static RATE_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\d/])(\d{1,2})\s*/\s*(\d{1,2})(?:[^\d/]|$)").unwrap());
static RATE_PCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*[%％]").unwrap());

/// Normalize a raw rate expression: "3分の2" → "2/3", "２分の１" stays raw
/// (only ASCII digits are matched upstream), "50％" → "50%".
fn normalize_rate(raw: &str) -> String {
    if let Some(caps) = RATE_BUNNO.captures(raw) {
        // "X分のY" reads "Y out of X"
        return format!("{}/{}", &caps[2], &caps[1]);
    }
    raw.replace(char::is_whitespace, "").replace('％', "%")
}

/// Extract a subsidy rate ("2/3", "50%") from free text, preferring a
/// 補助率-labeled expression.
pub fn extract_subsidy_rate(text: &str) -> String {
    if let Some(caps) = RATE_LABELED.captures(text) {
        return normalize_rate(&caps[1]);
    }
    if let Some(caps) = RATE_BUNNO.captures(text) {
        return format!("{}/{}", &caps[2], &caps[1]);
    }
    if let Some(caps) = RATE_SLASH.captures(text) {
        return format!("{}/{}", &caps[1], &caps[2]);
    }
    if let Some(caps) = RATE_PCT.captures(text) {
        return format!("{}%", &caps[1]);
    }
    String::new()
}

// ── Amounts ───────────────────────────────────────────────────────────────────

static MAX_LABELED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:上限|最大|最高)(?:額|金額)?\s*[:：]?\s*([\d,，]+(?:\.\d+)?)\s*(万円|億円)")
        .unwrap()
});
static AMOUNT_OKU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d,，]+(?:\.\d+)?)\s*億円").unwrap());
static AMOUNT_MAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d,，]+(?:\.\d+)?)\s*万円").unwrap());
static MIN_LABELED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"下限(?:額|金額)?\s*[:：]?\s*([\d,，]+(?:\.\d+)?)\s*(万円|億円)").unwrap()
});

fn scrub_number(s: &str) -> String {
    s.replace([',', '，'], "")
}

/// Extract the maximum (ceiling) amount, e.g. "450万円" or "1億円".
/// Labeled ceilings win over bare amounts; 億円 outranks 万円 among bare ones.
pub fn extract_max_amount(text: &str) -> String {
    if let Some(caps) = MAX_LABELED.captures(text) {
        return format!("{}{}", scrub_number(&caps[1]), &caps[2]);
    }
    if let Some(caps) = AMOUNT_OKU.captures(text) {
        return format!("{}億円", scrub_number(&caps[1]));
    }
    if let Some(caps) = AMOUNT_MAN.captures(text) {
        return format!("{}万円", scrub_number(&caps[1]));
    }
    String::new()
}

/// Extract a floor amount. Only an explicit 下限-labeled figure counts;
/// guessing a floor from bare numbers produces junk more often than data.
pub fn extract_min_amount(text: &str) -> String {
    if let Some(caps) = MIN_LABELED.captures(text) {
        return format!("{}{}", scrub_number(&caps[1]), &caps[2]);
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_rate_wins() {
        let text = "補助対象経費の1/2以内。補助率：2/3、上限額：450万円";
        assert_eq!(extract_subsidy_rate(text), "2/3");
    }

    #[test]
    fn bunno_form_is_flipped() {
        assert_eq!(extract_subsidy_rate("経費の3分の2を補助"), "2/3");
        assert_eq!(extract_subsidy_rate("補助率：3分の2"), "2/3");
    }

    #[test]
    fn percent_rate() {
        assert_eq!(extract_subsidy_rate("補助率 50％"), "50%");
        assert_eq!(extract_subsidy_rate("最大75%を支援"), "75%");
    }

    #[test]
    fn no_rate_is_empty() {
        assert_eq!(extract_subsidy_rate("定額補助"), "");
    }

    #[test]
    fn labeled_ceiling_wins() {
        let text = "総事業費1,000万円まで、上限額：450万円";
        assert_eq!(extract_max_amount(text), "450万円");
    }

    #[test]
    fn bare_amounts_prefer_oku() {
        assert_eq!(extract_max_amount("最大支援 補助 1億円、別枠500万円"), "1億円");
        assert_eq!(extract_max_amount("100万円を交付"), "100万円");
    }

    #[test]
    fn comma_separators_are_scrubbed() {
        assert_eq!(extract_max_amount("上限 1,000万円"), "1000万円");
    }

    #[test]
    fn min_amount_requires_label() {
        assert_eq!(extract_min_amount("下限額：50万円"), "50万円");
        assert_eq!(extract_min_amount("50万円から"), "");
    }
}
