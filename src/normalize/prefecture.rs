//! Prefecture inference.
//!
//! First of the 47 prefecture names found in the combined text wins; no
//! match means the subsidy is treated as nationwide (`None`).

/// All 47 prefectures, official names. 東京都 is listed before 京都府 so a
/// tie on overlapping kanji resolves to the more common case.
pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県", "岐阜県",
    "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府", "兵庫県",
    "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県",
    "熊本県", "大分県", "宮崎県", "鹿児島県", "沖縄県",
];

/// Scan text (typically title + summary + organization) for a prefecture
/// name. `None` = nationwide.
pub fn infer_prefecture(text: &str) -> Option<String> {
    PREFECTURES
        .iter()
        .find(|p| text.contains(*p))
        .map(|p| (*p).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_prefecture_in_organization() {
        assert_eq!(
            infer_prefecture("ものづくり支援 大阪府商工労働部"),
            Some("大阪府".to_string())
        );
    }

    #[test]
    fn tokyo_not_confused_with_kyoto() {
        assert_eq!(infer_prefecture("東京都産業労働局"), Some("東京都".to_string()));
    }

    #[test]
    fn no_match_means_nationwide() {
        assert_eq!(infer_prefecture("中小企業庁 全国対象の補助金"), None);
    }
}
