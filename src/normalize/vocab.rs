//! Controlled-vocabulary classification.
//!
//! Categories, industries and target audiences are closed label sets. A label
//! applies when any of its keywords occurs in the lower-cased title+summary
//! text; all matching labels are collected. When nothing matches, a sentinel
//! default is substituted so the output set is never empty.

pub const DEFAULT_CATEGORY: &str = "その他";
pub const DEFAULT_INDUSTRY: &str = "全業種";
pub const DEFAULT_AUDIENCE: &str = "中小企業・小規模事業者";

/// Label → keyword list. Static data; order defines output order.
type KeywordTable = &'static [(&'static str, &'static [&'static str])];

pub const CATEGORY_KEYWORDS: KeywordTable = &[
    ("設備投資", &["設備", "機械", "装置", "導入"]),
    ("研究開発", &["研究", "開発", "技術", "イノベーション", "実証"]),
    ("創業・起業", &["創業", "起業", "スタートアップ", "開業"]),
    ("雇用・人材育成", &["雇用", "人材", "採用", "育成", "研修"]),
    ("IT・デジタル化", &["it", "デジタル", "dx", "システム", "ソフトウェア", "ec"]),
    ("販路開拓", &["販路", "海外", "輸出", "展示会", "マーケティング"]),
    ("環境・省エネ", &["環境", "省エネ", "脱炭素", "再生可能", "カーボン"]),
    ("事業承継", &["承継", "後継", "m&a"]),
    ("経営改善", &["経営", "改善", "再建", "資金繰り"]),
];

pub const INDUSTRY_KEYWORDS: KeywordTable = &[
    ("製造業", &["製造", "ものづくり", "工場", "加工"]),
    ("情報通信業", &["情報通信", "ソフトウェア", "itサービス", "アプリ"]),
    ("建設業", &["建設", "建築", "土木", "工事"]),
    ("小売業", &["小売", "店舗", "商店"]),
    ("飲食業", &["飲食", "レストラン", "食品", "カフェ"]),
    ("宿泊・観光業", &["観光", "宿泊", "ホテル", "旅館", "インバウンド"]),
    ("農林水産業", &["農業", "農林", "水産", "漁業", "畜産"]),
    ("運輸業", &["運輸", "物流", "運送", "倉庫"]),
    ("医療・福祉", &["医療", "福祉", "介護", "看護"]),
];

pub const AUDIENCE_KEYWORDS: KeywordTable = &[
    ("中小企業", &["中小企業"]),
    ("小規模事業者", &["小規模事業者", "小規模企業"]),
    ("個人事業主", &["個人事業主", "フリーランス"]),
    ("スタートアップ", &["スタートアップ", "創業", "起業", "ベンチャー"]),
    ("NPO・団体", &["npo", "非営利", "団体", "組合"]),
];

fn matching_labels(text_lower: &str, table: KeywordTable) -> Vec<String> {
    table
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| text_lower.contains(kw)))
        .map(|(label, _)| (*label).to_string())
        .collect()
}

fn classify(text: &str, table: KeywordTable, default: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let labels = matching_labels(&lower, table);
    if labels.is_empty() {
        vec![default.to_string()]
    } else {
        labels
    }
}

/// Multi-label category classification; never empty.
pub fn classify_categories(text: &str) -> Vec<String> {
    classify(text, CATEGORY_KEYWORDS, DEFAULT_CATEGORY)
}

/// Multi-label industry classification; never empty.
pub fn classify_industries(text: &str) -> Vec<String> {
    classify(text, INDUSTRY_KEYWORDS, DEFAULT_INDUSTRY)
}

/// Target audience as a single joined string; sentinel default when nothing
/// matches.
pub fn classify_audience(text: &str) -> String {
    let lower = text.to_lowercase();
    let labels = matching_labels(&lower, AUDIENCE_KEYWORDS);
    if labels.is_empty() {
        DEFAULT_AUDIENCE.to_string()
    } else {
        labels.join("・")
    }
}
