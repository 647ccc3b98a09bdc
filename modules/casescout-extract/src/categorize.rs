use casescout_common::CaseCategory;

/// Ordered keyword taxonomy. Order is significant: narrow rules sit above
/// broad ones, and the first rule with any keyword hit wins.
const CATEGORY_RULES: &[(CaseCategory, &[&str])] = &[
    (CaseCategory::Figurine, &["figurine", "手办", "3d"]),
    (CaseCategory::Clothing, &["clothing", "outfit", "服装", "衣服"]),
    (CaseCategory::Scene, &["scene", "场景", "background", "背景"]),
    (CaseCategory::Style, &["style", "风格", "artistic"]),
    (CaseCategory::Character, &["character", "角色", "person"]),
    (CaseCategory::Composition, &["composition", "合成", "combine"]),
    (CaseCategory::Enhancement, &["enhance", "enhancement", "增强", "upscale"]),
    (
        CaseCategory::Design,
        &["design", "设计", "packaging", "包装", "logo"],
    ),
    (
        CaseCategory::Education,
        &["education", "教育", "teaching", "教学", "annotat", "标注", "批注"],
    ),
    (
        CaseCategory::Business,
        &["business", "商业", "advertis", "广告", "marketing", "营销", "infographic"],
    ),
    (
        CaseCategory::Technical,
        &["technical", "技术", "parameter", "参数", "hardware", "camera", "iso"],
    ),
    (
        CaseCategory::Artistic,
        &["painting", "绘画", "illustration", "插画", "drawing", "comic", "漫画"],
    ),
];

/// Map a case's text to one category label. Pure, deterministic, total:
/// always returns a label, defaulting to `Other`.
pub fn categorize(title: &str, description: &str, prompts: &[String]) -> CaseCategory {
    let text = format!("{title} {description} {}", prompts.join(" ")).to_lowercase();
    for (category, keywords) in CATEGORY_RULES {
        if keywords.iter().any(|k| text.contains(k)) {
            return *category;
        }
    }
    CaseCategory::Other
}
