//! Broad-pattern fallback extractor for documents with no recognized
//! section format. Lower precision than the format extractors; every
//! candidate goes through full prompt validation.

use std::collections::HashSet;

use crate::candidate::{is_valid_prompt, CandidateCase};
use crate::patterns::{extract_effects, extract_images, prompt_captures, FENCED_BLOCK};
use crate::text::{clean_title, normalize_prompt, normalize_text};

/// Keyword-driven effect inference for documents that never label their
/// outcomes.
const EFFECT_HINTS: &[(&str, &str)] = &[
    ("figurine", "Turns the photo into a detailed 3D figurine model"),
    ("手办", "Turns the photo into a detailed 3D figurine model"),
    ("3d", "3D model conversion"),
    ("character", "Character editing with identity preserved"),
    ("clothing", "Outfit replacement with identity preserved"),
    ("outfit", "Outfit replacement with identity preserved"),
    ("scene", "Places the subject into a new scene"),
    ("background", "Background replacement and scene compositing"),
    ("style", "Artistic style transfer"),
    ("enhance", "Image enhancement and quality boost"),
    ("realistic", "Photorealistic generation"),
    ("portrait", "Professional portrait photography look"),
    ("studio", "Studio photography look"),
    ("design", "Design-oriented imagery"),
    ("product", "Product design rendering"),
    ("packaging", "Packaging design rendering"),
];

fn infer_effects(text: &str, source_title: &str) -> Vec<String> {
    let haystack = format!("{source_title} {text}").to_lowercase();
    let mut effects: Vec<String> = Vec::new();
    for (keyword, effect) in EFFECT_HINTS {
        if haystack.contains(keyword) && !effects.iter().any(|e| e == effect) {
            effects.push((*effect).to_string());
        }
    }
    if effects.is_empty() {
        let fallback = if haystack.contains("prompt") {
            "Prompt-driven image generation"
        } else if haystack.contains("image") || haystack.contains("photo") {
            "Image transformation"
        } else {
            "Generated image showcase"
        };
        effects.push(fallback.to_string());
    }
    effects
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derive a short label from the leading prompt keywords, falling back to
/// the source item's own title.
fn derive_title(prompt: &str, source_title: &str) -> String {
    let keywords: Vec<String> = prompt
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .take(5)
        .map(title_case_word)
        .collect();
    if !keywords.is_empty() {
        return clean_title(&keywords.join(" "));
    }
    let cleaned = clean_title(source_title);
    if !cleaned.is_empty() {
        return cleaned;
    }
    "Untitled case".to_string()
}

/// Apply the full prompt rule table plus fenced-block heuristics over the
/// whole document. One candidate per surviving prompt; effects and images
/// are document-scoped here since there are no sections to scope to.
pub fn extract_generic(text: &str, source_title: &str) -> Vec<CandidateCase> {
    let text = normalize_text(text);
    let mut prompts: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut consider = |candidate: String| {
        if is_valid_prompt(&candidate) && seen.insert(normalize_prompt(&candidate)) {
            prompts.push(candidate);
        }
    };

    for (_rule, capture) in prompt_captures(&text) {
        consider(capture);
    }
    for caps in FENCED_BLOCK.captures_iter(&text) {
        if let Some(m) = caps.get(1) {
            consider(m.as_str().trim().to_string());
        }
    }

    if prompts.is_empty() {
        return Vec::new();
    }

    let mut effects = extract_effects(&text);
    if effects.is_empty() {
        effects = infer_effects(&text, source_title);
    }
    let images = extract_images(&text);

    prompts
        .into_iter()
        .map(|prompt| CandidateCase {
            title: derive_title(&prompt, source_title),
            prompts: vec![prompt],
            effects: effects.clone(),
            images: images.clone(),
        })
        .collect()
}
