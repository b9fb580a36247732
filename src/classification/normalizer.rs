//! Result normalization for classifier answers
//!
//! Turns whatever the provider said into a fully populated `Classification` using
//! keyword heuristics, one axis at a time. The two axes use disjoint vocabularies,
//! so editing the words of one axis can never move the other. Zero or conflicting
//! evidence on an axis resolves to `Unknown`; this module never returns an error.
//!
//! The provider is asked for a JSON object. When one can be found in the text, an
//! axis field present in it is scanned on its own; otherwise the whole text is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::types::{
    Biodegradability, Classification, ClassifierOutput, Confidence, Moisture, WasteCategory,
};

/// Keywords that indicate biodegradable waste
pub const BIODEGRADABLE_KEYWORDS: &[&str] = &[
    "biodegradable",
    "compostable",
    "organic",
    "decomposable",
];

/// Prefixes that negate a biodegradable keyword ("non-organic", "non compostable",
/// "not decomposable", "inorganic"). Negated forms count for the non-biodegradable
/// side and are removed before the positive scan.
const BIODEGRADABLE_NEGATIONS: &[&str] = &[r"non[- ]?", r"not\s+", r"in"];

/// Keywords that indicate wet waste
pub const WET_KEYWORDS: &[&str] = &["wet", "moist", "damp", "soggy", "soaked"];

/// Keywords that indicate dry waste
pub const DRY_KEYWORDS: &[&str] = &["dry", "dried"];

/// "not wet" says nothing about dryness, so negated moisture words are dropped.
const MOISTURE_NEGATIONS: &[&str] = &[r"not\s+(?:very\s+|too\s+)?"];

const CATEGORY_KEYWORDS: &[(WasteCategory, &[&str])] = &[
    (
        WasteCategory::Organic,
        &["organic", "food", "compost", "peel", "plant", "fruit", "vegetable"],
    ),
    (
        WasteCategory::Recyclable,
        &[
            "recyclable",
            "plastic",
            "glass",
            "metal",
            "aluminium",
            "aluminum",
            "cardboard",
            "paper",
        ],
    ),
    (
        WasteCategory::Hazardous,
        &["hazardous", "battery", "batteries", "chemical", "toxic", "paint"],
    ),
    (
        WasteCategory::EWaste,
        &["e-waste", "electronic", "electronics", "circuit", "charger"],
    ),
    (
        WasteCategory::General,
        &["general", "non-recyclable", "landfill", "residual"],
    ),
];

const BIODEGRADABLE_FIELDS: &[&str] = &["biodegradable", "is_biodegradable", "biodegradability"];
const MOISTURE_FIELDS: &[&str] = &["moisture", "moisture_status", "moisture_content"];
const CATEGORY_FIELDS: &[&str] = &["primary_category", "category", "material_type"];

const MAX_LABEL_CHARS: usize = 80;

static BIODEGRADABLE_RE: Lazy<Regex> = Lazy::new(|| keyword_regex(BIODEGRADABLE_KEYWORDS));
static NON_BIODEGRADABLE_RE: Lazy<Regex> =
    Lazy::new(|| negated_regex(BIODEGRADABLE_NEGATIONS, BIODEGRADABLE_KEYWORDS));
static NEGATED_MOISTURE_RE: Lazy<Regex> = Lazy::new(|| {
    negated_regex(MOISTURE_NEGATIONS, &[WET_KEYWORDS, DRY_KEYWORDS].concat())
});
static WET_RE: Lazy<Regex> = Lazy::new(|| keyword_regex(WET_KEYWORDS));
static DRY_RE: Lazy<Regex> = Lazy::new(|| keyword_regex(DRY_KEYWORDS));
static CATEGORY_RES: Lazy<Vec<(WasteCategory, Regex)>> = Lazy::new(|| {
    CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| (*category, keyword_regex(keywords)))
        .collect()
});
static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(high|medium|low)\s+confidence|confidence(?:\s+level)?\s*[:=]?\s*(high|medium|low|\d{1,3}(?:\.\d+)?)\s*%?)")
        .unwrap()
});

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
}

/// Any of `prefixes` (regex fragments) directly followed by any of `keywords`.
fn negated_regex(prefixes: &[&str], keywords: &[&str]) -> Regex {
    let keywords = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let prefixes = prefixes.join("|");
    Regex::new(&format!(r"(?i)\b(?:{prefixes})(?:{keywords})\b")).unwrap()
}

/// Normalize a raw classifier answer.
///
/// # Examples
/// ```ignore
/// let c = normalize(&ClassifierOutput::new("banana peel, biodegradable and wet", "m"));
/// assert_eq!(c.axes(), (Biodegradability::Yes, Moisture::Wet));
/// ```
pub fn normalize(output: &ClassifierOutput) -> Classification {
    let text = output.text.trim();
    if text.is_empty() {
        return Classification::unknown();
    }

    let fields = extract_json_object(text);
    let fields = fields.as_ref();

    let biodegradable = fields
        .and_then(biodegradability_from_fields)
        .unwrap_or_else(|| resolve_biodegradability(text));
    let moisture = fields
        .and_then(moisture_from_fields)
        .unwrap_or_else(|| resolve_moisture(text));
    let category = fields
        .and_then(|f| first_string(f, CATEGORY_FIELDS))
        .map(|value| resolve_category(&value))
        .unwrap_or_else(|| resolve_category(text));
    let confidence = fields
        .and_then(|f| f.get("confidence"))
        .map(confidence_from_value)
        .unwrap_or_else(|| resolve_confidence(text));

    let item_name = fields.and_then(|f| first_string(f, &["item_name", "item"]));
    let model_advice = fields.and_then(|f| first_string(f, &["disposal_advice", "advice"]));
    let raw_label = item_name
        .clone()
        .or_else(|| fields.and_then(|f| first_string(f, &["secondary_category"])))
        .or_else(|| first_prose_line(text))
        .map(|label| truncate_chars(&label, MAX_LABEL_CHARS))
        .unwrap_or_default();

    Classification {
        biodegradable,
        moisture,
        raw_label,
        category,
        confidence,
        item_name,
        model_advice,
    }
}

/// Resolve the biodegradability axis from free text.
pub fn resolve_biodegradability(text: &str) -> Biodegradability {
    let negative = NON_BIODEGRADABLE_RE.is_match(text);
    let remainder = NON_BIODEGRADABLE_RE.replace_all(text, " ");
    let positive = BIODEGRADABLE_RE.is_match(&remainder);
    match (positive, negative) {
        (true, false) => Biodegradability::Yes,
        (false, true) => Biodegradability::No,
        _ => Biodegradability::Unknown,
    }
}

/// Resolve the moisture axis from free text.
pub fn resolve_moisture(text: &str) -> Moisture {
    let text = NEGATED_MOISTURE_RE.replace_all(text, " ");
    match (WET_RE.is_match(&text), DRY_RE.is_match(&text)) {
        (true, false) => Moisture::Wet,
        (false, true) => Moisture::Dry,
        _ => Moisture::Unknown,
    }
}

/// Highest keyword score wins; ties and a zero score give `Unknown`.
pub fn resolve_category(text: &str) -> WasteCategory {
    let mut best = WasteCategory::Unknown;
    let mut best_score = 0;
    let mut tied = false;

    for (category, re) in CATEGORY_RES.iter() {
        let score = re.find_iter(text).count();
        if score > best_score {
            best_score = score;
            best = *category;
            tied = false;
        } else if score > 0 && score == best_score {
            tied = true;
        }
    }

    if best_score == 0 || tied {
        WasteCategory::Unknown
    } else {
        best
    }
}

fn resolve_confidence(text: &str) -> Confidence {
    CONFIDENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| confidence_from_str(m.as_str()))
        .unwrap_or(Confidence::Unknown)
}

fn confidence_from_value(value: &Value) -> Confidence {
    match value {
        Value::Number(n) => n.as_f64().map_or(Confidence::Unknown, Confidence::from_score),
        Value::String(s) => confidence_from_str(s),
        _ => Confidence::Unknown,
    }
}

fn confidence_from_str(raw: &str) -> Confidence {
    let lowered = raw.trim().trim_end_matches('%').to_lowercase();
    if let Ok(score) = lowered.parse::<f64>() {
        return Confidence::from_score(score);
    }
    if lowered.contains("high") {
        Confidence::High
    } else if lowered.contains("medium") {
        Confidence::Medium
    } else if lowered.contains("low") {
        Confidence::Low
    } else {
        Confidence::Unknown
    }
}

fn biodegradability_from_fields(fields: &Map<String, Value>) -> Option<Biodegradability> {
    let value = BIODEGRADABLE_FIELDS.iter().find_map(|k| fields.get(*k))?;
    Some(match value {
        Value::Bool(true) => Biodegradability::Yes,
        Value::Bool(false) => Biodegradability::No,
        Value::String(s) => match affirmation(s) {
            Some(true) => Biodegradability::Yes,
            Some(false) => Biodegradability::No,
            None => resolve_biodegradability(s),
        },
        _ => Biodegradability::Unknown,
    })
}

fn moisture_from_fields(fields: &Map<String, Value>) -> Option<Moisture> {
    if let Some(value) = MOISTURE_FIELDS.iter().find_map(|k| fields.get(*k)) {
        return Some(match value {
            Value::String(s) => resolve_moisture(s),
            _ => Moisture::Unknown,
        });
    }
    match fields.get("is_wet") {
        Some(Value::Bool(true)) => Some(Moisture::Wet),
        Some(Value::Bool(false)) => Some(Moisture::Dry),
        Some(_) => Some(Moisture::Unknown),
        None => None,
    }
}

/// Bare yes/no answers in a field whose key already names the axis.
fn affirmation(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "y" => Some(true),
        "no" | "false" | "n" => Some(false),
        _ => None,
    }
}

fn first_string(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_prose_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !line.starts_with('{')
                && !line.starts_with('}')
                && !line.starts_with('"')
                && !line.starts_with("```")
        })
        .map(str::to_string)
}

/// Last top-level JSON object in the text, if any parses.
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    extract_json_candidates(text)
        .iter()
        .rev()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

fn extract_json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0
                        && let Some(s) = start.take()
                    {
                        candidates.push(&text[s..idx + 1]);
                    }
                }
            }
            _ => {}
        }
    }

    candidates
}

/// At most `max` chars, the last three being "..." when cut.
fn truncate_chars(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Classification {
        normalize(&ClassifierOutput::new(text, "test-model"))
    }

    #[test]
    fn test_banana_peel_is_biodegradable_wet() {
        let c = classify("This is a banana peel, fully biodegradable and wet");
        assert_eq!(c.biodegradable, Biodegradability::Yes);
        assert_eq!(c.moisture, Moisture::Wet);
        assert_eq!(c.raw_label, "This is a banana peel, fully biodegradable and wet");
    }

    #[test]
    fn test_plastic_bottle_is_non_biodegradable_dry() {
        let c = classify("Looks like a plastic bottle, non-biodegradable, dry");
        assert_eq!(c.biodegradable, Biodegradability::No);
        assert_eq!(c.moisture, Moisture::Dry);
        assert_eq!(c.category, WasteCategory::Recyclable);
    }

    #[test]
    fn test_empty_and_garbled_resolve_to_unknown() {
        for text in ["", "   \n\t", "%%## ??? lorem ipsum 1234"] {
            let c = classify(text);
            assert_eq!(c.biodegradable, Biodegradability::Unknown, "text: {text:?}");
            assert_eq!(c.moisture, Moisture::Unknown, "text: {text:?}");
            assert_eq!(c.confidence, Confidence::Unknown);
        }
        assert_eq!(classify("").raw_label, "");
    }

    #[test]
    fn test_conflicting_keywords_resolve_to_unknown() {
        let c = classify("Partly biodegradable, partly inorganic. Wet on one side, dry on the other.");
        assert_eq!(c.biodegradable, Biodegradability::Unknown);
        assert_eq!(c.moisture, Moisture::Unknown);
    }

    #[test]
    fn test_negations_do_not_count_as_positive() {
        assert_eq!(resolve_biodegradability("NOT biodegradable"), Biodegradability::No);
        assert_eq!(resolve_biodegradability("non biodegradable"), Biodegradability::No);
        assert_eq!(resolve_biodegradability("inorganic material"), Biodegradability::No);
        assert_eq!(resolve_biodegradability("Compostable cup"), Biodegradability::Yes);
    }

    #[test]
    fn test_every_negated_form_is_non_biodegradable() {
        let cases = [
            "A crisp packet, non organic and dry",
            "Styrofoam tray, not organic, dry",
            "Plastic film, non compostable, dry",
            "Coffee pod, noncompostable, dry",
            "Rubber glove, not decomposable, dry",
            "Glass jar, non-decomposable, dry",
            "Ceramic shard, non-organic, dry",
            "Foil wrapper, nonbiodegradable, dry",
            "Tin can, Not  Biodegradable, dry",
            "Bottle cap, inorganic, dry",
        ];
        for text in cases {
            let c = classify(text);
            assert_eq!(c.biodegradable, Biodegradability::No, "text: {text:?}");
            assert_eq!(crate::advice::advise(&c).bin_category, "Recycling bin", "text: {text:?}");
        }
        // "in organic waste" is not the word "inorganic"
        assert_eq!(
            resolve_biodegradability("belongs in organic waste"),
            Biodegradability::Yes
        );
    }

    #[test]
    fn test_negated_moisture_is_not_evidence() {
        assert_eq!(resolve_moisture("not wet, fairly clean"), Moisture::Unknown);
        assert_eq!(resolve_moisture("not too dry, a bit soggy"), Moisture::Wet);
        assert_eq!(resolve_moisture("not wet at all, completely dry"), Moisture::Dry);
    }

    #[test]
    fn test_keywords_match_on_word_boundaries() {
        // "between" contains "wet", "drywall" contains "dry"
        assert_eq!(resolve_moisture("somewhere between two boards"), Moisture::Unknown);
        assert_eq!(resolve_moisture("a drywall offcut"), Moisture::Unknown);
        assert_eq!(resolve_moisture("a DAMP cloth"), Moisture::Wet);
    }

    #[test]
    fn test_axes_are_independent() {
        let moisture_variants = ["wet", "dry", "soggy", "", "wet and dry"];
        let bio_variants = ["biodegradable", "non-biodegradable", "", "organic but inorganic"];

        for bio in bio_variants {
            let expected = resolve_biodegradability(&format!("item is {bio}"));
            for moisture in moisture_variants {
                let c = classify(&format!("item is {bio}, looks {moisture}"));
                assert_eq!(c.biodegradable, expected, "bio={bio:?} moisture={moisture:?}");
            }
        }
        for moisture in moisture_variants {
            let expected = resolve_moisture(&format!("looks {moisture}"));
            for bio in bio_variants {
                let c = classify(&format!("item is {bio}, looks {moisture}"));
                assert_eq!(c.moisture, expected, "bio={bio:?} moisture={moisture:?}");
            }
        }
    }

    #[test]
    fn test_structured_json_answer() {
        let text = r#"```json
{
    "primary_category": "Recyclable",
    "secondary_category": "plastic bottle",
    "biodegradable": "non-biodegradable",
    "moisture": "dry",
    "item_name": "Water bottle",
    "confidence": "High",
    "disposal_advice": "Dry before disposal and recycle."
}
```"#;
        let c = classify(text);
        assert_eq!(c.biodegradable, Biodegradability::No);
        // the advice text mentions "dry" too, but the moisture field decides
        assert_eq!(c.moisture, Moisture::Dry);
        assert_eq!(c.category, WasteCategory::Recyclable);
        assert_eq!(c.confidence, Confidence::High);
        assert_eq!(c.item_name.as_deref(), Some("Water bottle"));
        assert_eq!(c.raw_label, "Water bottle");
        assert_eq!(
            c.model_advice.as_deref(),
            Some("Dry before disposal and recycle.")
        );
    }

    #[test]
    fn test_json_field_overrides_free_text() {
        let text = r#"Some wet residue visible. {"moisture": "dry", "is_biodegradable": true}"#;
        let c = classify(text);
        assert_eq!(c.moisture, Moisture::Dry);
        assert_eq!(c.biodegradable, Biodegradability::Yes);
        assert_eq!(c.raw_label, "Some wet residue visible. {\"moisture\": \"dry\", \"is_biodegradable\": true}");
    }

    #[test]
    fn test_missing_json_field_falls_back_to_text() {
        let c = classify(r#"{"category": "Biodegradable (wet)", "confidence": 85}"#);
        assert_eq!(c.biodegradable, Biodegradability::Yes);
        assert_eq!(c.moisture, Moisture::Wet);
        assert_eq!(c.confidence, Confidence::High);
        assert_eq!(c.raw_label, "");
    }

    #[test]
    fn test_unrecognized_field_value_is_unknown() {
        let c = classify(r#"{"biodegradable": "it depends", "moisture": 3}"#);
        assert_eq!(c.biodegradable, Biodegradability::Unknown);
        assert_eq!(c.moisture, Moisture::Unknown);
    }

    #[test]
    fn test_malformed_json_degrades_to_text_scan() {
        let c = classify(r#"{"item": "peel", "moisture": "wet""#);
        // no complete object; the raw text still carries "wet"
        assert_eq!(c.moisture, Moisture::Wet);
        assert_eq!(c.biodegradable, Biodegradability::Unknown);
    }

    #[test]
    fn test_confidence_from_prose() {
        assert_eq!(classify("High confidence: compostable").confidence, Confidence::High);
        assert_eq!(classify("confidence: 55%").confidence, Confidence::Medium);
        assert_eq!(classify("Confidence level low").confidence, Confidence::Low);
    }

    #[test]
    fn test_category_tie_is_unknown() {
        assert_eq!(resolve_category("plastic wrapped food"), WasteCategory::Unknown);
        assert_eq!(resolve_category("old phone battery, toxic"), WasteCategory::Hazardous);
        assert_eq!(resolve_category("nothing to see"), WasteCategory::Unknown);
    }

    #[test]
    fn test_long_label_is_truncated() {
        let long = "x".repeat(200);
        let c = classify(&long);
        assert_eq!(c.raw_label.chars().count(), MAX_LABEL_CHARS);
        assert!(c.raw_label.ends_with("..."));

        let exact = "y".repeat(MAX_LABEL_CHARS);
        assert_eq!(classify(&exact).raw_label, exact);
    }

    #[test]
    fn test_extract_json_candidates_skips_braces_in_strings() {
        let text = r#"prefix {"a": "}{"} middle {"b": 1} end"#;
        let candidates = extract_json_candidates(text);
        assert_eq!(candidates, vec![r#"{"a": "}{"}"#, r#"{"b": 1}"#]);
    }
}
