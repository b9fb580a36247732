//! Human-facing strings for an advisory report.

use serde::Serialize;

use crate::advisor::AdvisoryReport;
use crate::classification::{Biodegradability, Confidence, Moisture, WasteCategory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySummary {
    pub item_name: String,
    pub category: String,
    pub biodegradable: String,
    pub moisture: String,
    pub confidence: String,
    pub title: String,
    pub bin: String,
    pub instructions: String,
    pub tip: String,
    /// Advice text the model volunteered, if any
    pub model_advice: Option<String>,
}

pub fn confidence_label(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "🔵 High",
        Confidence::Medium => "🟢 Medium",
        Confidence::Low => "🟠 Low",
        Confidence::Unknown => "⚪ Unknown",
    }
}

pub fn category_label(category: WasteCategory) -> &'static str {
    match category {
        WasteCategory::Organic => "🌱 Organic",
        WasteCategory::Recyclable => "♻️ Recyclable",
        WasteCategory::Hazardous => "⚠️ Hazardous",
        WasteCategory::EWaste => "🔌 E-waste",
        WasteCategory::General => "🗑️ General",
        WasteCategory::Unknown => "❔ Unknown",
    }
}

pub fn biodegradable_label(value: Biodegradability) -> &'static str {
    match value {
        Biodegradability::Yes => "♻️ Biodegradable",
        Biodegradability::No => "⛔ Non-biodegradable",
        Biodegradability::Unknown => "❔ Unknown",
    }
}

pub fn moisture_label(value: Moisture) -> &'static str {
    match value {
        Moisture::Wet => "💧 Wet",
        Moisture::Dry => "☀️ Dry",
        Moisture::Unknown => "❔ Unknown",
    }
}

pub fn summarize(report: &AdvisoryReport) -> DisplaySummary {
    let c = &report.classification;
    let item_name = c
        .item_name
        .as_deref()
        .map(title_case)
        .or_else(|| (!c.raw_label.is_empty()).then(|| c.raw_label.clone()))
        .unwrap_or_else(|| "Unknown item".to_string());

    DisplaySummary {
        item_name,
        category: category_label(c.category).to_string(),
        biodegradable: biodegradable_label(c.biodegradable).to_string(),
        moisture: moisture_label(c.moisture).to_string(),
        confidence: confidence_label(c.confidence).to_string(),
        title: report.advice.title.to_string(),
        bin: report.advice.bin_category.to_string(),
        instructions: report.advice.instructions.to_string(),
        tip: report.advice.tip.to_string(),
        model_advice: c.model_advice.clone(),
    }
}

fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassifierOutput;
    use uuid::Uuid;

    fn report(text: &str) -> AdvisoryReport {
        AdvisoryReport::from_output(Uuid::new_v4(), &ClassifierOutput::new(text, "m"))
    }

    #[test]
    fn test_summary_from_structured_answer() {
        let summary = summarize(&report(
            r#"{"item_name": "water bottle", "biodegradable": "non-biodegradable",
                "moisture": "dry", "primary_category": "recyclable", "confidence": "medium"}"#,
        ));
        assert_eq!(summary.item_name, "Water Bottle");
        assert_eq!(summary.category, "♻️ Recyclable");
        assert_eq!(summary.biodegradable, "⛔ Non-biodegradable");
        assert_eq!(summary.moisture, "☀️ Dry");
        assert_eq!(summary.confidence, "🟢 Medium");
        assert_eq!(summary.bin, "Recycling bin");
    }

    #[test]
    fn test_summary_for_empty_answer() {
        let summary = summarize(&report(""));
        assert_eq!(summary.item_name, "Unknown item");
        assert_eq!(summary.confidence, "⚪ Unknown");
        assert_eq!(summary.title, "Unidentified Waste");
        assert!(summary.model_advice.is_none());
    }
}
