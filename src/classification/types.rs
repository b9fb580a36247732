//! Shared types for the classification module
//!
//! `ClassifierOutput` is what the provider hands back; `Classification` is what the
//! normalizer makes of it. Every `Classification` field always holds a value, with
//! `Unknown` as an explicit state rather than a missing one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw answer from the external classifier. No schema is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub text: String,
    /// Model that produced the answer
    pub model: String,
}

impl ClassifierOutput {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Biodegradability axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biodegradability {
    Yes,
    No,
    Unknown,
}

impl Biodegradability {
    pub const ALL: [Biodegradability; 3] = [
        Biodegradability::Yes,
        Biodegradability::No,
        Biodegradability::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Biodegradability::Yes => "yes",
            Biodegradability::No => "no",
            Biodegradability::Unknown => "unknown",
        }
    }
}

/// Moisture axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Moisture {
    Wet,
    Dry,
    Unknown,
}

impl Moisture {
    pub const ALL: [Moisture; 3] = [Moisture::Wet, Moisture::Dry, Moisture::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Moisture::Wet => "wet",
            Moisture::Dry => "dry",
            Moisture::Unknown => "unknown",
        }
    }
}

/// Primary waste category reported alongside the two axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WasteCategory {
    Organic,
    Recyclable,
    Hazardous,
    EWaste,
    General,
    Unknown,
}

impl WasteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Organic => "organic",
            WasteCategory::Recyclable => "recyclable",
            WasteCategory::Hazardous => "hazardous",
            WasteCategory::EWaste => "e-waste",
            WasteCategory::General => "general",
            WasteCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl Confidence {
    /// Map a 0-100 score onto the three named levels.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            Confidence::Unknown
        } else if score >= 75.0 {
            Confidence::High
        } else if score >= 40.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        }
    }
}

/// Normalized classification of one uploaded item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub biodegradable: Biodegradability,
    pub moisture: Moisture,
    pub raw_label: String,
    pub category: WasteCategory,
    pub confidence: Confidence,
    pub item_name: Option<String>,
    /// Free-text advice volunteered by the model, shown next to the table advice
    pub model_advice: Option<String>,
}

impl Classification {
    /// Fully unknown classification, the result for empty or garbled output.
    pub fn unknown() -> Self {
        Self {
            biodegradable: Biodegradability::Unknown,
            moisture: Moisture::Unknown,
            raw_label: String::new(),
            category: WasteCategory::Unknown,
            confidence: Confidence::Unknown,
            item_name: None,
            model_advice: None,
        }
    }

    pub fn axes(&self) -> (Biodegradability, Moisture) {
        (self.biodegradable, self.moisture)
    }
}
