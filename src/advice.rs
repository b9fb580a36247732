//! Disposal advice lookup
//!
//! A fixed table with one entry per `(biodegradable, moisture)` pair, 3 x 3 including
//! `Unknown`. The slot of each entry is computed from its key, so a lookup can never
//! miss; `verify_table` checks at startup that every slot holds the entry for its
//! own key and that no entry has blank text.

use serde::Serialize;

use crate::classification::{Biodegradability, Classification, Moisture};
use crate::error::{Result, WasteAdvisorError};

/// Number of `(biodegradable, moisture)` combinations.
pub const TABLE_SIZE: usize = Biodegradability::ALL.len() * Moisture::ALL.len();

/// Advice shown for one classified item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisposalAdvice {
    pub title: &'static str,
    pub bin_category: &'static str,
    pub instructions: &'static str,
    pub tip: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct AdviceEntry {
    pub biodegradable: Biodegradability,
    pub moisture: Moisture,
    pub advice: DisposalAdvice,
}

const fn entry(
    biodegradable: Biodegradability,
    moisture: Moisture,
    title: &'static str,
    bin_category: &'static str,
    instructions: &'static str,
    tip: &'static str,
) -> AdviceEntry {
    AdviceEntry {
        biodegradable,
        moisture,
        advice: DisposalAdvice {
            title,
            bin_category,
            instructions,
            tip,
        },
    }
}

// Ordered by slot(): biodegradable-major, moisture-minor.
static ADVICE_TABLE: [AdviceEntry; TABLE_SIZE] = [
    entry(
        Biodegradability::Yes,
        Moisture::Wet,
        "Biodegradable Wet Waste",
        "Green bin (compost)",
        "Compost this item or place it in the green bin.",
        "These materials break down naturally and can be composted to create nutrient-rich soil.",
    ),
    entry(
        Biodegradability::Yes,
        Moisture::Dry,
        "Biodegradable Dry Waste",
        "Green bin (compost)",
        "Compost this item or place it in the green bin.",
        "These items decompose naturally but take longer than wet waste. Shredding speeds up the process.",
    ),
    entry(
        Biodegradability::Yes,
        Moisture::Unknown,
        "Biodegradable Waste",
        "Green bin (compost)",
        "Drain any liquid, then compost the item or place it in the green bin.",
        "Keep compostables free of plastic bags and wrappers so they break down cleanly.",
    ),
    entry(
        Biodegradability::No,
        Moisture::Wet,
        "Non-Biodegradable Wet Waste",
        "Recycling bin (after drying)",
        "Dry before disposal. Check local recycling guidelines.",
        "Clean and dry these items before recycling to prevent contamination of other recyclables.",
    ),
    entry(
        Biodegradability::No,
        Moisture::Dry,
        "Non-Biodegradable Dry Waste",
        "Recycling bin",
        "Recycle if possible, otherwise dispose of it safely in general waste.",
        "Check for local recycling programs. When in doubt, consult your local waste management guidelines.",
    ),
    entry(
        Biodegradability::No,
        Moisture::Unknown,
        "Non-Biodegradable Waste",
        "Recycling bin",
        "Rinse and dry the item, then recycle it if your local program accepts it.",
        "Items that are not accepted for recycling belong in general waste, never in compost.",
    ),
    entry(
        Biodegradability::Unknown,
        Moisture::Wet,
        "Unsorted Wet Waste",
        "General waste bin",
        "Drain excess liquid and seal the item in a bag before putting it in general waste. When in doubt, check local guidelines.",
        "Wet waste left loose attracts pests and soaks other waste. Keep it contained.",
    ),
    entry(
        Biodegradability::Unknown,
        Moisture::Dry,
        "Unsorted Dry Waste",
        "General waste bin",
        "When in doubt, check local guidelines before recycling. Otherwise use general waste.",
        "Many councils publish an A-Z list of items and the bin they belong in.",
    ),
    entry(
        Biodegradability::Unknown,
        Moisture::Unknown,
        "Unidentified Waste",
        "General waste bin",
        "We could not identify this item. When in doubt, check local guidelines.",
        "Try another photo with the item centred, well lit and on a plain background.",
    ),
];

fn biodegradable_index(b: Biodegradability) -> usize {
    match b {
        Biodegradability::Yes => 0,
        Biodegradability::No => 1,
        Biodegradability::Unknown => 2,
    }
}

fn moisture_index(m: Moisture) -> usize {
    match m {
        Moisture::Wet => 0,
        Moisture::Dry => 1,
        Moisture::Unknown => 2,
    }
}

fn slot(b: Biodegradability, m: Moisture) -> usize {
    biodegradable_index(b) * Moisture::ALL.len() + moisture_index(m)
}

/// Advice for a classification. Total: every classification has exactly one entry.
pub fn advise(classification: &Classification) -> DisposalAdvice {
    lookup(classification.biodegradable, classification.moisture)
}

pub fn lookup(biodegradable: Biodegradability, moisture: Moisture) -> DisposalAdvice {
    ADVICE_TABLE[slot(biodegradable, moisture)].advice
}

/// All table entries in slot order.
pub fn entries() -> &'static [AdviceEntry] {
    &ADVICE_TABLE
}

/// Check the built-in table. Called once at startup.
pub fn verify_table() -> Result<()> {
    verify_entries(&ADVICE_TABLE)
}

pub fn verify_entries(entries: &[AdviceEntry]) -> Result<()> {
    if entries.len() != TABLE_SIZE {
        return Err(WasteAdvisorError::AdviceTable {
            message: format!("expected {} entries, found {}", TABLE_SIZE, entries.len()),
        });
    }
    for b in Biodegradability::ALL {
        for m in Moisture::ALL {
            let found = &entries[slot(b, m)];
            if found.biodegradable != b || found.moisture != m {
                return Err(WasteAdvisorError::AdviceTable {
                    message: format!(
                        "slot for ({}, {}) holds ({}, {})",
                        b.as_str(),
                        m.as_str(),
                        found.biodegradable.as_str(),
                        found.moisture.as_str()
                    ),
                });
            }
            let advice = &found.advice;
            if [advice.title, advice.bin_category, advice.instructions, advice.tip]
                .iter()
                .any(|s| s.trim().is_empty())
            {
                return Err(WasteAdvisorError::AdviceTable {
                    message: format!("blank text for ({}, {})", b.as_str(), m.as_str()),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{ClassifierOutput, normalize};

    #[test]
    fn test_builtin_table_is_total() {
        verify_table().expect("built-in table should verify");
        for b in Biodegradability::ALL {
            for m in Moisture::ALL {
                let advice = lookup(b, m);
                assert!(!advice.bin_category.is_empty());
                assert!(!advice.instructions.is_empty());
                assert!(!advice.tip.is_empty());
            }
        }
    }

    #[test]
    fn test_slots_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for b in Biodegradability::ALL {
            for m in Moisture::ALL {
                assert!(seen.insert(slot(b, m)));
            }
        }
        assert_eq!(seen.len(), TABLE_SIZE);
    }

    #[test]
    fn test_misordered_table_is_rejected() {
        let mut broken = ADVICE_TABLE;
        broken.swap(0, 4);
        let err = verify_entries(&broken).unwrap_err();
        assert!(err.to_string().contains("slot for (yes, wet)"));
    }

    #[test]
    fn test_short_or_blank_table_is_rejected() {
        assert!(verify_entries(&ADVICE_TABLE[..8]).is_err());

        let mut blank = ADVICE_TABLE;
        blank[8].advice.tip = "  ";
        assert!(verify_entries(&blank).is_err());
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let c = normalize(&ClassifierOutput::new("compostable and soggy", "m"));
        assert_eq!(advise(&c), advise(&c));
    }

    #[test]
    fn test_banana_peel_gets_composting_advice() {
        let c = normalize(&ClassifierOutput::new(
            "This is a banana peel, fully biodegradable and wet",
            "m",
        ));
        let advice = advise(&c);
        assert!(advice.instructions.contains("Compost"));
        assert!(advice.bin_category.contains("compost"));
    }

    #[test]
    fn test_plastic_bottle_gets_recycling_bin() {
        let c = normalize(&ClassifierOutput::new(
            "Looks like a plastic bottle, non-biodegradable, dry",
            "m",
        ));
        assert_eq!(advise(&c).bin_category, "Recycling bin");
    }

    #[test]
    fn test_unknown_gets_conservative_advice() {
        let c = normalize(&ClassifierOutput::new("", "m"));
        let advice = advise(&c);
        assert_eq!(advice.title, "Unidentified Waste");
        assert!(advice.instructions.contains("check local guidelines"));
    }
}
