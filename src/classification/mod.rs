//! Classification types and the normalizer that produces them.

pub mod normalizer;
pub mod types;

pub use normalizer::normalize;
pub use types::{
    Biodegradability, Classification, ClassifierOutput, Confidence, Moisture, WasteCategory,
};
