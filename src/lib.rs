//! Waste image classification front-end.
//!
//! An uploaded photo goes to a hosted vision model, the free-form answer is
//! normalized into a fixed classification, and that classification picks an
//! entry from a static disposal advice table.

pub mod advice;
pub mod advisor;
pub mod classification;
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod presentation;
pub mod upload;

pub use advisor::{AdvisoryReport, WasteAdvisor};
pub use config::Config;
pub use error::{Result, WasteAdvisorError};
