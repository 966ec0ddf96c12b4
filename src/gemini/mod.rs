//! Gemini structured-output client and the medicine info enrichment built on it.

pub(crate) mod client;
pub(crate) mod enrich;
pub(crate) mod types;

pub use client::{EnrichError, GeminiClient};
pub use enrich::EnrichmentProxy;
