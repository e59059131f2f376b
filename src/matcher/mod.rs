//! Scholarship matcher — deterministic filter, score and rank over a dataset.
//!
//! Load failures never propagate: they become an error-shaped
//! [`MatchOutcome`], which callers treat the same as "no matches" and use as
//! the cue to fall back to an external search.

pub mod dataset;
pub mod engine;
pub mod model;

use std::sync::Arc;

use tracing::{info, warn};

pub use dataset::{DatasetLoader, JsonFileDataset, StaticDataset};
pub use engine::rank;
pub use model::{Degrees, MatchOutcome, MatchProfile, RankedScholarship, Scholarship};

/// Looks up scholarships for a profile against a dataset source.
pub struct ScholarshipFinder {
    loader: Arc<dyn DatasetLoader>,
}

impl ScholarshipFinder {
    pub fn new(loader: Arc<dyn DatasetLoader>) -> Self {
        Self { loader }
    }

    /// Find up to `top_k` eligible scholarships, best funding match first.
    pub async fn find(&self, profile: &MatchProfile, top_k: usize) -> MatchOutcome {
        let dataset = match self.loader.load().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Scholarship dataset unavailable");
                return MatchOutcome::Error {
                    error_message: format!("Failed to load dataset: {e}"),
                };
            }
        };

        let ranked = rank(profile, &dataset, top_k);
        info!(matches = ranked.len(), "Scholarship lookup complete");
        MatchOutcome::success(ranked)
    }
}
