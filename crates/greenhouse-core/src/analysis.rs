//! Simulated leaf analysis
//!
//! There is no inference backend: results are drawn uniformly at random.
//! The analyzer sits behind [`LeafAnalyzer`] so a real model can replace it.

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::upload::UploadedImage;

/// Leaf counts are drawn from this half-open range
pub const LEAF_COUNT_RANGE: Range<u32> = 10..60;

/// Accuracy in tenths of a percent (85.0% up to but excluding 100.0%)
pub const ACCURACY_TENTHS_RANGE: Range<u16> = 850..1000;

/// Outcome of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub leaf_count: u32,
    /// Accuracy in tenths of a percent, so 934 means 93.4%
    pub accuracy_tenths: u16,
    pub computed_at: DateTime<Local>,
}

impl AnalysisResult {
    pub fn accuracy_percent(&self) -> f64 {
        f64::from(self.accuracy_tenths) / 10.0
    }

    /// Accuracy as displayed, e.g. `93.4%`
    pub fn accuracy_label(&self) -> String {
        format!("{}.{}%", self.accuracy_tenths / 10, self.accuracy_tenths % 10)
    }

    /// Wall-clock time of the analysis, e.g. `3:04:05 PM`
    pub fn time_label(&self) -> String {
        self.computed_at.format("%-I:%M:%S %p").to_string()
    }

    /// Confirmation message shown once the analysis lands
    pub fn summary(&self) -> String {
        format!(
            "Analysis complete! Detected {} leaves with {} accuracy.",
            self.leaf_count,
            self.accuracy_label()
        )
    }
}

/// Produces an analysis result for an uploaded image
pub trait LeafAnalyzer: Send + 'static {
    fn analyze(&mut self, image: &UploadedImage) -> AnalysisResult;
}

/// Random placeholder analyzer
pub struct SimulatedAnalyzer {
    rng: StdRng,
}

impl SimulatedAnalyzer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic analyzer, used by tests and `analysis.seed` in config
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafAnalyzer for SimulatedAnalyzer {
    fn analyze(&mut self, _image: &UploadedImage) -> AnalysisResult {
        AnalysisResult {
            leaf_count: self.rng.gen_range(LEAF_COUNT_RANGE),
            accuracy_tenths: self.rng.gen_range(ACCURACY_TENTHS_RANGE),
            computed_at: Local::now(),
        }
    }
}
