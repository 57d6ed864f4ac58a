//! Confidence grading from retrieval distances.

use neurocite_core::answer::ConfidenceVerdict;
use neurocite_core::evidence::EvidencePool;

/// Grades an evidence pool by its best (smallest) literature distance.
///
/// A pool with no literature chunks is always `Low`; structured facts
/// alone do not make an answer confident.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceEvaluator {
    threshold: f32,
}

impl ConfidenceEvaluator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_usable(&self, distance: f32) -> bool {
        distance <= self.threshold
    }

    pub fn evaluate(&self, pool: &EvidencePool) -> ConfidenceVerdict {
        match pool.best_distance() {
            Some(best) if self.is_usable(best) => ConfidenceVerdict::Acceptable,
            _ => ConfidenceVerdict::Low,
        }
    }
}

impl Default for ConfidenceEvaluator {
    fn default() -> Self {
        Self::new(1.2)
    }
}
