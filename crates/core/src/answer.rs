//! The externally visible result of answering a question.

use serde::{Deserialize, Serialize};

/// One tool invocation in the agent loop. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    /// 1-indexed position in the trace.
    pub hop: u32,
    /// Tool that was invoked.
    pub tool: String,
    /// Arguments passed to the tool.
    pub args: serde_json::Value,
    /// Human-readable result, or `"Error: ..."` for a failed call.
    pub result_summary: String,
    /// Whether the tool call succeeded.
    pub success: bool,
}

/// Grade of the retrieved evidence, derived only from retrieval distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceVerdict {
    Acceptable,
    Low,
}

impl ConfidenceVerdict {
    pub fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }

    pub fn note(self) -> &'static str {
        match self {
            Self::Acceptable => "Good confidence: documents appear relevant.",
            Self::Low => "Low confidence: documents may not be closely relevant.",
        }
    }
}

/// A literature source cited in the answer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedPaper {
    pub pmid: String,
    pub title: String,
}

/// The final answer for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text with inline citation markers.
    pub text: String,
    /// Papers referenced in `text`, in first-mention order.
    pub cited_papers: Vec<CitedPaper>,
    /// Number of hops executed.
    pub hops: u32,
    /// Every hop, in order.
    pub trace: Vec<Hop>,
    pub confidence: ConfidenceVerdict,
    /// Smallest retrieval distance seen, if any literature was retrieved.
    pub best_distance: Option<f32>,
    /// Reformulations produced by query expansion.
    pub expanded_queries: Vec<String>,
}

impl Answer {
    pub fn low_confidence(&self) -> bool {
        self.confidence.is_low()
    }
}
