//! Structured lookup tool: compound/target potency records by name.

use async_trait::async_trait;
use neurocite_core::error::ToolError;
use neurocite_core::evidence::StructuredFact;
use neurocite_core::retrieval::StructuredStore;
use neurocite_core::tool::{Tool, ToolOutput};
use std::sync::Arc;

pub const NAME: &str = "lookup_structured_data";

pub struct LookupStructuredDataTool {
    store: Arc<dyn StructuredStore>,
    limit: usize,
}

impl LookupStructuredDataTool {
    pub fn new(store: Arc<dyn StructuredStore>) -> Self {
        Self { store, limit: 10 }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}

/// `"DONEPEZIL → ACHE IC50=6.7 nM (+2 more)"`
pub fn summarize_facts(query: &str, facts: &[StructuredFact]) -> String {
    match facts {
        [] => format!("No structured records found for '{query}'"),
        [only] => only.describe(),
        [first, rest @ ..] => format!("{} (+{} more)", first.describe(), rest.len()),
    }
}

#[async_trait]
impl Tool for LookupStructuredDataTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Look up compound bioactivity records (drug name, protein target, IC50 potency, units, \
         UniProt id, source PMID) by drug or compound name. Use for questions about potency, \
         binding or inhibition of specific targets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "entity_or_topic": {
                    "type": "string",
                    "description": "Drug or compound name, e.g. 'donepezil'"
                }
            },
            "required": ["entity_or_topic"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = arguments["entity_or_topic"]
            .as_str()
            .map(str::trim)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool_name: NAME.into(),
                reason: "missing 'entity_or_topic'".into(),
            })?;

        let facts = self
            .store
            .lookup(query, self.limit)
            .await
            .map_err(|e| ToolError::from_retrieval(NAME, e))?;

        Ok(ToolOutput {
            summary: summarize_facts(query, &facts),
            chunks: Vec::new(),
            facts,
        })
    }
}
