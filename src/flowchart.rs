use crate::error::LlmError;
use crate::llm::LlmProvider;
use crate::prompts::flowchart_prompt;
use std::sync::Arc;

/// Turns a code snippet into a Mermaid flowchart description
pub struct FlowchartDescriber {
    llm: Arc<dyn LlmProvider>,
}

impl FlowchartDescriber {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// One completion for the snippet, trimmed. The returned text is not validated.
    pub async fn describe(&self, code: &str) -> Result<String, LlmError> {
        tracing::info!("Requesting flowchart breakdown from {}", self.llm.name());
        let text = self.llm.chat(&flowchart_prompt(code)).await?;
        Ok(text.trim().to_string())
    }
}
