//! Prompt construction for the question loop and the flowchart describer.
//!
//! Pure functions from inputs to chat messages; no network access here.

use crate::llm::Message;
use crate::vector_db::SearchHit;

const CODEBASE_INSTRUCTIONS: &str = "\
You are Codebase AI. You are a superintelligent AI that answers questions about codebases.

You are:
- helpful & friendly
- good at answering complex questions in simple language
- an expert in all programming languages
- able to infer the intent of the user's question

The user will ask a question about their codebase, and you will answer it.

When the user asks their question, you will answer it by searching the codebase for the answer.";

const FLOWCHART_INSTRUCTIONS: &str = "\
You are Codebase AI. Your task is to convert the following code into a structured breakdown \
suitable for generating a flowchart.

The breakdown must be Mermaid flowchart text so that it can be rendered by later tooling.";

/// Join retrieved chunk contents, separated by blank lines, in retrieval order
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fixed instructions followed by the question and the retrieved code
pub fn codebase_prompt(question: &str, context: &str) -> Vec<Message> {
    let user = format!(
        "Here is the user's question and code file(s) you found to answer the question:\n\n\
         Question:\n{question}\n\n\
         Code file(s):\n{context}\n\n\
         [END OF CODE FILE(S)]\n\n\
         Now answer the question using the code file(s) above."
    );
    vec![Message::system(CODEBASE_INSTRUCTIONS), Message::user(user)]
}

pub fn flowchart_prompt(code: &str) -> Vec<Message> {
    let user = format!("{code}\n\nBreakdown:");
    vec![Message::system(FLOWCHART_INSTRUCTIONS), Message::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn hit(content: &str) -> SearchHit {
        SearchHit {
            path: "x.py".to_string(),
            content: content.to_string(),
            distance: 0.0,
        }
    }

    #[test]
    fn test_format_context_joins_with_blank_lines() {
        let context = format_context(&[hit("def a(): pass"), hit("def b(): pass")]);
        assert_eq!(context, "def a(): pass\n\ndef b(): pass");
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_codebase_prompt_structure() {
        let messages = codebase_prompt("What does add do?", "def add(a, b): return a + b");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("You are Codebase AI."));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("Question:\nWhat does add do?"));
        assert!(messages[1].content.contains("def add(a, b): return a + b"));
        assert!(messages[1].content.contains("[END OF CODE FILE(S)]"));
    }

    #[test]
    fn test_codebase_prompt_is_pure() {
        assert_eq!(codebase_prompt("q", "c"), codebase_prompt("q", "c"));
    }

    #[test]
    fn test_flowchart_prompt_embeds_code() {
        let messages = flowchart_prompt("def f(): return 1");
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Mermaid"));
        assert!(messages[1].content.starts_with("def f(): return 1"));
        assert!(messages[1].content.ends_with("Breakdown:"));
    }
}
