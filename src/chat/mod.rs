//! Interactive question loop over an ingested codebase.
//!
//! Each cycle embeds the question, retrieves the closest chunks, and streams
//! an answer from the language model. Nothing carries over between cycles.

use crate::config::QueryConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{CodebaseError, Result};
use crate::llm::LlmProvider;
use crate::prompts::{codebase_prompt, format_context};
use crate::vector_db::VectorStore;
use console::style;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const QUESTION_PROMPT: &str = "What question do you have about your repo?";
pub const GOODBYE: &str = "Goodbye!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Terminated,
}

/// Case-insensitive, whitespace-trimmed "exit"
pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

pub struct ChatSession {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    collection: String,
    top_k: usize,
    show_context: bool,
    state: SessionState,
}

impl ChatSession {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        collection: impl Into<String>,
        query: &QueryConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            collection: collection.into(),
            top_k: query.top_k,
            show_context: query.show_context,
            state: SessionState::AwaitingInput,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the loop until "exit", end of input, or a fatal error
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        while self.state == SessionState::AwaitingInput {
            writeln!(out, "{}", style(QUESTION_PROMPT).blue())?;
            out.flush()?;

            let line = lines.next_line().await?;
            self.handle(line.as_deref(), out).await?;
        }

        Ok(())
    }

    /// Process one line of input; `None` means the input is exhausted
    pub async fn handle<W: Write>(&mut self, line: Option<&str>, out: &mut W) -> Result<SessionState> {
        let Some(question) = line else {
            tracing::debug!("Input closed, ending session");
            self.state = SessionState::Terminated;
            return Ok(self.state);
        };

        if is_exit_command(question) {
            writeln!(out, "{}", style(GOODBYE).red())?;
            self.state = SessionState::Terminated;
            return Ok(self.state);
        }

        if question.trim().is_empty() {
            return Ok(self.state);
        }

        match self.answer(question.trim(), out).await {
            Ok(()) => {}
            Err(e) if ends_session(&e) => {
                self.state = SessionState::Terminated;
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Question failed: {}", e);
                writeln!(out, "\n{}\n", style(format!("Error: {e}")).red())?;
            }
        }

        Ok(self.state)
    }

    async fn answer<W: Write>(&self, question: &str, out: &mut W) -> Result<()> {
        let query_vector = self.embedder.embed(question).await?;
        let hits = self
            .store
            .similarity_search(&self.collection, &query_vector, self.top_k)
            .await?;
        tracing::debug!("Retrieved {} chunks for question", hits.len());

        let context = format_context(&hits);
        if self.show_context {
            writeln!(out, "\n{}\n", style(&context).magenta())?;
        }

        let messages = codebase_prompt(question, &context);
        let mut stream = self.llm.chat_stream(&messages).await?;
        while let Some(fragment) = stream.next().await {
            write!(out, "{}", style(fragment?).green())?;
            out.flush()?;
        }
        writeln!(out, "\n\n")?;
        Ok(())
    }
}

/// Errors that end the loop rather than just the current cycle
fn ends_session(error: &CodebaseError) -> bool {
    error.is_fatal() || matches!(error, CodebaseError::Io(_))
}
