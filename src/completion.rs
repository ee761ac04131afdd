//! Completion invoker - single-prompt model calls with optional token streaming.
//!
//! # Outcomes
//! Every call resolves to a [`Completion`]; nothing is raised to the caller.
//! - `Success(text)`: the model answered (possibly with empty text)
//! - `Aborted`: the invoker's cancellation token fired before the answer finished
//! - `Failed(reason)`: transport, provider or stream error
//!
//! # Events (observed calls only)
//! - one `task-execute` event per received increment, carrying the cumulative buffer
//! - exactly one terminal event: `task-output` on success, `task-error` otherwise

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::CompletionConfig;
use crate::events::{
    Correlation, EventStatus, StatusEmitter, StatusEvent, ICON_DONE, ICON_THINKING, TASK_ERROR,
    TASK_EXECUTE, TASK_OUTPUT,
};
use crate::llm::{ChatMessage, ChatOptions, LlmClient};
use crate::task::Task;

/// Text returned in place of an aborted completion.
pub const ABORTED_TEXT: &str = "Task aborted.";
/// Text returned in place of a failed completion.
pub const FAILED_TEXT: &str = "Failed to generate text.";

/// Result of one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success(String),
    Aborted,
    Failed(String),
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Success(_))
    }

    /// The answer, or the sentinel text standing in for it.
    pub fn text(&self) -> &str {
        match self {
            Completion::Success(text) => text,
            Completion::Aborted => ABORTED_TEXT,
            Completion::Failed(_) => FAILED_TEXT,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Completion::Success(text) => text,
            other => other.text().to_string(),
        }
    }
}

/// Calls the model with one user message.
#[derive(Clone)]
pub struct CompletionInvoker {
    llm: Arc<dyn LlmClient>,
    cancel: CancellationToken,
}

impl CompletionInvoker {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_cancellation(llm, CancellationToken::new())
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(llm: Arc<dyn LlmClient>, cancel: CancellationToken) -> Self {
        Self { llm, cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `prompt` against the configured model.
    ///
    /// With an `observer` the answer is streamed and reported as described in the
    /// module docs; without one a batch call is made and no events are emitted.
    pub async fn complete(
        &self,
        prompt: &str,
        correlation: &Correlation,
        task: &Task,
        config: &CompletionConfig,
        observer: Option<&StatusEmitter>,
    ) -> Completion {
        let messages = [ChatMessage::user(prompt)];
        let options = config.chat_options();

        let outcome = match observer {
            Some(emitter) => {
                self.guarded(self.stream_text(
                    &config.model,
                    &messages,
                    &options,
                    correlation,
                    task,
                    emitter,
                ))
                .await
            }
            None => {
                self.guarded(self.batch_text(&config.model, &messages, &options))
                    .await
            }
        };

        match &outcome {
            Completion::Success(text) => {
                tracing::debug!(task_id = %task.id(), chars = text.len(), "Completion finished");
            }
            Completion::Aborted => {
                tracing::info!(task_id = %task.id(), "Completion aborted");
            }
            Completion::Failed(reason) => {
                tracing::warn!(task_id = %task.id(), model = %config.model, "Completion failed: {}", reason);
            }
        }

        if let Some(emitter) = observer {
            emitter.emit(terminal_event(&outcome, correlation, task));
        }

        outcome
    }

    /// Race `call` against cancellation and fold its error into `Failed`.
    async fn guarded<F>(&self, call: F) -> Completion
    where
        F: std::future::Future<Output = anyhow::Result<String>>,
    {
        if self.cancel.is_cancelled() {
            return Completion::Aborted;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Completion::Aborted,
            result = call => match result {
                Ok(text) => Completion::Success(text),
                Err(e) => Completion::Failed(format!("{:#}", e)),
            },
        }
    }

    async fn batch_text(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<String> {
        let response = self.llm.chat_completion(model, messages, options).await?;
        Ok(response.content.unwrap_or_default())
    }

    async fn stream_text(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        correlation: &Correlation,
        task: &Task,
        emitter: &StatusEmitter,
    ) -> anyhow::Result<String> {
        let mut tokens = self
            .llm
            .chat_completion_stream(model, messages, options)
            .await?;

        let mut buffer = String::new();
        while let Some(piece) = tokens.next().await {
            buffer.push_str(&piece?);
            emitter.emit(
                StatusEvent::new(correlation, task, TASK_EXECUTE, buffer.clone())
                    .with_icon(ICON_THINKING),
            );
        }
        Ok(buffer)
    }
}

fn terminal_event(outcome: &Completion, correlation: &Correlation, task: &Task) -> StatusEvent {
    match outcome {
        Completion::Success(text) => StatusEvent::new(correlation, task, TASK_OUTPUT, text.clone())
            .with_icon(ICON_DONE)
            .with_status(EventStatus::Complete),
        Completion::Aborted => StatusEvent::new(correlation, task, TASK_ERROR, ABORTED_TEXT)
            .with_status(EventStatus::Aborted),
        Completion::Failed(_) => StatusEvent::new(correlation, task, TASK_ERROR, FAILED_TEXT)
            .with_status(EventStatus::Failed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SequentialIds;
    use crate::testing::{task, RecordingSink, ScriptedLlm, Script};

    fn correlation() -> Correlation {
        Correlation::root(Arc::new(SequentialIds::new("c")))
    }

    #[tokio::test]
    async fn streaming_reports_cumulative_buffer_then_one_output() {
        let llm = Arc::new(ScriptedLlm::new(vec![Script::tokens(&["Hel", "lo"])]));
        let invoker = CompletionInvoker::new(llm);
        let sink = RecordingSink::new();
        let task = task(1, "greet");

        let outcome = invoker
            .complete("say hello", &correlation(), &task, &CompletionConfig::default(), Some(&sink.emitter()))
            .await;

        assert_eq!(outcome, Completion::Success("Hello".to_string()));
        let events = sink.events();
        let summary: Vec<(&str, &str)> = events
            .iter()
            .map(|e| (e.event_type.as_str(), e.content.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TASK_EXECUTE, "Hel"),
                (TASK_EXECUTE, "Hello"),
                (TASK_OUTPUT, "Hello"),
            ]
        );
        assert_eq!(events[2].status, EventStatus::Complete);
        assert!(events.iter().all(|e| e.id == "c-1" && e.task_id == "1"));
    }

    #[tokio::test]
    async fn abort_mid_stream_resolves_to_sentinel_without_output_event() {
        let llm = Arc::new(ScriptedLlm::new(vec![Script::tokens_then_hang(&["Hel"])]));
        let invoker = CompletionInvoker::new(llm);
        let cancel = invoker.cancel_token().clone();
        let sink = RecordingSink::with_hook(move |event| {
            if event.event_type == TASK_EXECUTE {
                cancel.cancel();
            }
        });

        let outcome = invoker
            .complete("say hello", &correlation(), &task(1, "greet"), &CompletionConfig::default(), Some(&sink.emitter()))
            .await;

        assert_eq!(outcome, Completion::Aborted);
        assert_eq!(outcome.text(), "Task aborted.");
        let events = sink.events();
        assert!(events.iter().all(|e| e.event_type != TASK_OUTPUT));
        let last = events.last().unwrap();
        assert_eq!(last.event_type, TASK_ERROR);
        assert_eq!(last.status, EventStatus::Aborted);
    }

    #[tokio::test]
    async fn cancelled_before_call_never_reaches_the_model() {
        let llm = Arc::new(ScriptedLlm::new(vec![Script::text("unused")]));
        let invoker = CompletionInvoker::new(llm.clone());
        invoker.cancel_token().cancel();

        let outcome = invoker
            .complete("p", &correlation(), &task(1, "t"), &CompletionConfig::default(), None)
            .await;

        assert_eq!(outcome, Completion::Aborted);
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_becomes_failed_sentinel() {
        let llm = Arc::new(ScriptedLlm::new(vec![Script::fail("HTTP 500")]));
        let invoker = CompletionInvoker::new(llm);
        let sink = RecordingSink::new();

        let outcome = invoker
            .complete("p", &correlation(), &task(1, "t"), &CompletionConfig::default(), Some(&sink.emitter()))
            .await;

        assert!(matches!(&outcome, Completion::Failed(reason) if reason.contains("HTTP 500")));
        assert_eq!(outcome.clone().into_text(), "Failed to generate text.");
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, EventStatus::Failed);
    }

    #[tokio::test]
    async fn stream_error_after_tokens_is_a_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![Script::tokens_then_fail(&["par"], "reset")]));
        let invoker = CompletionInvoker::new(llm);
        let sink = RecordingSink::new();

        let outcome = invoker
            .complete("p", &correlation(), &task(1, "t"), &CompletionConfig::default(), Some(&sink.emitter()))
            .await;

        assert!(matches!(outcome, Completion::Failed(_)));
        let types: Vec<String> = sink.events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![TASK_EXECUTE.to_string(), TASK_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn batch_calls_emit_nothing_and_pass_model_config() {
        let llm = Arc::new(ScriptedLlm::new(vec![Script::text("\"rust async\"")]));
        let invoker = CompletionInvoker::new(llm.clone());
        let config = CompletionConfig::default().with_model("test/model");

        let outcome = invoker
            .complete("make a query", &correlation(), &task(1, "t"), &config, None)
            .await;

        assert_eq!(outcome.text(), "\"rust async\"");
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "test/model");
        assert_eq!(calls[0].options.temperature, Some(0.2));
        assert!(!calls[0].streamed);
    }

    #[test]
    fn empty_success_is_distinct_from_failure() {
        let empty = Completion::Success(String::new());
        assert!(empty.is_success());
        assert_eq!(empty.text(), "");
        assert!(!Completion::Failed("x".to_string()).is_success());
    }
}
