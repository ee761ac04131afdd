use crate::completion::Completion;
use crate::util::{strip_wrapping_quotes, truncate_chars};
use crate::web::{ResultSimplifier, SearchProvider, SearchResult};

use super::prompts::search_query_prompt;
use super::Stage;

/// Status line reported when the search stage produced no sources.
pub const SEARCH_FAILED_TEXT: &str = "Failed to search.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<SearchResult>),
    Failed(String),
}

/// Normalize a model-generated query: trim, then drop one pair of wrapping quotes.
pub fn clean_query(raw: &str) -> String {
    strip_wrapping_quotes(raw.trim()).trim().to_string()
}

/// Ask the model for a search query for the stage's task.
///
/// Only a prefix of `dependent_outputs` is sent. If the model fails or
/// answers with nothing, the task description is used as the query.
pub async fn derive_query(stage: &Stage<'_>, dependent_outputs: &str) -> String {
    let context = truncate_chars(dependent_outputs, stage.settings.limits.query_context_chars);
    let prompt = search_query_prompt(stage.task.description(), context);

    let outcome = stage
        .invoker
        .complete(&prompt, stage.correlation, stage.task, &stage.settings.completion, None)
        .await;

    let query = match outcome {
        Completion::Success(text) => clean_query(&text),
        Completion::Aborted | Completion::Failed(_) => String::new(),
    };

    if query.is_empty() {
        tracing::warn!(task_id = %stage.task.id(), "No search query from model, using task description");
        return stage.task.description().to_string();
    }
    query
}

/// Run the query once against `provider` and simplify the results.
///
/// Provider errors and empty result lists are both `Failed`; nothing is retried.
pub async fn search_sources(
    provider: &dyn SearchProvider,
    simplifier: &dyn ResultSimplifier,
    query: &str,
) -> SearchOutcome {
    let raw = match provider.search(query).await {
        Ok(raw) => raw,
        Err(e) => return SearchOutcome::Failed(format!("{:#}", e)),
    };
    tracing::debug!(provider = provider.name(), results = raw.len(), "Search returned");

    let sources = simplifier.simplify(raw);
    if sources.is_empty() {
        return SearchOutcome::Failed("no usable results".to_string());
    }
    SearchOutcome::Found(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::completion::CompletionInvoker;
    use crate::config::ResearchSettings;
    use crate::events::{Correlation, StatusEmitter};
    use crate::testing::{task, Script, ScriptedLlm, StaticSearch};
    use crate::web::DefaultSimplifier;

    #[test]
    fn query_cleaning_strips_one_pair_of_quotes() {
        assert_eq!(clean_query("\"climate change 2024\""), "climate change 2024");
        assert_eq!(clean_query("\"\"nested\"\""), "\"nested\"");
        assert_eq!(clean_query("say \"hi\" twice"), "say \"hi\" twice");
        assert_eq!(clean_query("  \"rust async\"\n"), "rust async");
        assert_eq!(clean_query("\"unbalanced"), "unbalanced");
    }

    async fn derive_with(script: Script, dependent: &str) -> (String, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(vec![script]));
        let invoker = CompletionInvoker::new(llm.clone());
        let emitter = StatusEmitter::silent();
        let correlation = Correlation::random();
        let task = task(3, "latest rust release");
        let settings = ResearchSettings::default();
        let stage = Stage {
            invoker: &invoker,
            emitter: &emitter,
            correlation: &correlation,
            task: &task,
            objective: "track rust",
            settings: &settings,
        };
        (derive_query(&stage, dependent).await, llm)
    }

    #[tokio::test]
    async fn derived_query_is_cleaned_and_batch() {
        let (query, llm) = derive_with(Script::text("\"rust 1.80 release\"\n"), "").await;
        assert_eq!(query, "rust 1.80 release");
        assert!(!llm.calls()[0].streamed);
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_task_description() {
        let (query, _) = derive_with(Script::fail("HTTP 500"), "").await;
        assert_eq!(query, "latest rust release");

        let (query, _) = derive_with(Script::text("\"\""), "").await;
        assert_eq!(query, "latest rust release");
    }

    #[tokio::test]
    async fn dependent_output_is_bounded() {
        let long = "x".repeat(5000);
        let (_, llm) = derive_with(Script::text("q"), &long).await;
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains(&"x".repeat(3500)));
        assert!(!prompt.contains(&"x".repeat(3501)));
    }

    #[tokio::test]
    async fn empty_or_failed_search_is_a_failure() {
        let empty = StaticSearch::links(&["mailto:someone@example.com"]);
        assert!(matches!(
            search_sources(&empty, &DefaultSimplifier, "q").await,
            SearchOutcome::Failed(_)
        ));

        let failing = StaticSearch::failing("quota exceeded");
        match search_sources(&failing, &DefaultSimplifier, "q").await {
            SearchOutcome::Failed(reason) => assert!(reason.contains("quota exceeded")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let found = StaticSearch::links(&["https://a.example/", "https://b.example/"]);
        match search_sources(&found, &DefaultSimplifier, "rust").await {
            SearchOutcome::Found(sources) => assert_eq!(sources.len(), 2),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(found.queries(), vec!["rust".to_string()]);
    }
}
