//! Web research pipeline.
//!
//! ```text
//!   task + dependent outputs
//!            │
//!            ▼
//!   derive query (batch model call) ──► search ──► simplify
//!                                                    │
//!            ┌───────────────────────────────────────┘
//!            ▼
//!   for each source, until the success budget is spent:
//!       fetch ──► skip (failed / empty) | extract (batch model call)
//!            │
//!            ▼
//!   synthesize (streamed model call) ──► final text
//! ```
//!
//! Each stage reports progress as log-styled status events on the run's
//! correlation id. Nothing here returns an error: failures become status
//! lines and sentinel text.

mod acquire;
mod extract;
pub mod prompts;
mod query;
mod synthesize;

pub use acquire::{acquire_sources, Acquisition, SourceOutcome, SourceVisit, RESULT_SEPARATOR};
pub use extract::extract_relevant;
pub use query::{clean_query, derive_query, search_sources, SearchOutcome, SEARCH_FAILED_TEXT};
pub use synthesize::{synthesize, ANALYSIS_COMPLETE_TEXT};

use std::sync::Arc;

use crate::completion::CompletionInvoker;
use crate::config::ResearchSettings;
use crate::events::{
    Correlation, EventStyle, IdSource, StatusEmitter, StatusEvent, UuidIds, ICON_SEARCH,
};
use crate::task::Task;
use crate::web::{DefaultSimplifier, PageFetcher, ResultSimplifier, SearchProvider};

/// Everything a stage needs to call the model and report progress for one run.
pub struct Stage<'a> {
    pub invoker: &'a CompletionInvoker,
    pub emitter: &'a StatusEmitter,
    pub correlation: &'a Correlation,
    pub task: &'a Task,
    pub objective: &'a str,
    pub settings: &'a ResearchSettings,
}

impl Stage<'_> {
    /// Emit a search-status line for the run.
    pub fn status(&self, content: impl Into<String>) {
        self.emitter.emit(
            StatusEvent::new(self.correlation, self.task, self.task.skill().as_str(), content)
                .with_icon(ICON_SEARCH)
                .with_title(self.task.description())
                .with_style(EventStyle::Log),
        );
    }
}

/// The web research skill's pipeline and its collaborators.
#[derive(Clone)]
pub struct WebResearch {
    invoker: CompletionInvoker,
    search: Arc<dyn SearchProvider>,
    simplifier: Arc<dyn ResultSimplifier>,
    fetcher: Arc<dyn PageFetcher>,
    ids: Arc<dyn IdSource>,
}

impl WebResearch {
    pub fn new(
        invoker: CompletionInvoker,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            invoker,
            search,
            simplifier: Arc::new(DefaultSimplifier),
            fetcher,
            ids: Arc::new(UuidIds),
        }
    }

    pub fn with_simplifier(mut self, simplifier: Arc<dyn ResultSimplifier>) -> Self {
        self.simplifier = simplifier;
        self
    }

    /// Mint correlation ids from `ids` instead of random UUIDs.
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn invoker(&self) -> &CompletionInvoker {
        &self.invoker
    }

    /// Research `task` on the web and return the synthesized report.
    ///
    /// Always resolves to text: a failed search still reaches synthesis with
    /// no findings, and model failures surface as sentinel text.
    pub async fn run(
        &self,
        objective: &str,
        task: &Task,
        dependent_outputs: &str,
        emitter: &StatusEmitter,
        settings: &ResearchSettings,
    ) -> String {
        let emitter = emitter.clone().verbose(emitter.is_verbose() || settings.verbose);
        let correlation = Correlation::root(Arc::clone(&self.ids));
        let stage = Stage {
            invoker: &self.invoker,
            emitter: &emitter,
            correlation: &correlation,
            task,
            objective,
            settings,
        };

        tracing::info!(
            task_id = %task.id(),
            correlation_id = %correlation.id(),
            search = self.search.name(),
            "Starting web research"
        );

        let query = derive_query(&stage, dependent_outputs).await;
        stage.status(format!("Search query: {}\n", query));

        let sources = match search_sources(self.search.as_ref(), self.simplifier.as_ref(), &query).await {
            SearchOutcome::Found(sources) => {
                stage.status("✅ Completed search. \nNow reading content.\n");
                sources
            }
            SearchOutcome::Failed(reason) => {
                tracing::warn!(task_id = %task.id(), query = %query, "Search failed: {}", reason);
                stage.status(format!("{}\n", SEARCH_FAILED_TEXT));
                Vec::new()
            }
        };

        let acquisition = acquire_sources(&stage, self.fetcher.as_ref(), &sources).await;
        tracing::info!(
            task_id = %task.id(),
            visited = acquisition.visits.len(),
            completed = acquisition.completed,
            "Finished reading sources"
        );

        synthesize(&stage, &acquisition.results).await
    }
}
