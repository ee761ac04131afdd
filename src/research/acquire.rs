//! Content acquisition: read candidate sources in order until enough of
//! them have yielded extracted information.
//!
//! Per source: `fetching -> {fetch failed, empty, extracting} -> extracted`.
//! The display index advances for every visited source; the completed count
//! only for extractions. Nothing is retried and sources are read one at a time.

use crate::completion::Completion;
use crate::util::{strip_newlines, truncate_chars};
use crate::web::{PageFetcher, SearchResult};

use super::extract::extract_relevant;
use super::Stage;

/// Appended after every extracted fragment in the results buffer.
pub const RESULT_SEPARATOR: &str = ". ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    FetchFailed(String),
    Empty,
    Extracted(Completion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVisit {
    /// 1-based position in visiting order
    pub index: usize,
    pub link: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acquisition {
    /// Extracted fragments in visiting order, each followed by [`RESULT_SEPARATOR`]
    pub results: String,
    pub completed: usize,
    pub visits: Vec<SourceVisit>,
}

pub async fn acquire_sources(
    stage: &Stage<'_>,
    fetcher: &dyn PageFetcher,
    sources: &[SearchResult],
) -> Acquisition {
    let limits = &stage.settings.limits;
    let mut acquisition = Acquisition::default();
    let mut index = 1;

    for source in sources {
        if acquisition.completed >= limits.max_sources {
            break;
        }

        stage.status(format!("{}. Reading: {} ...\n", index, source.link));

        let outcome = match fetcher.fetch(&source.link).await {
            Err(e) => {
                tracing::debug!(link = %source.link, "Skipping source: {:#}", e);
                stage.status("  - Failed to read content. Skipped. \n");
                SourceOutcome::FetchFailed(format!("{:#}", e))
            }
            Ok(content) if content.trim().is_empty() => {
                tracing::debug!(link = %source.link, "Skipping source: no content");
                stage.status("  - Content too short. Skipped. \n");
                SourceOutcome::Empty
            }
            Ok(content) => {
                stage.status(format!(
                    "  - Content reading completed. Length:{}. Now extracting relevant info...\n",
                    content.chars().count()
                ));

                let input = truncate_chars(&content, limits.extract_input_chars);
                let info = extract_relevant(stage, input).await;
                if !info.is_success() {
                    tracing::warn!(link = %source.link, "Extraction did not succeed, keeping its text");
                }

                let preview = strip_newlines(truncate_chars(info.text(), limits.preview_chars));
                stage.status(format!("  - Relevant info: {} ...\n", preview));

                acquisition.results.push_str(info.text());
                acquisition.results.push_str(RESULT_SEPARATOR);
                acquisition.completed += 1;
                SourceOutcome::Extracted(info)
            }
        };

        acquisition.visits.push(SourceVisit {
            index,
            link: source.link.clone(),
            outcome,
        });
        index += 1;
    }

    acquisition
}
