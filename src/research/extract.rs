use crate::completion::Completion;
use crate::util::chunk_chars;

use super::prompts::extraction_prompt;
use super::Stage;

/// Extract the parts of `content` relevant to the stage's objective and task.
///
/// Content longer than the configured chunk size is processed chunk by
/// chunk, each call refining the notes of the previous one. Calls are batch
/// and never retried. If a later chunk fails, the notes gathered so far are
/// kept; an abort always wins.
pub async fn extract_relevant(stage: &Stage<'_>, content: &str) -> Completion {
    let chunks = chunk_chars(content, stage.settings.limits.extract_chunk_chars);
    let total = chunks.len();
    let mut notes = String::new();

    for (i, chunk) in chunks.into_iter().enumerate() {
        if total > 1 {
            stage.status(format!("  - Extracting part {}/{}\n", i + 1, total));
        }

        let prompt = extraction_prompt(stage.objective, stage.task.description(), chunk, &notes);
        let outcome = stage
            .invoker
            .complete(&prompt, stage.correlation, stage.task, &stage.settings.completion, None)
            .await;

        match outcome {
            Completion::Success(text) => notes = text.trim().to_string(),
            Completion::Aborted => return Completion::Aborted,
            failed @ Completion::Failed(_) if notes.is_empty() => return failed,
            Completion::Failed(reason) => {
                tracing::warn!(
                    task_id = %stage.task.id(),
                    chunk = i + 1,
                    "Extraction failed, keeping earlier notes: {}",
                    reason
                );
                break;
            }
        }
    }

    Completion::Success(notes)
}
