use crate::events::{EventStatus, EventStyle, StatusEvent};

use super::prompts::analyst_prompt;
use super::Stage;

/// Content of the event that closes a research run.
pub const ANALYSIS_COMPLETE_TEXT: &str = "Completed analyzing results.";

/// Turn the accumulated findings into the final report.
///
/// The answer is streamed under a fresh correlation id; its text (or the
/// sentinel standing in for it) is returned as-is.
pub async fn synthesize(stage: &Stage<'_>, results: &str) -> String {
    stage.status("Analyzing results...\n");

    let output = stage.correlation.fork();
    let prompt = analyst_prompt(results, &stage.settings.language);
    let report = stage
        .invoker
        .complete(
            &prompt,
            &output,
            stage.task,
            &stage.settings.completion,
            Some(stage.emitter),
        )
        .await;

    stage.emitter.emit(
        StatusEvent::new(
            stage.correlation,
            stage.task,
            stage.task.skill().as_str(),
            ANALYSIS_COMPLETE_TEXT,
        )
        .with_title(stage.task.description())
        .with_style(EventStyle::Log)
        .with_status(EventStatus::Complete),
    );

    report.into_text()
}
