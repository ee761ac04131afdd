use async_trait::async_trait;

use crate::completion::CompletionInvoker;
use crate::events::Correlation;
use crate::research::prompts::text_completion_prompt;
use crate::task::{SkillKind, Task};

use super::{Skill, SkillContext, OPENROUTER_KEY};

/// Generates, summarizes or analyzes text from the objective and the
/// outputs of dependent tasks. The answer is streamed to the context's emitter.
pub struct TextCompletionSkill {
    invoker: CompletionInvoker,
}

impl TextCompletionSkill {
    pub fn new(invoker: CompletionInvoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl Skill for TextCompletionSkill {
    fn kind(&self) -> SkillKind {
        SkillKind::TextCompletion
    }

    fn description(&self) -> &str {
        "Uses a chat completion model to generate, summarize, and/or analyze text and code."
    }

    fn api_keys_required(&self) -> &[&'static str] {
        &[OPENROUTER_KEY]
    }

    async fn execute(
        &self,
        task: &Task,
        dependent_outputs: &str,
        objective: &str,
        ctx: &SkillContext,
    ) -> String {
        if !self.is_valid(ctx) {
            tracing::warn!(task_id = %task.id(), "Text completion skipped: API key not configured");
            return String::new();
        }

        let prompt = text_completion_prompt(objective, task.description(), dependent_outputs);
        let correlation = Correlation::root(ctx.ids());
        self.invoker
            .complete(
                &prompt,
                &correlation,
                task,
                &ctx.settings.completion,
                Some(&ctx.emitter),
            )
            .await
            .into_text()
    }
}
