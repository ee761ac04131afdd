use async_trait::async_trait;

use crate::research::WebResearch;
use crate::task::{SkillKind, Task};

use super::{Skill, SkillContext, OPENROUTER_KEY};

/// Searches the web for the task, reads the best sources and reports on them.
pub struct WebResearchSkill {
    research: WebResearch,
}

impl WebResearchSkill {
    pub fn new(research: WebResearch) -> Self {
        Self { research }
    }
}

#[async_trait]
impl Skill for WebResearchSkill {
    fn kind(&self) -> SkillKind {
        SkillKind::WebSearch
    }

    fn description(&self) -> &str {
        "Searches the web for the task, extracts relevant information from the top sources, and writes a report."
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
            tracing::warn!(task_id = %task.id(), "Web research skipped: API key not configured");
            return String::new();
        }

        self.research
            .clone()
            .with_ids(ctx.ids())
            .run(objective, task, dependent_outputs, &ctx.emitter, &ctx.settings)
            .await
    }
}
