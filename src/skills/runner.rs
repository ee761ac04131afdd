use std::collections::HashMap;

use crate::events::{Correlation, EventStatus, EventStyle, StatusEvent, TASK_ERROR};
use crate::task::{Task, TaskId};

use super::{SkillContext, SkillRegistry};

/// Executes one already-assigned task with its registered skill.
pub struct SkillRunner {
    registry: SkillRegistry,
    ctx: SkillContext,
}

impl SkillRunner {
    pub fn new(registry: SkillRegistry, ctx: SkillContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn context(&self) -> &SkillContext {
        &self.ctx
    }

    /// Run `task`, feeding it the outputs of its dependencies from `completed`.
    ///
    /// A task whose skill is not registered gets a status line and an empty result.
    pub async fn run_task(
        &self,
        task: &Task,
        objective: &str,
        completed: &HashMap<TaskId, String>,
    ) -> String {
        let Some(skill) = self.registry.get(task.skill()) else {
            tracing::warn!(task_id = %task.id(), skill = %task.skill(), "No skill registered for task");
            let correlation = Correlation::root(self.ctx.ids());
            self.ctx.emitter.emit(
                StatusEvent::new(
                    &correlation,
                    task,
                    TASK_ERROR,
                    format!("Skill {} is not available.", task.skill()),
                )
                .with_title(task.description())
                .with_style(EventStyle::Log)
                .with_status(EventStatus::Failed),
            );
            return String::new();
        };

        let dependent_outputs = task.dependent_outputs(completed);
        tracing::info!(
            task_id = %task.id(),
            skill = skill.name(),
            dependencies = task.dependent_task_ids().len(),
            "Running task"
        );

        let output = skill
            .execute(task, &dependent_outputs, objective, &self.ctx)
            .await;

        tracing::info!(task_id = %task.id(), chars = output.len(), "Task finished");
        output
    }
}
