//! Core Task type: one already-assigned unit of an agent's plan.
//!
//! # Invariants
//! - `description` is non-empty
//! - a task never lists itself among its dependencies
//! - tasks are immutable once constructed; skills receive them by reference

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a task within a plan.
///
/// Plans number their tasks, so the id is a plain integer rather than a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The skill a task invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    /// Free-text completion over the objective and dependent outputs
    TextCompletion,
    /// Search, read, extract and synthesize
    WebSearch,
}

impl SkillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillKind::TextCompletion => "text_completion",
            SkillKind::WebSearch => "web_search",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text_completion" => Ok(SkillKind::TextCompletion),
            "web_search" | "web_research" => Ok(SkillKind::WebSearch),
            other => Err(TaskError::UnknownSkill(other.to_string())),
        }
    }
}

/// A task to be executed by a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,

    /// Human-readable description of what to accomplish
    description: String,

    skill: SkillKind,

    /// Tasks whose outputs feed this one, in plan order
    #[serde(default)]
    dependent_task_ids: Vec<TaskId>,
}

impl Task {
    /// Create a task with no dependencies.
    ///
    /// # Errors
    /// Returns `TaskError::EmptyDescription` for a blank description.
    pub fn new(id: TaskId, description: impl Into<String>, skill: SkillKind) -> Result<Self, TaskError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(TaskError::EmptyDescription);
        }

        Ok(Self {
            id,
            description,
            skill,
            dependent_task_ids: Vec::new(),
        })
    }

    /// Declare the tasks whose outputs this task consumes.
    pub fn with_dependencies(mut self, ids: Vec<TaskId>) -> Result<Self, TaskError> {
        if ids.contains(&self.id) {
            return Err(TaskError::SelfDependency(self.id));
        }
        self.dependent_task_ids = ids;
        Ok(self)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn skill(&self) -> SkillKind {
        self.skill
    }

    pub fn dependent_task_ids(&self) -> &[TaskId] {
        &self.dependent_task_ids
    }

    /// Concatenate the outputs of this task's dependencies, in declaration order.
    ///
    /// Dependencies that have not produced output yet are skipped.
    pub fn dependent_outputs(&self, completed: &HashMap<TaskId, String>) -> String {
        self.dependent_task_ids
            .iter()
            .filter_map(|id| completed.get(id).map(|output| (id, output)))
            .map(|(id, output)| format!("Task {} output: {}", id, output.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Errors that can occur when building tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task description cannot be empty")]
    EmptyDescription,

    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_description_is_rejected() {
        assert_eq!(
            Task::new(TaskId::new(1), "   ", SkillKind::WebSearch).unwrap_err(),
            TaskError::EmptyDescription
        );
    }

    #[test]
    fn self_dependency_is_rejected() {
        let task = Task::new(TaskId::new(2), "summarize", SkillKind::TextCompletion).unwrap();
        let err = task.with_dependencies(vec![TaskId::new(1), TaskId::new(2)]).unwrap_err();
        assert_eq!(err, TaskError::SelfDependency(TaskId::new(2)));
    }

    #[test]
    fn dependent_outputs_follow_declaration_order() {
        let task = Task::new(TaskId::new(3), "write report", SkillKind::TextCompletion)
            .unwrap()
            .with_dependencies(vec![TaskId::new(2), TaskId::new(1), TaskId::new(9)])
            .unwrap();

        let mut completed = HashMap::new();
        completed.insert(TaskId::new(1), "first\n".to_string());
        completed.insert(TaskId::new(2), "second".to_string());

        assert_eq!(
            task.dependent_outputs(&completed),
            "Task 2 output: second\nTask 1 output: first"
        );
    }

    #[test]
    fn skill_names_round_trip_through_strings() {
        assert_eq!("web_search".parse::<SkillKind>().unwrap(), SkillKind::WebSearch);
        assert_eq!(SkillKind::TextCompletion.to_string(), "text_completion");
        assert!(matches!(
            "image_gen".parse::<SkillKind>(),
            Err(TaskError::UnknownSkill(name)) if name == "image_gen"
        ));
        assert_eq!(
            serde_json::to_value(SkillKind::WebSearch).unwrap(),
            serde_json::json!("web_search")
        );
    }
}
