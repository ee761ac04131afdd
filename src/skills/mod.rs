//! Skills: the capabilities a task can invoke.
//!
//! Each task names one [`SkillKind`]; the [`SkillRegistry`] maps it to an
//! implementation and the [`SkillRunner`] executes one already-assigned task.
//! Skills always resolve to text. A skill whose required API keys are not
//! configured returns an empty string without calling anything.

mod runner;
mod text_completion;
mod web_research;

pub use runner::SkillRunner;
pub use text_completion::TextCompletionSkill;
pub use web_research::WebResearchSkill;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, ResearchSettings};
use crate::events::{IdSource, StatusEmitter, UuidIds};
use crate::research::WebResearch;
use crate::task::{SkillKind, Task};

/// API key name for the model provider.
pub const OPENROUTER_KEY: &str = "openrouter";
/// API key name for Tavily search.
pub const TAVILY_KEY: &str = "tavily";

/// Per-run inputs shared by every skill.
#[derive(Clone)]
pub struct SkillContext {
    pub emitter: StatusEmitter,
    pub settings: ResearchSettings,
    api_keys: HashSet<String>,
    ids: Arc<dyn IdSource>,
}

impl SkillContext {
    pub fn new(emitter: StatusEmitter, settings: ResearchSettings) -> Self {
        let verbose = emitter.is_verbose() || settings.verbose;
        Self {
            emitter: emitter.verbose(verbose),
            settings,
            api_keys: HashSet::new(),
            ids: Arc::new(UuidIds),
        }
    }

    /// Context with the API keys present in `config`.
    pub fn from_config(config: &Config, emitter: StatusEmitter) -> Self {
        let mut ctx = Self::new(emitter, config.research.clone());
        if !config.api_key.is_empty() {
            ctx = ctx.with_api_key(OPENROUTER_KEY);
        }
        if config.tavily_api_key.is_some() {
            ctx = ctx.with_api_key(TAVILY_KEY);
        }
        ctx
    }

    /// Mark an API key as configured.
    pub fn with_api_key(mut self, name: &str) -> Self {
        self.api_keys.insert(name.to_string());
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn has_api_key(&self, name: &str) -> bool {
        self.api_keys.contains(name)
    }

    pub fn ids(&self) -> Arc<dyn IdSource> {
        Arc::clone(&self.ids)
    }
}

/// Information about a skill for display purposes.
#[derive(Debug, Clone)]
pub struct SkillInfo {
    pub name: String,
    pub description: String,
}

#[async_trait]
pub trait Skill: Send + Sync {
    fn kind(&self) -> SkillKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn description(&self) -> &str;

    /// Names of the API keys this skill needs.
    fn api_keys_required(&self) -> &[&'static str] {
        &[]
    }

    fn is_valid(&self, ctx: &SkillContext) -> bool {
        self.api_keys_required()
            .iter()
            .all(|key| ctx.has_api_key(key))
    }

    /// Execute `task`. Never fails: problems are reported through the
    /// context's emitter and as sentinel text.
    async fn execute(
        &self,
        task: &Task,
        dependent_outputs: &str,
        objective: &str,
        ctx: &SkillContext,
    ) -> String;
}

/// Registry of available skills.
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<SkillKind, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text completion and web research sharing one model invoker.
    pub fn with_defaults(research: WebResearch) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextCompletionSkill::new(research.invoker().clone())));
        registry.register(Arc::new(WebResearchSkill::new(research)));
        tracing::debug!("Skill registry ready with {} skills", registry.skills.len());
        registry
    }

    /// Add a skill, replacing any skill of the same kind.
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        self.skills.insert(skill.kind(), skill);
    }

    pub fn get(&self, kind: SkillKind) -> Option<Arc<dyn Skill>> {
        self.skills.get(&kind).cloned()
    }

    pub fn has_skill(&self, kind: SkillKind) -> bool {
        self.skills.contains_key(&kind)
    }

    /// List all registered skills, sorted by name.
    pub fn list_skills(&self) -> Vec<SkillInfo> {
        let mut skills: Vec<SkillInfo> = self
            .skills
            .values()
            .map(|s| SkillInfo {
                name: s.name().to_string(),
                description: s.description().to_string(),
            })
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }
}
