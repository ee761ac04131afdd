//! # Research Agent
//!
//! Skill execution for an autonomous task agent.
//!
//! This library provides:
//! - A completion invoker with token streaming, cancellation and tagged outcomes
//! - A web research pipeline: query derivation, search, bounded source reading,
//!   per-source extraction and a streamed final report
//! - Status events that keep an observer informed while a task runs
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │           SkillRunner            │
//!        │  (one assigned task at a time)   │
//!        └────────────────┬─────────────────┘
//!                         │
//!            ┌────────────┴────────────┐
//!            ▼                         ▼
//!   ┌─────────────────┐     ┌─────────────────────┐
//!   │ TextCompletion  │     │    WebResearch      │
//!   │     Skill       │     │ search → read → ... │
//!   └────────┬────────┘     └──────────┬──────────┘
//!            └────────────┬────────────┘
//!                         ▼
//!               ┌───────────────────┐
//!               │ CompletionInvoker │──► LlmClient (OpenRouter)
//!               └───────────────────┘
//! ```
//!
//! ## Modules
//! - `completion`: single-prompt model calls resolving to `Completion`
//! - `research`: the web research pipeline and its prompts
//! - `skills`: skill trait, registry and runner
//! - `events`: status events, sinks and correlation ids
//! - `web`: search providers, result simplification, page fetching
//! - `llm`: LLM client abstraction and OpenRouter implementation

pub mod completion;
pub mod config;
pub mod events;
pub mod llm;
pub mod research;
pub mod skills;
pub mod task;
pub mod util;
pub mod web;

#[cfg(test)]
mod testing;

pub use completion::{Completion, CompletionInvoker};
pub use config::Config;
pub use research::WebResearch;
pub use skills::{SkillContext, SkillRegistry, SkillRunner};
