//! Task module - the unit of work a skill executes.
//!
//! Tasks are created by the planning framework and only read here.

pub mod task;

pub use task::{SkillKind, Task, TaskError, TaskId};
