//! Interaction rules: compilation, templates and the actions they run.

pub mod actions;
pub mod compile;
pub mod steering;
pub mod template;

pub use actions::ActionContext;
pub use compile::{Action, ClusterParams, CompiledRule, Condition, GroupMatcher, RuleSet, SpawnPlan};
pub use template::{Template, TemplateContext};
