//! Template store — declarative reply templates and their trigger rules,
//! loaded into validated in-memory structures and swapped atomically on
//! reload.

pub mod model;
pub mod store;

pub use model::{
    IntentRule, IntentRuleDef, Rule, RuleDef, Specificity, Template, TemplateDef, TemplateFile,
};
pub use store::{TemplateSet, TemplateStore};
