//! Heading rules and the rule engine.

mod config;
mod engine;

pub use config::{
    ExclusionRule, FontSizeConstraint, IndentRange, LevelRule, RuleConfig, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_MAX_Y, DEFAULT_MIN_Y,
};
pub use engine::{classify, Classification, Exclusion};
