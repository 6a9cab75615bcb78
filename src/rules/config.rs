//! Rule configuration.
//!
//! A configuration holds one global [`ExclusionRule`] and any number of
//! per-level [`LevelRule`]s keyed by level number. It is usually loaded from a
//! JSON document of the form:
//!
//! ```json
//! {
//!   "exclusion": { "max_line_length": 40, "exclude_chars": ["。"], "min_y_coord": 50 },
//!   "level1": { "regex": "第[一二三四五六七八九十百]+章", "font_size": 15.0, "is_bold": true },
//!   "level2": { "regex": "\\d+\\.\\d+", "font_size": [13.9, 14.1], "indent_range": [50, 90] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default maximum heading length, in characters.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 999;
/// Default lower edge of the keep-band.
pub const DEFAULT_MIN_Y: f32 = 0.0;
/// Default upper edge of the keep-band.
pub const DEFAULT_MAX_Y: f32 = 9999.0;

/// Font size predicate of a level rule.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FontSizeConstraint {
    /// No constraint
    #[default]
    Any,
    /// `size >= min`
    AtLeast(f32),
    /// `min <= size <= max`
    Between(f32, f32),
}

impl FontSizeConstraint {
    /// Lower-bound constraint; a zero bound means no constraint.
    pub fn at_least(min: f32) -> Self {
        if min == 0.0 {
            Self::Any
        } else {
            Self::AtLeast(min)
        }
    }

    /// Check a (rounded) font size against this constraint.
    pub fn accepts(&self, size: f32) -> bool {
        match *self {
            Self::Any => true,
            Self::AtLeast(min) => size >= min,
            Self::Between(min, max) => min <= size && size <= max,
        }
    }

    /// Whether the constraint restricts anything.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Any)
    }
}

/// Closed interval on a line's left edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndentRange {
    pub min: f32,
    pub max: f32,
}

impl IndentRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, x0: f32) -> bool {
        self.min <= x0 && x0 <= self.max
    }
}

/// Predicates a line must satisfy to be a heading at one level.
///
/// Every field has an explicit "absent" state; absent predicates hold vacuously.
/// A rule with all predicates absent is inactive and never matches.
#[derive(Debug, Clone, Default)]
pub struct LevelRule {
    /// Prefix-anchored pattern, with its source text
    regex: Option<(String, Regex)>,
    /// Substrings of which at least one must occur in the font name
    pub font_contains: Vec<String>,
    /// Font size predicate
    pub font_size: FontSizeConstraint,
    /// Required bold flag
    pub is_bold: Option<bool>,
    /// Allowed range of the left edge
    pub indent_range: Option<IndentRange>,
}

impl LevelRule {
    /// Create an empty (inactive) rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heading pattern. It only needs to match a prefix of the line.
    ///
    /// An empty pattern clears the predicate.
    pub fn with_regex(mut self, pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            self.regex = None;
            return Ok(self);
        }
        let anchored = Regex::new(&format!("^(?:{})", pattern))?;
        self.regex = Some((pattern.to_string(), anchored));
        Ok(self)
    }

    /// Require one of these substrings in the font name.
    pub fn with_font_contains<I, S>(mut self, fonts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.font_contains = fonts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the font size predicate.
    pub fn with_font_size(mut self, constraint: FontSizeConstraint) -> Self {
        self.font_size = constraint;
        self
    }

    /// Require the bold flag to equal `bold`.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.is_bold = Some(bold);
        self
    }

    /// Restrict the left edge to `[min, max]`.
    pub fn with_indent(mut self, min: f32, max: f32) -> Self {
        self.indent_range = Some(IndentRange::new(min, max));
        self
    }

    /// The anchored pattern, if any.
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref().map(|(_, re)| re)
    }

    /// The pattern as written in the configuration.
    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(|(src, _)| src.as_str())
    }

    /// A rule is active when at least one predicate is present.
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
            || !self.font_contains.is_empty()
            || self.font_size.is_present()
            || self.is_bold.is_some()
            || self.indent_range.is_some()
    }
}

/// Global filter applied before any level rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionRule {
    /// Lines with more characters than this are never headings
    pub max_line_length: usize,
    /// Lines containing any of these are never headings
    pub exclude_chars: Vec<String>,
    /// Lower edge of the keep-band
    pub min_y: f32,
    /// Upper edge of the keep-band
    pub max_y: f32,
}

impl Default for ExclusionRule {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            exclude_chars: Vec::new(),
            min_y: DEFAULT_MIN_Y,
            max_y: DEFAULT_MAX_Y,
        }
    }
}

impl ExclusionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn with_exclude_chars<I, S>(mut self, chars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_chars = chars.into_iter().map(Into::into).collect();
        self
    }

    /// Keep only lines whose top edge lies in `[min_y, max_y]`.
    pub fn with_y_band(mut self, min_y: f32, max_y: f32) -> Self {
        self.min_y = min_y;
        self.max_y = max_y;
        self
    }
}

/// Complete rule set: exclusion filter plus level rules ordered by level number.
#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    pub exclusion: ExclusionRule,
    levels: BTreeMap<u32, LevelRule>,
}

impl RuleConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the exclusion rule.
    pub fn with_exclusion(mut self, exclusion: ExclusionRule) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Set the rule for `level` (1-based).
    pub fn with_level(mut self, level: u32, rule: LevelRule) -> Result<Self> {
        if level == 0 {
            return Err(Error::InvalidConfig("levels start at 1".to_string()));
        }
        self.levels.insert(level, rule);
        Ok(self)
    }

    /// Level rules in ascending level order.
    pub fn levels(&self) -> impl Iterator<Item = (u32, &LevelRule)> {
        self.levels.iter().map(|(level, rule)| (*level, rule))
    }

    /// Number of configured levels, active or not.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of levels that can match anything.
    pub fn active_level_count(&self) -> usize {
        self.levels.values().filter(|r| r.is_active()).count()
    }

    /// Parse a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        raw.into_config()
    }

    /// Load a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// ---------------------------------------------------------------------------
// JSON shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    exclusion: Option<RawExclusion>,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExclusion {
    max_line_length: Option<usize>,
    exclude_chars: Option<RawChars>,
    min_y_coord: Option<f32>,
    max_y_coord: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChars {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawLevelRule {
    regex: Option<String>,
    font_contains: Option<Vec<String>>,
    font_size: Option<RawFontSize>,
    is_bold: Option<bool>,
    indent_range: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFontSize {
    Value(f32),
    Range(Vec<f32>),
}

impl RawConfig {
    fn into_config(self) -> Result<RuleConfig> {
        let mut config = RuleConfig::new();

        if let Some(ex) = self.exclusion {
            config.exclusion = ex.into_rule();
        }

        let mut seen: BTreeMap<u32, String> = BTreeMap::new();
        for (key, value) in self.rest {
            let Some(suffix) = key.strip_prefix("level") else {
                log::warn!("Ignoring unknown configuration key '{}'", key);
                continue;
            };
            let level: u32 = suffix
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("bad level key '{}'", key)))?;
            if let Some(previous) = seen.insert(level, key.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "'{}' and '{}' both define level {}",
                    previous, key, level
                )));
            }
            let raw: RawLevelRule = serde_json::from_value(value)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", key, e)))?;
            let rule = raw
                .into_rule()
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", key, strip_prefix(&e))))?;
            config = config
                .with_level(level, rule)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", key, strip_prefix(&e))))?;
        }

        Ok(config)
    }
}

/// Message of a nested config error without its "Invalid rule configuration" prefix.
fn strip_prefix(err: &Error) -> String {
    match err {
        Error::InvalidConfig(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl RawExclusion {
    fn into_rule(self) -> ExclusionRule {
        let exclude_chars = match self.exclude_chars {
            Some(RawChars::List(list)) => list,
            Some(RawChars::Joined(s)) => s.chars().map(String::from).collect(),
            None => Vec::new(),
        };
        ExclusionRule {
            max_line_length: self.max_line_length.unwrap_or(DEFAULT_MAX_LINE_LENGTH),
            exclude_chars,
            min_y: self.min_y_coord.unwrap_or(DEFAULT_MIN_Y),
            max_y: self.max_y_coord.unwrap_or(DEFAULT_MAX_Y),
        }
    }
}

impl RawLevelRule {
    fn into_rule(self) -> Result<LevelRule> {
        let mut rule = LevelRule::new();

        if let Some(pattern) = self.regex {
            rule = rule.with_regex(&pattern)?;
        }
        if let Some(fonts) = self.font_contains {
            rule = rule.with_font_contains(fonts);
        }
        rule.font_size = match self.font_size {
            None => FontSizeConstraint::Any,
            Some(RawFontSize::Value(v)) => FontSizeConstraint::at_least(v),
            Some(RawFontSize::Range(r)) => match r.as_slice() {
                [] => FontSizeConstraint::Any,
                [min, max] => FontSizeConstraint::Between(*min, *max),
                _ => {
                    return Err(Error::InvalidConfig(format!(
                        "font_size range needs exactly 2 values, got {}",
                        r.len()
                    )))
                }
            },
        };
        rule.is_bold = self.is_bold;
        rule.indent_range = match self.indent_range.as_deref() {
            None | Some([]) => None,
            Some([min, max]) => Some(IndentRange::new(*min, *max)),
            Some(other) => {
                return Err(Error::InvalidConfig(format!(
                    "indent_range needs exactly 2 values, got {}",
                    other.len()
                )))
            }
        };

        Ok(rule)
    }
}
