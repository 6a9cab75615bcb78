//! Line classification.

use crate::model::LineRecord;

use super::config::{ExclusionRule, LevelRule, RuleConfig};

/// A line recognized as a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Level of the first matching rule
    pub level: u32,
    /// Full trimmed line text
    pub title: String,
}

/// Why a line is kept out of the outline by the exclusion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// More characters than `max_line_length`
    TooLong,
    /// Contains one of `exclude_chars`
    ExcludedChar,
    /// Top edge outside `[min_y, max_y]`
    OutsideBand,
}

impl ExclusionRule {
    /// Check a line against the exclusion rule.
    ///
    /// The y-band is a keep-band: lines are kept only when `min_y <= y0 <= max_y`.
    pub fn check(&self, line: &LineRecord) -> Option<Exclusion> {
        if line.text.chars().count() > self.max_line_length {
            return Some(Exclusion::TooLong);
        }
        if self
            .exclude_chars
            .iter()
            .any(|c| !c.is_empty() && line.text.contains(c.as_str()))
        {
            return Some(Exclusion::ExcludedChar);
        }
        if line.y0 < self.min_y || line.y0 > self.max_y {
            return Some(Exclusion::OutsideBand);
        }
        None
    }
}

impl LevelRule {
    /// Check every present predicate against the line.
    ///
    /// Inactive rules never match.
    pub fn matches(&self, line: &LineRecord) -> bool {
        if !self.is_active() {
            return false;
        }

        let regex_ok = self.regex().map_or(true, |re| re.is_match(&line.text));
        let font_ok = self.font_contains.is_empty()
            || self
                .font_contains
                .iter()
                .any(|f| line.font_name.contains(f.as_str()));
        let size_ok = self.font_size.accepts(line.font_size);
        let bold_ok = self.is_bold.map_or(true, |b| b == line.is_bold);
        let indent_ok = self.indent_range.map_or(true, |r| r.contains(line.x0));

        regex_ok && font_ok && size_ok && bold_ok && indent_ok
    }
}

/// Classify one line.
///
/// Exclusions short-circuit. Otherwise levels are tried from the lowest
/// number up and the first active rule that matches wins.
pub fn classify(line: &LineRecord, config: &RuleConfig) -> Option<Classification> {
    if let Some(reason) = config.exclusion.check(line) {
        log::trace!("Excluded ({:?}): {}", reason, line.text);
        return None;
    }

    for (level, rule) in config.levels() {
        if rule.matches(line) {
            return Some(Classification {
                level,
                title: line.text.clone(),
            });
        }
    }

    None
}
