//! Split policy, pipeline options and their YAML configuration.

use crate::common::PolicyError;
use crate::package::BreakMarkers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where fragment boundaries fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitMode {
    /// After every node ending with a hard page break
    #[default]
    PageBreak,
    /// After every node closing a section
    SectionBreak,
    /// After every node carrying either marker
    PageOrSectionBreak,
    /// Into `count` fragments of near-equal size
    FixedCount,
    /// At the first node of every sheet or slide unit
    SheetBoundary,
    /// Before every heading
    Heading,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitMode::PageBreak => "PAGE_BREAK",
            SplitMode::SectionBreak => "SECTION_BREAK",
            SplitMode::PageOrSectionBreak => "PAGE_OR_SECTION_BREAK",
            SplitMode::FixedCount => "FIXED_COUNT",
            SplitMode::SheetBoundary => "SHEET_BOUNDARY",
            SplitMode::Heading => "HEADING",
        }
    }

    /// Markers that end a fragment after the node carrying them.
    pub fn trailing_markers(self) -> BreakMarkers {
        match self {
            SplitMode::PageBreak => BreakMarkers::PAGE,
            SplitMode::SectionBreak => BreakMarkers::SECTION,
            SplitMode::PageOrSectionBreak => BreakMarkers::PAGE | BreakMarkers::SECTION,
            _ => BreakMarkers::empty(),
        }
    }

    #[inline]
    pub fn takes_count(self) -> bool {
        self == SplitMode::FixedCount
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recognized split options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitPolicy {
    pub mode: SplitMode,
    /// Number of fragments, for FIXED_COUNT only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Keep fragments without content nodes
    pub include_empty_fragments: bool,
}

impl SplitPolicy {
    pub fn new(mode: SplitMode) -> Self {
        Self {
            mode,
            count: None,
            include_empty_fragments: false,
        }
    }

    pub fn fixed_count(count: i64) -> Self {
        Self {
            mode: SplitMode::FixedCount,
            count: Some(count),
            include_empty_fragments: false,
        }
    }

    pub fn include_empty_fragments(mut self, include: bool) -> Self {
        self.include_empty_fragments = include;
        self
    }

    /// Reject inconsistent policies before any work starts.
    pub fn validate(&self) -> Result<(), PolicyError> {
        match (self.mode.takes_count(), self.count) {
            (true, None) => Err(PolicyError::MissingCount { mode: self.mode }),
            (true, Some(n)) if n <= 0 => Err(PolicyError::NonPositiveCount(n)),
            (false, Some(_)) => Err(PolicyError::UnexpectedCount { mode: self.mode }),
            _ => Ok(()),
        }
    }

    /// Validated fragment count of a FIXED_COUNT policy.
    pub(crate) fn fragment_count(&self) -> Option<usize> {
        self.count
            .filter(|&n| n > 0)
            .and_then(|n| usize::try_from(n).ok())
    }
}

/// How fragment failures affect the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorMode {
    /// A referential integrity failure in any fragment fails the operation
    #[default]
    Strict,
    /// Failed fragments are reported next to the ones that succeeded
    BestEffort,
}

/// Execution options of the split pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitOptions {
    /// Fragments rewritten and emitted in parallel
    pub workers: usize,
    pub error_mode: ErrorMode,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            error_mode: ErrorMode::Strict,
        }
    }
}

impl SplitOptions {
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.workers == 0 {
            return Err(PolicyError::ZeroWorkers);
        }
        Ok(())
    }
}

/// Policy and options together, as read from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub policy: SplitPolicy,
    pub options: SplitOptions,
}

impl SplitConfig {
    /// Parse and validate a YAML configuration; omitted keys take defaults.
    ///
    /// ```
    /// use docsplit::split::{SplitConfig, SplitMode};
    ///
    /// let config = SplitConfig::from_yaml_str(
    ///     "policy:\n  mode: FIXED_COUNT\n  count: 4\noptions:\n  workers: 2\n",
    /// )
    /// .unwrap();
    /// assert_eq!(config.policy.mode, SplitMode::FixedCount);
    /// assert_eq!(config.options.workers, 2);
    /// ```
    pub fn from_yaml_str(text: &str) -> Result<Self, PolicyError> {
        let config: SplitConfig =
            serde_saphyr::from_str(text).map_err(|e| PolicyError::InvalidConfig(e.to_string()))?;
        config.policy.validate()?;
        config.options.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, PolicyError> {
        serde_saphyr::to_string(self).map_err(|e| PolicyError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_count() {
        assert!(SplitPolicy::fixed_count(4).validate().is_ok());
        assert_eq!(
            SplitPolicy::fixed_count(0).validate(),
            Err(PolicyError::NonPositiveCount(0))
        );
        assert_eq!(
            SplitPolicy::new(SplitMode::FixedCount).validate(),
            Err(PolicyError::MissingCount {
                mode: SplitMode::FixedCount
            })
        );
        let mut page = SplitPolicy::new(SplitMode::PageBreak);
        page.count = Some(3);
        assert_eq!(
            page.validate(),
            Err(PolicyError::UnexpectedCount {
                mode: SplitMode::PageBreak
            })
        );
    }

    #[test]
    fn test_yaml_uses_option_names() {
        let config = SplitConfig::from_yaml_str(
            "policy:\n  mode: SECTION_BREAK\n  includeEmptyFragments: true\noptions:\n  errorMode: BEST_EFFORT\n",
        )
        .unwrap();
        assert_eq!(config.policy.mode, SplitMode::SectionBreak);
        assert!(config.policy.include_empty_fragments);
        assert_eq!(config.options.error_mode, ErrorMode::BestEffort);
        assert!(config.options.workers >= 1);
    }

    #[test]
    fn test_yaml_defaults_and_errors() {
        let config = SplitConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.policy, SplitPolicy::default());

        let err = SplitConfig::from_yaml_str("policy:\n  mode: EVERY_OTHER_LINE\n").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidConfig(_)));
        let err = SplitConfig::from_yaml_str("policy:\n  mode: FIXED_COUNT\n  count: -2\n").unwrap_err();
        assert_eq!(err, PolicyError::NonPositiveCount(-2));
        let err = SplitConfig::from_yaml_str("options:\n  workers: 0\n").unwrap_err();
        assert_eq!(err, PolicyError::ZeroWorkers);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = SplitConfig {
            policy: SplitPolicy::fixed_count(3),
            options: SplitOptions::default().workers(2),
        };
        let text = config.to_yaml_string().unwrap();
        assert!(text.contains("FIXED_COUNT"));
        assert_eq!(SplitConfig::from_yaml_str(&text).unwrap(), config);
    }
}
