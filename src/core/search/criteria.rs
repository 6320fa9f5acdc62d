use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::validation;

// ============================================================================
// Line-count comparison
// ============================================================================

/// Comparison applied between a file's line count and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "lt" | "<" => Ok(Comparison::Lt),
            "le" | "<=" => Ok(Comparison::Le),
            "eq" | "==" | "=" => Ok(Comparison::Eq),
            "ge" | ">=" => Ok(Comparison::Ge),
            "gt" | ">" => Ok(Comparison::Gt),
            other => Err(Error::validation_invalid_argument(
                "comparison",
                format!("Unknown comparison '{}'. Use: lt, le, eq, ge, gt", other),
                None,
                None,
            )),
        }
    }
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "lt",
            Comparison::Le => "le",
            Comparison::Eq => "eq",
            Comparison::Ge => "ge",
            Comparison::Gt => "gt",
        }
    }

    pub fn holds(&self, lines: usize, threshold: i64) -> bool {
        let lines = lines as i64;
        match self {
            Comparison::Lt => lines < threshold,
            Comparison::Le => lines <= threshold,
            Comparison::Eq => lines == threshold,
            Comparison::Ge => lines >= threshold,
            Comparison::Gt => lines > threshold,
        }
    }
}

/// Line-count predicate. A negative threshold disables the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCountFilter {
    pub comparison: Comparison,
    pub threshold: i64,
}

impl LineCountFilter {
    pub fn new(comparison: Comparison, threshold: i64) -> Self {
        Self {
            comparison,
            threshold,
        }
    }

    /// Build a filter from raw user input.
    pub fn parse(comparison: &str, threshold: &str) -> Result<Self> {
        Ok(Self::new(
            comparison.parse::<Comparison>()?,
            parse_threshold(threshold)?,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold >= 0
    }

    pub fn matches(&self, lines: usize) -> bool {
        self.comparison.holds(lines, self.threshold)
    }
}

/// Parse a user-entered line-count threshold.
pub fn parse_threshold(raw: &str) -> Result<i64> {
    validation::parse_integer(raw, "lines")
}

// ============================================================================
// Name pattern
// ============================================================================

/// File-name pattern. Literal patterns are escaped before compiling, so they
/// match as a plain substring of the bare file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePattern {
    pub pattern: String,
    #[serde(default)]
    pub regex_syntax: bool,
}

impl NamePattern {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            regex_syntax: false,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            regex_syntax: true,
        }
    }

    pub fn compile(&self) -> Result<Regex> {
        let source = if self.regex_syntax {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };
        Regex::new(&source).map_err(|e| {
            Error::validation_invalid_argument(
                "regex",
                format!("Invalid regular expression: {}", e),
                Some(self.pattern.clone()),
                None,
            )
        })
    }
}

// ============================================================================
// Search criteria
// ============================================================================

/// Immutable description of how candidates are discovered.
///
/// At most one of `names` / `pattern` sources the initial set; `line_count`
/// narrows it, or is the only source when neither is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<NamePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_count: Option<LineCountFilter>,
    #[serde(default = "default_auto_commit")]
    pub auto_commit: bool,
}

fn default_auto_commit() -> bool {
    true
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self {
            auto_commit: true,
            ..Self::default()
        }
    }

    /// Name list from newline separated text. Blank text means "no list".
    pub fn with_name_list(mut self, text: &str) -> Self {
        let names = validation::non_blank_lines(text);
        self.names = if names.is_empty() { None } else { Some(names) };
        self
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_pattern(mut self, pattern: NamePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_line_count(mut self, filter: LineCountFilter) -> Self {
        self.line_count = Some(filter);
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Line-count filter, if present and enabled.
    pub fn active_line_count(&self) -> Option<LineCountFilter> {
        self.line_count.filter(|f| f.is_enabled())
    }

    pub fn validate(&self) -> Result<()> {
        if self.names.is_some() && self.pattern.is_some() {
            return Err(Error::validation_invalid_argument(
                "criteria",
                "Use either a name list or a regex as the candidate source, not both",
                None,
                None,
            ));
        }
        if let Some(pattern) = &self.pattern {
            pattern.compile()?;
        }
        Ok(())
    }
}
