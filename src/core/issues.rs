//! Field-level validation outcomes shared by every form.
//!
//! Issues carry stable codes rather than sentences; the presentation layer
//! maps `(path, code)` to display text.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCode {
    InvalidType,
    InvalidFormat,
    InvalidRange,
    TooSmall,
    TooBig,
    TooShort,
    TooLong,
    Required,
}

impl FieldCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldCode::InvalidType => "invalid_type",
            FieldCode::InvalidFormat => "invalid_format",
            FieldCode::InvalidRange => "invalid_range",
            FieldCode::TooSmall => "too_small",
            FieldCode::TooBig => "too_big",
            FieldCode::TooShort => "too_short",
            FieldCode::TooLong => "too_long",
            FieldCode::Required => "required",
        }
    }
}

impl fmt::Display for FieldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub path: Vec<String>,
    pub code: FieldCode,
}

impl FieldIssue {
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// Every issue found in one pass over a form. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    issues: Vec<FieldIssue>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &[&str], code: FieldCode) {
        self.issues.push(FieldIssue {
            path: path.iter().map(|segment| segment.to_string()).collect(),
            code,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Code reported for an exact path, if any.
    pub fn at(&self, path: &[&str]) -> Option<FieldCode> {
        self.issues
            .iter()
            .find(|issue| issue.path.iter().map(String::as_str).eq(path.iter().copied()))
            .map(|issue| issue.code)
    }

    /// Nest every issue under `segment`, e.g. `sampler.shuffle_rate` becomes
    /// `config.sampler.shuffle_rate`.
    pub fn prefixed(mut self, segment: &str) -> Self {
        for issue in &mut self.issues {
            issue.path.insert(0, segment.to_string());
        }
        self
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.issues.extend(other.issues);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", issue.path_string(), issue.code)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
