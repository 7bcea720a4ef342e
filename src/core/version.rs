use crate::errors::{Result, SdkError};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Agent version that supports reusing a development session.
pub const MIN_SESSION_REUSE_VERSION: &str = "0.64.20";

/// Agent version that supports local reports.
pub const MIN_LOCAL_REPORT_VERSION: &str = "2.1.0";

/// Agent version that accepts batched reports.
pub const MIN_BATCH_REPORT_VERSION: &str = "3.1.0";

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*[vV]?(\d+(?:\.\d+)*)").expect("static version regex"))
}

/// A dotted numeric Agent version tag such as `2.5.0` or `0.64.20-beta`.
///
/// Comparison is component-wise; missing components count as zero, so
/// `2.5` and `2.5.0` are equal.
#[derive(Debug, Clone)]
pub struct AgentVersion {
    tag: String,
    parts: Vec<u64>,
}

impl AgentVersion {
    /// Placeholder for Agents that did not advertise a version.
    pub fn unknown() -> Self {
        Self {
            tag: "0.0.0".to_string(),
            parts: vec![0],
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns false when `minimum` itself cannot be parsed.
    pub fn at_least(&self, minimum: &str) -> bool {
        match minimum.parse::<AgentVersion>() {
            Ok(min) => *self >= min,
            Err(_) => false,
        }
    }
}

impl FromStr for AgentVersion {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        let captures = version_pattern()
            .captures(s)
            .ok_or_else(|| SdkError::Sdk(format!("Could not parse Agent version [{}]", s)))?;

        let parts = captures[1]
            .split('.')
            .map(|p| {
                p.parse::<u64>()
                    .map_err(|_| SdkError::Sdk(format!("Could not parse Agent version [{}]", s)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tag: s.trim().to_string(),
            parts,
        })
    }
}

impl Ord for AgentVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for AgentVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AgentVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AgentVersion {}

impl fmt::Display for AgentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}
