//! Pattern lists behind the sensitivity and compliance checks.
//!
//! The lists are plain configuration: compiled once at startup into a
//! [`PatternSet`] and handed to the checkers. Nothing here is a global.

use std::path::Path;

use regex::RegexSet;
use serde::Deserialize;
use thiserror::Error;

use crate::safety::compliance::ComplianceChecker;
use crate::safety::sensitivity::SensitivityClassifier;

/// Bullying, violence, coercion, self-harm and harassment terms.
pub const SENSITIVE_PATTERNS: &[&str] = &[
    "いじめ",
    "いじ(め|り)",
    "暴力",
    "殴",
    "蹴",
    "排除",
    "無視",
    "仲間はずれ",
    "脅",
    "金(を|の)要求",
    "晒し",
    "SNS",
    "ネットいじめ",
    "自傷",
    "自殺",
    "死にたい",
    "ハラスメント",
    "性(的|被害)",
    "体罰",
    "恐喝",
    "集団で",
    "標的",
    "陰口",
];

/// Suggestions that must never reach a teacher while safety mode is active:
/// forced apology or reconciliation, forced confrontation or co-presence,
/// forced endurance.
pub const FORBIDDEN_PATTERNS: &[&str] = &[
    "その場で(謝ら|和解さ)せる",
    "仲直りさせる",
    "両者をすぐ対面させる",
    "被害者.*同席させる",
    "全員で.*活動させる",
    "我慢させる",
    "許させる",
    "被害者.*配慮なく",
];

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid {list} pattern: {source}")]
    Invalid {
        list: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read lexicon file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lexicon file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An immutable OR-set of regular expressions.
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: RegexSet,
}

impl PatternSet {
    pub fn new<I, S>(list: &'static str, patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set =
            RegexSet::new(patterns).map_err(|source| PatternError::Invalid { list, source })?;
        Ok(Self { set })
    }

    /// True if any pattern matches anywhere in `text`. Empty text never matches.
    pub fn is_match(&self, text: &str) -> bool {
        !text.is_empty() && self.set.is_match(text)
    }

    /// Source strings of the patterns that match `text`.
    pub fn matching(&self, text: &str) -> Vec<&str> {
        if text.is_empty() {
            return Vec::new();
        }
        self.set
            .matches(text)
            .into_iter()
            .map(|i| self.set.patterns()[i].as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }
}

/// The two pattern lists, as loaded from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyLexicon {
    pub sensitive: Vec<String>,
    pub forbidden: Vec<String>,
}

impl Default for SafetyLexicon {
    fn default() -> Self {
        Self {
            sensitive: SENSITIVE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            forbidden: FORBIDDEN_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SafetyLexicon {
    /// Reads a lexicon override from a JSON file with `sensitive` and `forbidden` arrays.
    pub fn from_file(path: &Path) -> Result<Self, PatternError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| PatternError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PatternError::Parse {
            path: display,
            source,
        })
    }

    pub fn compile(&self) -> Result<SafetyRules, PatternError> {
        Ok(SafetyRules {
            sensitivity: SensitivityClassifier::new(PatternSet::new(
                "sensitive",
                &self.sensitive,
            )?),
            compliance: ComplianceChecker::new(PatternSet::new("forbidden", &self.forbidden)?),
        })
    }
}

/// Compiled checkers, shared read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct SafetyRules {
    pub sensitivity: SensitivityClassifier,
    pub compliance: ComplianceChecker,
}
