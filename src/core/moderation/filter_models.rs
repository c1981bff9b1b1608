// Moderation domain models - data structures for the content filter pipeline.
//
// These are pure domain types with no storage or HTTP dependencies.
// The infra layer converts these to and from SQLite rows and API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::core::url_safety::UrlValidationResult;

/// How bad a single matched term is. Ordering matters: the pipeline blocks
/// on high-severity profanity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Three-level policy dial controlling per-type detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Strict,
    Moderate,
    Permissive,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Moderate
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensitivity::Strict => write!(f, "strict"),
            Sensitivity::Moderate => write!(f, "moderate"),
            Sensitivity::Permissive => write!(f, "permissive"),
        }
    }
}

impl std::str::FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Sensitivity::Strict),
            "moderate" => Ok(Sensitivity::Moderate),
            "permissive" => Ok(Sensitivity::Permissive),
            other => Err(format!("unknown sensitivity: {}", other)),
        }
    }
}

/// The three configurable filter types. URL validation is always on and has
/// no config row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Profanity,
    Spam,
    HateSpeech,
}

impl FilterType {
    pub const ALL: [FilterType; 3] = [FilterType::Profanity, FilterType::Spam, FilterType::HateSpeech];
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterType::Profanity => write!(f, "profanity"),
            FilterType::Spam => write!(f, "spam"),
            FilterType::HateSpeech => write!(f, "hate_speech"),
        }
    }
}

impl std::str::FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profanity" => Ok(FilterType::Profanity),
            "spam" => Ok(FilterType::Spam),
            "hate_speech" => Ok(FilterType::HateSpeech),
            other => Err(format!("unknown filter type: {}", other)),
        }
    }
}

/// Result of running a single detector over one piece of text.
#[derive(Debug, Clone, Serialize)]
pub struct FilterVerdict {
    /// Whether the detector fired at the configured sensitivity
    pub detected: bool,
    /// Highest severity among the matched terms
    pub severity: Severity,
    /// What matched (words for profanity, signal names for spam,
    /// keywords/pattern labels for hate speech)
    pub matched_terms: Vec<String>,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
}

impl FilterVerdict {
    /// A "nothing found" verdict, also returned by disabled detectors.
    pub fn clean() -> Self {
        Self {
            detected: false,
            severity: Severity::Low,
            matched_terms: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// A category the pipeline can flag content under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFlag {
    Profanity,
    Spam,
    HateSpeech,
    MaliciousUrl,
}

impl std::fmt::Display for ContentFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentFlag::Profanity => write!(f, "profanity"),
            ContentFlag::Spam => write!(f, "spam"),
            ContentFlag::HateSpeech => write!(f, "hate_speech"),
            ContentFlag::MaliciousUrl => write!(f, "malicious_url"),
        }
    }
}

/// A side-effecting remediation step queued by the pipeline and executed by
/// the moderation service before the verdict is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAction {
    CreateHighPriorityReport,
    LogBlockedUrlAttempt,
}

/// Per-check detail kept in the pipeline verdict so reviewers always see the
/// complete picture, including checks that did not fire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FlagDetail {
    Filter(FilterVerdict),
    Url(UrlValidationResult),
}

impl FlagDetail {
    /// Confidence for automated-flag persistence. URL verdicts are binary,
    /// so a malicious-URL flag is recorded at full confidence.
    pub fn confidence(&self) -> f64 {
        match self {
            FlagDetail::Filter(v) => v.confidence,
            FlagDetail::Url(_) => 1.0,
        }
    }
}

/// Aggregate decision for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineVerdict {
    /// Whether the content may be accepted
    pub allowed: bool,
    /// Which categories fired
    pub flags: Vec<ContentFlag>,
    /// Remediation steps to execute
    pub auto_actions: Vec<AutoAction>,
    /// Detail for every check that ran, keyed by category
    pub details: HashMap<ContentFlag, FlagDetail>,
}

/// Persisted policy for one filter type. Exactly one row per type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    pub enabled: bool,
    pub sensitivity: Sensitivity,
    /// Terms exempted from matching
    pub whitelist: BTreeSet<String>,
    /// Operator-added trigger terms. For hate speech this IS the keyword
    /// list; the detector only hardcodes structural patterns.
    pub blacklist: BTreeSet<String>,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FilterConfig {
    /// Default policy used for seeding and for degraded operation when the
    /// config store is unreachable.
    pub fn default_for(filter_type: FilterType) -> Self {
        Self {
            filter_type,
            enabled: true,
            sensitivity: Sensitivity::default(),
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            updated_by: None,
            updated_at: Utc::now(),
        }
    }
}

/// Append-only record of a detected issue on already-persisted content.
/// The review workflow (out of scope here) owns the `reviewed` transition.
#[derive(Debug, Clone, Serialize)]
pub struct AutomatedFlag {
    pub content_type: String,
    pub content_id: i64,
    pub flag_type: ContentFlag,
    pub confidence: f64,
    pub reviewed: bool,
    pub created_at: DateTime<Utc>,
}

/// Priority of a moderation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    #[allow(dead_code)]
    Normal,
    High,
}

impl std::fmt::Display for ReportPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportPriority::Normal => write!(f, "normal"),
            ReportPriority::High => write!(f, "high"),
        }
    }
}

/// A report filed for human review. Automated reports use the synthetic
/// "system" reporter identity provisioned at startup.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationReport {
    pub reporter_id: i64,
    pub reason: String,
    pub details: String,
    /// Set when the flagged content is a story; omitted for unrecognized
    /// content types rather than failing the report.
    pub story_id: Option<i64>,
    /// Set when the flagged content is a chapter.
    pub chapter_id: Option<i64>,
    pub priority: ReportPriority,
    pub created_at: DateTime<Utc>,
}
